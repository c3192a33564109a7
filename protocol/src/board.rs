//! 棋盘状态

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_COLUMNS, DEFAULT_ROWS, MAX_DIMENSION};
use crate::error::BoardError;
use crate::icon::Icon;

/// 棋盘
///
/// 第 0 行在最上方，第 `rows - 1` 行在最下方。棋子只能通过 [`Board::drop_piece`]
/// 落入某列最低的空格，因此任一列中已占用格子的下方不会出现空格。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    rows: usize,
    columns: usize,
    /// 索引为 row * columns + column
    cells: Vec<Option<Icon>>,
}

impl Board {
    /// 创建指定尺寸的空棋盘
    pub fn new(rows: usize, columns: usize) -> Result<Self, BoardError> {
        if !(1..=MAX_DIMENSION).contains(&rows) || !(1..=MAX_DIMENSION).contains(&columns) {
            return Err(BoardError::InvalidDimensions { rows, columns });
        }
        Ok(Self {
            rows,
            columns,
            cells: vec![None; rows * columns],
        })
    }

    /// 创建标准 6x7 空棋盘
    pub fn standard() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            columns: DEFAULT_COLUMNS,
            cells: vec![None; DEFAULT_ROWS * DEFAULT_COLUMNS],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// 格子总数
    pub fn capacity(&self) -> usize {
        self.rows * self.columns
    }

    /// 获取指定格子（越界返回 None）
    pub fn get(&self, row: usize, column: usize) -> Option<Icon> {
        if row < self.rows && column < self.columns {
            self.cells[row * self.columns + column]
        } else {
            None
        }
    }

    /// 检查某列是否已满（越界视为已满）
    pub fn is_column_full(&self, column: usize) -> bool {
        column >= self.columns || self.cells[column].is_some()
    }

    /// 检查棋盘是否已满
    pub fn is_full(&self) -> bool {
        (0..self.columns).all(|column| self.is_column_full(column))
    }

    /// 所有尚可落子的列
    pub fn legal_columns(&self) -> Vec<usize> {
        (0..self.columns)
            .filter(|&column| !self.is_column_full(column))
            .collect()
    }

    /// 在指定列落子，返回棋子落到的行号
    pub fn drop_piece(&mut self, column: usize, icon: Icon) -> Result<usize, BoardError> {
        if column >= self.columns {
            return Err(BoardError::ColumnOutOfRange {
                column,
                columns: self.columns,
            });
        }

        let row = (0..self.rows)
            .rev()
            .find(|&row| self.cells[row * self.columns + column].is_none())
            .ok_or(BoardError::ColumnFull { column })?;

        self.cells[row * self.columns + column] = Some(icon);
        Ok(row)
    }

    /// 清空棋盘（尺寸不变）
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|cell| *cell = None);
    }

    /// 已落子数量
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    /// 生成只读快照
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            cells: self
                .cells
                .chunks(self.columns)
                .map(|row| row.to_vec())
                .collect(),
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}

/// 棋盘快照
///
/// 与引擎内部状态完全独立的副本。序列化为二维字符串数组，空格为 `""`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<String>>", into = "Vec<Vec<String>>")]
pub struct BoardSnapshot {
    cells: Vec<Vec<Option<Icon>>>,
}

impl BoardSnapshot {
    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn columns(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    /// 获取指定格子（越界返回 None）
    pub fn get(&self, row: usize, column: usize) -> Option<Icon> {
        self.cells.get(row).and_then(|r| r.get(column)).copied().flatten()
    }

    /// 按行遍历
    pub fn iter_rows(&self) -> impl Iterator<Item = &[Option<Icon>]> {
        self.cells.iter().map(Vec::as_slice)
    }

    /// 是否没有任何棋子
    pub fn is_empty(&self) -> bool {
        self.cells.iter().flatten().all(Option::is_none)
    }
}

impl From<BoardSnapshot> for Vec<Vec<String>> {
    fn from(snapshot: BoardSnapshot) -> Self {
        snapshot
            .cells
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| cell.map(|icon| icon.to_string()).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

impl TryFrom<Vec<Vec<String>>> for BoardSnapshot {
    type Error = String;

    fn try_from(grid: Vec<Vec<String>>) -> Result<Self, Self::Error> {
        let columns = grid.first().map_or(0, Vec::len);
        if grid.iter().any(|row| row.len() != columns) {
            return Err("board rows have different lengths".to_string());
        }

        let cells = grid
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| {
                        if cell.is_empty() {
                            Ok(None)
                        } else {
                            cell.parse::<Icon>().map(Some)
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { cells })
    }
}
