//! 胜负判定
//!
//! 只检查经过最后一枚棋子的四条直线，不做全盘扫描。

use crate::board::Board;
use crate::constants::WIN_LENGTH;
use crate::icon::Icon;

/// 四个方向：横、竖、主对角线、副对角线
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// 胜负判定器
pub struct WinDetector;

impl WinDetector {
    /// 检查刚落在 (row, column) 的棋子是否连成一线
    pub fn check_win(board: &Board, row: usize, column: usize, icon: Icon) -> bool {
        if board.get(row, column) != Some(icon) {
            return false;
        }

        // 每条直线都独立计算完整连子长度
        DIRECTIONS
            .iter()
            .map(|&(dr, dc)| Self::run_length(board, row, column, icon, dr, dc))
            .any(|len| len >= WIN_LENGTH)
    }

    /// 经过 (row, column) 沿某方向的连子长度（本子计 1）
    pub fn run_length(
        board: &Board,
        row: usize,
        column: usize,
        icon: Icon,
        dr: isize,
        dc: isize,
    ) -> usize {
        1 + Self::count_direction(board, row, column, icon, dr, dc)
            + Self::count_direction(board, row, column, icon, -dr, -dc)
    }

    /// 从 (row, column) 出发单向计数（不含起点）
    fn count_direction(
        board: &Board,
        row: usize,
        column: usize,
        icon: Icon,
        dr: isize,
        dc: isize,
    ) -> usize {
        let mut count = 0;
        let mut r = row as isize + dr;
        let mut c = column as isize + dc;

        while r >= 0 && c >= 0 && board.get(r as usize, c as usize) == Some(icon) {
            count += 1;
            r += dr;
            c += dc;
        }

        count
    }
}
