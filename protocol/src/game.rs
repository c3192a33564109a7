//! 对局状态机
//!
//! 负责玩家注册、轮次交替、落子、胜负/和棋判定与重开。
//! 所有失败的前置检查都在修改状态之前返回。

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::board::{Board, BoardSnapshot};
use crate::error::GameError;
use crate::icon::{Icon, PlayerId, PlayerSlot, Slot};
use crate::rules::WinDetector;

/// 对局阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPhase {
    /// 无人注册
    Empty,
    /// 等待第二位玩家
    AwaitingSecond,
    /// 对局进行中
    Playing,
    /// 已分胜负
    Won(Slot),
    /// 棋盘下满，和棋
    Drawn,
}

impl MatchPhase {
    /// 是否已结束
    pub fn is_over(&self) -> bool {
        matches!(self, MatchPhase::Won(_) | MatchPhase::Drawn)
    }
}

/// 对局状态（对外接口的一次一致性读取）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStatus {
    /// 当前可以走棋的玩家（对局结束或该席位未注册时为 null）
    pub active_player: Option<PlayerId>,
    /// 已成功落子数
    pub turn: usize,
    /// 胜者
    pub winner: Option<PlayerId>,
}

/// 走法记录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// 第几手（从 0 开始）
    pub turn: usize,
    pub slot: Slot,
    pub column: usize,
    pub row: usize,
}

/// 一局四子棋
#[derive(Debug, Clone)]
pub struct Match {
    board: Board,
    slots: [Option<PlayerSlot>; 2],
    turn: usize,
    winner: Option<Slot>,
    history: Vec<MoveRecord>,
}

impl Match {
    /// 创建标准 6x7 对局
    pub fn new() -> Self {
        Self::from_board(Board::standard())
    }

    /// 创建指定尺寸的对局
    pub fn with_size(rows: usize, columns: usize) -> Result<Self, GameError> {
        Ok(Self::from_board(Board::new(rows, columns)?))
    }

    fn from_board(board: Board) -> Self {
        Self {
            board,
            slots: [None, None],
            turn: 0,
            winner: None,
            history: Vec::new(),
        }
    }

    /// 注册玩家，按席位顺序分配棋子标记
    pub fn register(&mut self, player_id: impl Into<PlayerId>) -> Result<Icon, GameError> {
        let slot = Slot::ALL
            .into_iter()
            .find(|slot| self.slots[slot.index()].is_none())
            .ok_or(GameError::GameFull)?;

        let player_id = player_id.into();
        let icon = slot.icon();
        info!(?slot, %icon, player = %player_id, "玩家注册成功");
        self.slots[slot.index()] = Some(PlayerSlot::new(player_id, icon));

        Ok(icon)
    }

    /// 当前状态
    pub fn status(&self) -> MatchStatus {
        let active_player = if self.is_over() {
            None
        } else {
            self.slot(self.active_slot()).map(|s| s.player_id.clone())
        };

        MatchStatus {
            active_player,
            turn: self.turn,
            winner: self.winner_id().map(str::to_string),
        }
    }

    /// 棋盘快照
    pub fn board_snapshot(&self) -> BoardSnapshot {
        self.board.snapshot()
    }

    /// 落子
    ///
    /// 前置检查依次为：对局已结束、未满两人、非当前走棋方、列越界、列已满。
    /// 成功时返回棋子所在行号，并在同一步内更新回合数与胜者。
    pub fn apply_move(&mut self, column: usize, player_id: &str) -> Result<usize, GameError> {
        if self.is_over() {
            return Err(GameError::GameOver);
        }
        if !self.is_full() {
            return Err(GameError::NotRegistered);
        }

        let slot = self.active_slot();
        match self.slot(slot) {
            Some(active) if active.player_id == player_id => {}
            _ => return Err(GameError::NotYourTurn),
        }

        let icon = slot.icon();
        let row = self.board.drop_piece(column, icon)?;

        self.history.push(MoveRecord {
            turn: self.turn,
            slot,
            column,
            row,
        });
        self.turn += 1;
        debug!(?slot, column, row, turn = self.turn, "落子");

        if WinDetector::check_win(&self.board, row, column, icon) {
            self.winner = Some(slot);
            info!(?slot, player = %player_id, turn = self.turn, "对局结束，已分胜负");
        } else if self.turn == self.board.capacity() {
            info!(turn = self.turn, "棋盘已满，和棋");
        }

        Ok(row)
    }

    /// 重开一局（保留双方席位）
    pub fn restart(&mut self) -> Result<(), GameError> {
        if !self.is_full() {
            return Err(GameError::NotRegistered);
        }

        self.board.clear();
        self.turn = 0;
        self.winner = None;
        self.history.clear();
        info!("重新开局");

        Ok(())
    }

    /// 当前阶段
    pub fn phase(&self) -> MatchPhase {
        if let Some(slot) = self.winner {
            return MatchPhase::Won(slot);
        }
        if self.turn == self.board.capacity() {
            return MatchPhase::Drawn;
        }
        match self.slots.iter().filter(|s| s.is_some()).count() {
            0 => MatchPhase::Empty,
            1 => MatchPhase::AwaitingSecond,
            _ => MatchPhase::Playing,
        }
    }

    /// 当前走棋席位（由回合数奇偶决定）
    pub fn active_slot(&self) -> Slot {
        Slot::for_turn(self.turn)
    }

    /// 获取席位信息
    pub fn slot(&self, slot: Slot) -> Option<&PlayerSlot> {
        self.slots[slot.index()].as_ref()
    }

    /// 查找玩家的棋子标记
    pub fn icon_of(&self, player_id: &str) -> Option<Icon> {
        self.slots
            .iter()
            .flatten()
            .find(|s| s.player_id == player_id)
            .map(|s| s.icon)
    }

    /// 双方是否都已注册
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// 对局是否已结束
    pub fn is_over(&self) -> bool {
        self.winner.is_some() || self.turn == self.board.capacity()
    }

    pub fn turn(&self) -> usize {
        self.turn
    }

    pub fn winner(&self) -> Option<Slot> {
        self.winner
    }

    fn winner_id(&self) -> Option<&str> {
        self.winner
            .and_then(|slot| self.slot(slot))
            .map(|s| s.player_id.as_str())
    }

    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    pub fn last_move(&self) -> Option<MoveRecord> {
        self.history.last().copied()
    }

    pub fn rows(&self) -> usize {
        self.board.rows()
    }

    pub fn columns(&self) -> usize {
        self.board.columns()
    }
}

impl Default for Match {
    fn default() -> Self {
        Self::new()
    }
}
