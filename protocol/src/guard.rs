//! 并发保护
//!
//! 对局的所有修改操作都在同一把写锁内完成，读操作持读锁并复制数据，
//! 因此任何调用方都观察不到落子一半的中间状态。

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::board::BoardSnapshot;
use crate::error::GameError;
use crate::game::{Match, MatchPhase, MatchStatus, MoveRecord};
use crate::icon::{Icon, PlayerId};

/// 落子结果（在同一临界区内获取）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub row: usize,
    pub board: BoardSnapshot,
    pub status: MatchStatus,
}

/// 可在多个调用方之间共享的对局
#[derive(Debug, Clone, Default)]
pub struct SharedMatch {
    inner: Arc<RwLock<Match>>,
}

impl SharedMatch {
    pub fn new(game: Match) -> Self {
        Self {
            inner: Arc::new(RwLock::new(game)),
        }
    }

    // 修改操作先校验再写入，锁中毒时数据仍然完整，可以直接继续使用
    fn read(&self) -> RwLockReadGuard<'_, Match> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Match> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// 注册玩家
    pub fn register(&self, player_id: impl Into<PlayerId>) -> Result<Icon, GameError> {
        self.write().register(player_id)
    }

    /// 当前状态
    pub fn status(&self) -> MatchStatus {
        self.read().status()
    }

    /// 棋盘快照
    pub fn board_snapshot(&self) -> BoardSnapshot {
        self.read().board_snapshot()
    }

    /// 落子，返回行号
    pub fn apply_move(&self, column: usize, player_id: &str) -> Result<usize, GameError> {
        self.write().apply_move(column, player_id)
    }

    /// 落子，并在同一临界区内取得落子后的棋盘与状态
    pub fn make_move(&self, column: usize, player_id: &str) -> Result<MoveOutcome, GameError> {
        let mut game = self.write();
        let row = game.apply_move(column, player_id)?;
        Ok(MoveOutcome {
            row,
            board: game.board_snapshot(),
            status: game.status(),
        })
    }

    /// 重开一局
    pub fn restart(&self) -> Result<(), GameError> {
        self.write().restart()
    }

    /// 当前阶段
    pub fn phase(&self) -> MatchPhase {
        self.read().phase()
    }

    /// 走法历史
    pub fn history(&self) -> Vec<MoveRecord> {
        self.read().history().to_vec()
    }

    /// 在读锁内执行只读查询
    pub fn with<T>(&self, f: impl FnOnce(&Match) -> T) -> T {
        f(&self.read())
    }
}

impl From<Match> for SharedMatch {
    fn from(game: Match) -> Self {
        Self::new(game)
    }
}
