//! 对局注册表
//!
//! 每个对局拥有自己的锁，注册表的锁只在查找时短暂持有。
//! 对局数达到上限时，创建新对局会回收最早的空闲或已结束对局。
//! 加锁顺序总是先注册表后对局。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use protocol::{GameError, Match, MatchId, MatchInfo, MatchPhase, SharedMatch, DEFAULT_MATCH_ID};

/// 对局数已达上限且没有可回收的对局
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("对局数量已达上限 ({max})")]
pub struct RegistryFull {
    pub max: usize,
}

/// 注册表中的对局
#[derive(Debug, Clone)]
pub struct MatchEntry {
    pub id: MatchId,
    pub game: SharedMatch,
    pub created_at: DateTime<Utc>,
}

impl MatchEntry {
    fn new(id: MatchId, game: Match) -> Self {
        Self {
            id,
            game: SharedMatch::new(game),
            created_at: Utc::now(),
        }
    }

    /// 获取对局信息（用于列表展示）
    pub fn info(&self) -> MatchInfo {
        MatchInfo {
            match_id: self.id,
            created_at: self.created_at,
            phase: self.game.phase(),
        }
    }

    /// 无人注册或已结束的对局可以回收
    fn is_reclaimable(&self) -> bool {
        self.id != DEFAULT_MATCH_ID && {
            let phase = self.game.phase();
            phase == MatchPhase::Empty || phase.is_over()
        }
    }
}

/// 对局注册表
pub struct MatchRegistry {
    matches: RwLock<HashMap<MatchId, MatchEntry>>,
    next_id: AtomicU64,
    /// 新对局的模板（已校验尺寸的空对局）
    template: Match,
    max_matches: usize,
}

impl MatchRegistry {
    /// 创建注册表，同时创建默认对局
    pub fn new(rows: usize, columns: usize, max_matches: usize) -> Result<Self, GameError> {
        let template = Match::with_size(rows, columns)?;

        let mut matches = HashMap::new();
        matches.insert(
            DEFAULT_MATCH_ID,
            MatchEntry::new(DEFAULT_MATCH_ID, template.clone()),
        );

        Ok(Self {
            matches: RwLock::new(matches),
            next_id: AtomicU64::new(DEFAULT_MATCH_ID + 1),
            template,
            max_matches,
        })
    }

    /// 创建新对局
    pub fn create(&self) -> Result<MatchId, RegistryFull> {
        let mut matches = self.matches.write().unwrap_or_else(PoisonError::into_inner);

        if matches.len() >= self.max_matches {
            let reclaimable = matches
                .values()
                .filter(|entry| entry.is_reclaimable())
                .map(|entry| entry.id)
                .min();
            let Some(old_id) = reclaimable else {
                warn!(max = self.max_matches, "对局数量已达上限");
                return Err(RegistryFull {
                    max: self.max_matches,
                });
            };
            matches.remove(&old_id);
            info!(match_id = old_id, "回收对局");
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        matches.insert(id, MatchEntry::new(id, self.template.clone()));
        info!(match_id = id, "创建对局");

        Ok(id)
    }

    /// 获取对局
    pub fn get(&self, id: MatchId) -> Option<SharedMatch> {
        self.matches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .map(|entry| entry.game.clone())
    }

    /// 默认对局
    pub fn default_match(&self) -> Option<SharedMatch> {
        self.get(DEFAULT_MATCH_ID)
    }

    /// 所有对局的信息，按 ID 排序
    pub fn list(&self) -> Vec<MatchInfo> {
        // 先复制条目再读取阶段，避免同时持有两把锁
        let entries: Vec<MatchEntry> = self
            .matches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut infos: Vec<MatchInfo> = entries.iter().map(MatchEntry::info).collect();
        infos.sort_by_key(|info| info.match_id);
        infos
    }

    /// 对局数量
    pub fn len(&self) -> usize {
        self.matches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
