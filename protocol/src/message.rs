//! 消息类型定义
//!
//! HTTP 接口的请求/响应 JSON 结构。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::board::BoardSnapshot;
use crate::error::GameError;
use crate::game::{MatchPhase, MatchStatus};
use crate::icon::{Icon, PlayerId};

/// 对局 ID
pub type MatchId = u64;

/// `POST /register` 请求体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub player_id: PlayerId,
}

/// `POST /register` 成功响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub icon: Icon,
}

/// `POST /make_move` 请求体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub player_id: PlayerId,
    /// 可能为负数，由服务端映射为 InvalidColumn
    pub column: i64,
}

/// `POST /make_move` 成功响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResponse {
    pub success: bool,
    pub board: BoardSnapshot,
    pub status: MatchStatus,
}

/// 通用成功响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// 错误响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorCode,
}

/// `POST /matches` 响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCreated {
    pub match_id: MatchId,
}

/// 对局列表项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchInfo {
    pub match_id: MatchId,
    pub created_at: DateTime<Utc>,
    pub phase: MatchPhase,
}

/// 错误码定义
///
/// 序列化为变体名，例如 `{ "error": "NotYourTurn" }`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    // === 对局规则 ===
    GameFull,
    NotRegistered,
    GameOver,
    NotYourTurn,
    InvalidColumn,
    ColumnFull,

    // === 请求相关 ===
    /// 请求体或玩家标识无效
    BadRequest,
    /// 路径不存在
    NotFound,
    /// 方法不允许
    MethodNotAllowed,
    /// 对局不存在
    MatchNotFound,
    /// 消息体过大
    PayloadTooLarge,
    /// 对局数量已达上限
    TooManyMatches,

    // === 系统相关 ===
    /// 内部错误
    InternalError,
}

impl From<&GameError> for ErrorCode {
    fn from(err: &GameError) -> Self {
        match err {
            GameError::GameFull => ErrorCode::GameFull,
            GameError::NotRegistered => ErrorCode::NotRegistered,
            GameError::GameOver => ErrorCode::GameOver,
            GameError::NotYourTurn => ErrorCode::NotYourTurn,
            GameError::InvalidColumn { .. } => ErrorCode::InvalidColumn,
            GameError::ColumnFull { .. } => ErrorCode::ColumnFull,
            GameError::InvalidDimensions { .. } => ErrorCode::InternalError,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
