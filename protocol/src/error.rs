//! 错误类型定义

use thiserror::Error;

/// 棋盘操作错误
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    /// 列号越界
    #[error("Column {column} out of range (columns: {columns})")]
    ColumnOutOfRange { column: usize, columns: usize },

    /// 该列已满
    #[error("Column {column} is full")]
    ColumnFull { column: usize },

    /// 无效的棋盘尺寸
    #[error("Invalid board dimensions: {rows}x{columns}")]
    InvalidDimensions { rows: usize, columns: usize },
}

/// 对局规则错误
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameError {
    /// 两个席位都已被占用
    #[error("Game is full")]
    GameFull,

    /// 双方尚未全部注册
    #[error("Both players must be registered")]
    NotRegistered,

    /// 对局已结束（胜负已分或和棋）
    #[error("Game is already over")]
    GameOver,

    /// 不是你的回合
    #[error("Not your turn")]
    NotYourTurn,

    /// 列号越界
    #[error("Invalid column: {column}")]
    InvalidColumn { column: usize },

    /// 该列已满
    #[error("Column {column} is full")]
    ColumnFull { column: usize },

    /// 无效的棋盘尺寸（仅在创建对局时出现）
    #[error("Invalid board dimensions: {rows}x{columns}")]
    InvalidDimensions { rows: usize, columns: usize },
}

impl From<BoardError> for GameError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::ColumnOutOfRange { column, .. } => GameError::InvalidColumn { column },
            BoardError::ColumnFull { column } => GameError::ColumnFull { column },
            BoardError::InvalidDimensions { rows, columns } => {
                GameError::InvalidDimensions { rows, columns }
            }
        }
    }
}

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化错误
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// 无法解析的请求
    #[error("Malformed request: {reason}")]
    MalformedRequest { reason: String },

    /// 请求头超限
    #[error("Header too large (max: {max})")]
    HeaderTooLarge { max: usize },

    /// 消息体超限
    #[error("Body too large: {size} bytes (max: {max})")]
    BodyTooLarge { size: usize, max: usize },

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,

    /// 对局规则错误
    #[error("Game error: {0}")]
    Game(#[from] GameError),
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;
