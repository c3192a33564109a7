//! 协议常量定义

use std::time::Duration;

/// 默认棋盘行数
pub const DEFAULT_ROWS: usize = 6;

/// 默认棋盘列数
pub const DEFAULT_COLUMNS: usize = 7;

/// 棋盘单边最大尺寸
pub const MAX_DIMENSION: usize = 64;

/// 连成一线获胜所需的棋子数
pub const WIN_LENGTH: usize = 4;

/// 玩家标识最大长度
pub const MAX_PLAYER_ID_LEN: usize = 64;

/// HTTP 请求头最大大小
pub const MAX_HEADER_SIZE: usize = 8 * 1024;

/// HTTP 消息体最大大小
pub const MAX_BODY_SIZE: usize = 65536;

/// 服务端默认端口
pub const DEFAULT_PORT: u16 = 5000;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 远程玩家轮询状态间隔（毫秒）
pub const POLL_INTERVAL_MS: u64 = 1000;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);

/// 轮询间隔 Duration
pub const POLL_INTERVAL: Duration = Duration::from_millis(POLL_INTERVAL_MS);

/// 服务端同时保留的对局数上限（含默认对局）
pub const MAX_MATCHES: usize = 1024;

/// 服务端默认对局 ID（裸路由 `/status` 等操作的对局）
pub const DEFAULT_MATCH_ID: u64 = 0;
