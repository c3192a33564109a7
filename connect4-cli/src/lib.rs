//! 四子棋命令行
//!
//! 包含:
//! - 文本棋盘渲染
//! - 本地双人对局（同一终端轮流输入）
//! - 远程玩家（轮询 HTTP 服务端）

pub mod local;
pub mod remote;
pub mod render;

pub use local::{LocalGame, RoundOutcome};
pub use remote::{RemoteOutcome, RemotePlayer};
pub use render::{render_board, render_status};
