//! 四子棋共享协议库
//!
//! 包含:
//! - 棋盘、棋子图标、玩家槽位等核心数据结构
//! - 胜负判定
//! - 对局状态机与并发保护 (Match, SharedMatch)
//! - HTTP 接口的请求/响应类型
//! - 传输层抽象 (Connection, Listener traits) 与服务端 HTTP/1.1 编解码

mod board;
mod constants;
mod error;
mod game;
mod guard;
mod icon;
mod message;
mod rules;
mod transport;

pub use board::{Board, BoardSnapshot};
pub use constants::*;
pub use error::{BoardError, GameError, ProtocolError, Result};
pub use game::{Match, MatchPhase, MatchStatus, MoveRecord};
pub use guard::{MoveOutcome, SharedMatch};
pub use icon::{Icon, PlayerId, PlayerSlot, Slot};
pub use message::{
    ErrorCode, ErrorResponse, MatchCreated, MatchId, MatchInfo, MoveRequest, MoveResponse,
    RegisterRequest, RegisterResponse, SuccessResponse,
};
pub use rules::WinDetector;
pub use transport::{
    Connection, HttpReader, HttpRequest, HttpResponse, HttpWriter, Listener, Method, TcpConnection,
    TcpListener,
};
