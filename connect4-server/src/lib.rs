//! 四子棋服务端
//!
//! 包含:
//! - 服务端配置
//! - 对局注册表
//! - HTTP 路由与连接处理

pub mod config;
pub mod registry;
pub mod server;

pub use config::{ConfigError, ServerArgs, ServerConfig};
pub use registry::{MatchEntry, MatchRegistry, RegistryFull};
pub use server::{handle_connection, serve, RequestHandler, ServerState};
