//! 服务端配置
//!
//! 优先级从低到高：默认值、JSON 配置文件、环境变量、命令行参数。
//! 环境变量与命令行参数都由 clap 解析。

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use protocol::{Board, DEFAULT_COLUMNS, DEFAULT_PORT, DEFAULT_ROWS, MAX_DIMENSION, MAX_MATCHES};

/// 配置错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("棋盘尺寸无效: {rows}x{columns}（每边须在 1..={max} 之间）")]
    InvalidDimensions {
        rows: usize,
        columns: usize,
        max: usize,
    },

    #[error("对局数上限至少为 1")]
    InvalidMaxMatches,
}

/// 服务端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub rows: usize,
    pub columns: usize,
    /// 同时保留的对局数上限（含默认对局）
    pub max_matches: usize,
    /// 未设置 RUST_LOG 时使用的日志过滤
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            rows: DEFAULT_ROWS,
            columns: DEFAULT_COLUMNS,
            max_matches: MAX_MATCHES,
            log_filter: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// 从 JSON 文件加载，缺省字段使用默认值
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件 {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("配置文件格式错误 {}", path.display()))?;
        Ok(config)
    }

    /// 有配置文件时从文件加载，否则使用默认值
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// 校验棋盘尺寸与对局数上限
    pub fn validate(&self) -> Result<(), ConfigError> {
        Board::new(self.rows, self.columns).map_err(|_| ConfigError::InvalidDimensions {
            rows: self.rows,
            columns: self.columns,
            max: MAX_DIMENSION,
        })?;
        if self.max_matches == 0 {
            return Err(ConfigError::InvalidMaxMatches);
        }
        Ok(())
    }

    /// 监听地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 服务端命令行参数
#[derive(Parser, Debug)]
#[command(name = "connect4-server", version, about = "Connect Four HTTP server")]
pub struct ServerArgs {
    /// JSON 配置文件
    #[arg(long, env = "CONNECT4_CONFIG")]
    pub config: Option<PathBuf>,

    /// 监听地址
    #[arg(long, env = "CONNECT4_HOST")]
    pub host: Option<String>,

    /// 监听端口
    #[arg(short, long, env = "CONNECT4_PORT")]
    pub port: Option<u16>,

    /// 棋盘行数
    #[arg(long, env = "CONNECT4_ROWS")]
    pub rows: Option<usize>,

    /// 棋盘列数
    #[arg(long, env = "CONNECT4_COLUMNS")]
    pub columns: Option<usize>,

    /// 对局数上限
    #[arg(long, env = "CONNECT4_MAX_MATCHES")]
    pub max_matches: Option<usize>,
}

impl ServerArgs {
    /// 加载配置文件，叠加参数并校验
    pub fn into_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = ServerConfig::load(self.config.as_deref())?;
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(rows) = self.rows {
            config.rows = rows;
        }
        if let Some(columns) = self.columns {
            config.columns = columns;
        }
        if let Some(max_matches) = self.max_matches {
            config.max_matches = max_matches;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ENV_VARS: [&str; 6] = [
        "CONNECT4_CONFIG",
        "CONNECT4_HOST",
        "CONNECT4_PORT",
        "CONNECT4_ROWS",
        "CONNECT4_COLUMNS",
        "CONNECT4_MAX_MATCHES",
    ];

    fn clear_env() {
        for name in ENV_VARS {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::load(None).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
        assert_eq!((config.rows, config.columns), (6, 7));
        assert_eq!(config.max_matches, MAX_MATCHES);
    }

    // 环境变量是进程级状态，所有解析参数的断言放在同一个测试里顺序执行
    #[test]
    fn test_args_precedence() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("server.json");
        std::fs::write(&path, r#"{ "port": 6000, "rows": 5, "log_filter": "debug" }"#).unwrap();
        let path_arg = path.to_str().unwrap();

        clear_env();
        let config = ServerArgs::try_parse_from(["connect4-server"])
            .unwrap()
            .into_config()
            .unwrap();
        assert_eq!(config, ServerConfig::default());

        // 文件覆盖默认值，环境变量覆盖文件
        std::env::set_var("CONNECT4_ROWS", "8");
        std::env::set_var("CONNECT4_HOST", "127.0.0.1");
        let config = ServerArgs::try_parse_from(["connect4-server", "--config", path_arg])
            .unwrap()
            .into_config()
            .unwrap();
        assert_eq!(config.port, 6000);
        assert_eq!(config.rows, 8);
        assert_eq!(config.columns, DEFAULT_COLUMNS);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.log_filter, "debug");

        // 命令行参数覆盖环境变量，配置文件路径也可以来自环境变量
        std::env::set_var("CONNECT4_CONFIG", path_arg);
        let config = ServerArgs::try_parse_from(["connect4-server", "--rows", "4", "-p", "7000"])
            .unwrap()
            .into_config()
            .unwrap();
        assert_eq!((config.rows, config.port), (4, 7000));
        assert_eq!(config.log_filter, "debug");

        // 无效的环境变量值由 clap 拒绝
        clear_env();
        std::env::set_var("CONNECT4_PORT", "not-a-port");
        assert!(ServerArgs::try_parse_from(["connect4-server"]).is_err());

        clear_env();
        std::env::set_var("CONNECT4_COLUMNS", "0");
        let args = ServerArgs::try_parse_from(["connect4-server"]).unwrap();
        assert!(args.into_config().is_err());

        clear_env();
        let args = ServerArgs::try_parse_from(["connect4-server", "--max-matches", "0"]).unwrap();
        assert!(args.into_config().is_err());
    }

    #[test]
    fn test_invalid_config() {
        let config = ServerConfig {
            rows: MAX_DIMENSION + 1,
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions { .. })
        ));

        let config = ServerConfig {
            max_matches: 0,
            ..ServerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidMaxMatches));
    }

    #[test]
    fn test_missing_or_broken_file() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.json");
        assert!(ServerConfig::from_file(&missing).is_err());

        let broken = temp_dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(ServerConfig::load(Some(broken.as_path())).is_err());
    }
}
