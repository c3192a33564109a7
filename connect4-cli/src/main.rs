use std::io;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use connect4_cli::remote::random_player_id;
use connect4_cli::{LocalGame, RemotePlayer};
use protocol::{
    Match, MatchId, SharedMatch, DEFAULT_COLUMNS, DEFAULT_PORT, DEFAULT_ROWS, POLL_INTERVAL_MS,
};

/// 四子棋命令行
#[derive(Parser, Debug)]
#[command(name = "connect4", version, about = "Play Connect Four in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 同一终端的双人对局
    Local {
        #[arg(long, default_value_t = DEFAULT_ROWS)]
        rows: usize,

        #[arg(long, default_value_t = DEFAULT_COLUMNS)]
        columns: usize,

        #[arg(long, default_value = "player1")]
        player1: String,

        #[arg(long, default_value = "player2")]
        player2: String,
    },

    /// 连接 HTTP 服务端参与对局
    Remote {
        /// 服务端地址，例如 http://localhost:5000
        #[arg(long, env = "CONNECT4_SERVER", default_value_t = format!("http://localhost:{DEFAULT_PORT}"))]
        server: String,

        /// 玩家标识（缺省时随机生成）
        #[arg(long)]
        player_id: Option<String>,

        /// 对局 ID（缺省为服务端默认对局）
        #[arg(long = "match")]
        match_id: Option<MatchId>,

        /// 轮询间隔（毫秒）
        #[arg(long, default_value_t = POLL_INTERVAL_MS)]
        poll_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志（输出到 stderr，避免与棋盘混在一起）
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("connect4_cli=warn".parse()?))
        .init();

    match Cli::parse().command {
        Command::Local {
            rows,
            columns,
            player1,
            player2,
        } => {
            let game = SharedMatch::new(Match::with_size(rows, columns)?);
            let stdin = io::stdin();
            LocalGame::new(game, player1, player2, stdin.lock(), io::stdout()).run()?;
        }
        Command::Remote {
            server,
            player_id,
            match_id,
            poll_ms,
        } => {
            let player_id = player_id.unwrap_or_else(random_player_id);
            let input = tokio::io::BufReader::new(tokio::io::stdin());
            let mut player = RemotePlayer::new(&server, player_id, input, io::stdout())?
                .with_poll_interval(Duration::from_millis(poll_ms));
            if let Some(match_id) = match_id {
                player = player.with_match(match_id);
            }
            player.run().await?;
        }
    }

    Ok(())
}
