use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use connect4_server::{serve, ServerArgs, ServerState};
use protocol::{Listener, TcpListener};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerArgs::parse().into_config()?;

    // 初始化日志
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
        .add_directive("connect4_server=debug".parse()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    info!("四子棋服务端启动中...");

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("无法监听 {addr}"))?;
    let state = Arc::new(ServerState::new(config)?);

    tokio::select! {
        result = serve(listener, state) => result?,
        _ = tokio::signal::ctrl_c() => info!("收到退出信号，服务端关闭"),
    }

    Ok(())
}
