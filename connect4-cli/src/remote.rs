//! 远程玩家
//!
//! 通过 HTTP 服务端参与对局：注册后轮询 `/status`，轮到自己时读取列号并提交。
//! 服务端没有推送，等待对手全靠轮询。

use std::io::Write;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use rand::Rng;
use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{debug, info};

use protocol::{
    BoardSnapshot, ErrorCode, ErrorResponse, Icon, MatchId, MatchInfo, MatchPhase, MatchStatus,
    MoveRequest, MoveResponse, PlayerId, RegisterRequest, RegisterResponse, CONNECT_TIMEOUT,
    DEFAULT_MATCH_ID, POLL_INTERVAL,
};

use crate::render::{render_board, render_status};

/// 远程对局的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    Won,
    Lost(PlayerId),
    Drawn,
    /// 输入结束，放弃对局
    Aborted,
}

/// 远程玩家
pub struct RemotePlayer<R, W> {
    client: reqwest::Client,
    /// 不含末尾 `/` 的服务端地址，例如 `http://localhost:5000`
    base_url: String,
    match_id: MatchId,
    player_id: PlayerId,
    icon: Option<Icon>,
    poll_interval: Duration,
    input: Lines<R>,
    output: W,
}

/// 生成随机玩家标识
pub fn random_player_id() -> PlayerId {
    format!("player-{:06x}", rand::thread_rng().gen_range(0..0x100_0000))
}

impl<R: AsyncBufRead + Unpin, W: Write> RemotePlayer<R, W> {
    /// `server` 可以省略 `http://` 前缀
    pub fn new(server: &str, player_id: impl Into<PlayerId>, input: R, output: W) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url(server),
            match_id: DEFAULT_MATCH_ID,
            player_id: player_id.into(),
            icon: None,
            poll_interval: POLL_INTERVAL,
            input: input.lines(),
            output,
        })
    }

    /// 指定对局（默认为服务端的默认对局）
    pub fn with_match(mut self, match_id: MatchId) -> Self {
        self.match_id = match_id;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn icon(&self) -> Option<Icon> {
        self.icon
    }

    fn path(&self, action: &str) -> String {
        format!("/matches/{}/{}", self.match_id, action)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .with_context(|| format!("无法连接到服务端 ({})", self.base_url))?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// 提交 JSON 请求，服务端拒绝时解析错误码
    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<std::result::Result<T, ErrorCode>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .with_context(|| format!("无法连接到服务端 ({})", self.base_url))?;

        if response.status().is_success() {
            return Ok(Ok(response.json().await?));
        }
        let code = response
            .json::<ErrorResponse>()
            .await
            .map(|body| body.error)
            .unwrap_or(ErrorCode::InternalError);
        Ok(Err(code))
    }

    /// 注册到对局
    pub async fn register(&mut self) -> Result<Icon> {
        let request = RegisterRequest {
            player_id: self.player_id.clone(),
        };
        let body: RegisterResponse = self
            .post_json(&self.path("register"), &request)
            .await?
            .map_err(|code| anyhow!("registration rejected: {code}"))?;

        info!(player = %self.player_id, icon = %body.icon, "注册成功");
        self.icon = Some(body.icon);
        Ok(body.icon)
    }

    pub async fn status(&self) -> Result<MatchStatus> {
        self.get_json(&self.path("status")).await
    }

    pub async fn board(&self) -> Result<BoardSnapshot> {
        self.get_json(&self.path("board")).await
    }

    /// 当前对局阶段（从对局列表中查找）
    pub async fn phase(&self) -> Result<MatchPhase> {
        let matches: Vec<MatchInfo> = self.get_json("/matches").await?;
        matches
            .into_iter()
            .find(|info| info.match_id == self.match_id)
            .map(|info| info.phase)
            .ok_or_else(|| anyhow!("match {} not found", self.match_id))
    }

    /// 提交落子，服务端拒绝时返回错误码
    pub async fn make_move(&self, column: i64) -> Result<std::result::Result<MoveResponse, ErrorCode>> {
        let request = MoveRequest {
            player_id: self.player_id.clone(),
            column,
        };
        self.post_json(&self.path("make_move"), &request).await
    }

    /// 进行对局直到结束
    pub async fn run(&mut self) -> Result<RemoteOutcome> {
        if self.icon.is_none() {
            let icon = self.register().await?;
            writeln!(self.output, "Registered as {} ({icon})", self.player_id)?;
        }

        self.wait_for_opponent().await?;
        writeln!(self.output, "--------- Game Started ---------")?;

        let mut last_turn = None;
        let mut waiting_shown = false;
        loop {
            let status = self.status().await?;

            if last_turn != Some(status.turn) {
                last_turn = Some(status.turn);
                waiting_shown = false;
                let board = self.board().await?;
                write!(self.output, "\n{}", render_board(&board))?;
                writeln!(self.output, "{}", render_status(&status))?;
            }

            if let Some(winner) = status.winner {
                return if winner == self.player_id {
                    writeln!(self.output, "You won the game!")?;
                    Ok(RemoteOutcome::Won)
                } else {
                    writeln!(self.output, "Player {winner} won the game")?;
                    Ok(RemoteOutcome::Lost(winner))
                };
            }

            match status.active_player {
                // 双方已注册时只有对局结束才没有走棋方
                None => {
                    writeln!(self.output, "The game is a draw!")?;
                    return Ok(RemoteOutcome::Drawn);
                }
                Some(active) if active == self.player_id => {
                    if !self.take_turn().await? {
                        return Ok(RemoteOutcome::Aborted);
                    }
                }
                Some(_) => {
                    if !waiting_shown {
                        writeln!(self.output, "Waiting for the other player to make a move.")?;
                        waiting_shown = true;
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// 等待第二位玩家注册
    async fn wait_for_opponent(&mut self) -> Result<()> {
        let mut waiting_shown = false;
        loop {
            match self.phase().await? {
                MatchPhase::Empty => bail!("match {} has no registered players", self.match_id),
                MatchPhase::AwaitingSecond => {
                    if !waiting_shown {
                        writeln!(self.output, "Waiting for second player to connect...")?;
                        waiting_shown = true;
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
                _ => return Ok(()),
            }
        }
    }

    /// 读取列号并提交，直到落子被接受或不再轮到自己。输入结束时返回 false
    async fn take_turn(&mut self) -> Result<bool> {
        loop {
            let icon = self.icon.map(|icon| icon.to_string()).unwrap_or_default();
            write!(self.output, "Your turn ({icon}), enter a column: ")?;
            self.output.flush()?;

            let Some(line) = self.input.next_line().await? else {
                writeln!(self.output)?;
                return Ok(false);
            };
            let Ok(column) = line.trim().parse::<i64>() else {
                writeln!(self.output, "Please enter a column number.")?;
                continue;
            };

            match self.make_move(column).await? {
                Ok(response) => {
                    debug!(column, turn = response.status.turn, "落子被接受");
                    return Ok(true);
                }
                Err(code @ (ErrorCode::NotYourTurn | ErrorCode::GameOver)) => {
                    writeln!(self.output, "Move was rejected: {code}")?;
                    return Ok(true);
                }
                Err(code) => {
                    writeln!(self.output, "Move was illegal ({code}). Please try again.")?;
                }
            }
        }
    }
}

/// 补全协议前缀并去掉末尾的 `/`
fn base_url(server: &str) -> String {
    let server = server.trim().trim_end_matches('/');
    if server.contains("://") {
        server.to_string()
    } else {
        format!("http://{server}")
    }
}
