//! 本地双人对局
//!
//! 两名玩家在同一终端轮流输入列号，对局直接通过 `SharedMatch` 进行。

use std::io::{BufRead, Write};

use anyhow::Result;
use tracing::debug;

use protocol::{PlayerId, SharedMatch};

use crate::render::{render_board, render_status};

/// 一局的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    Won(PlayerId),
    Drawn,
    /// 输入结束，对局未完成
    Aborted,
}

/// 本地对局协调器
pub struct LocalGame<R, W> {
    game: SharedMatch,
    players: [PlayerId; 2],
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LocalGame<R, W> {
    pub fn new(
        game: SharedMatch,
        player1: impl Into<PlayerId>,
        player2: impl Into<PlayerId>,
        input: R,
        output: W,
    ) -> Self {
        Self {
            game,
            players: [player1.into(), player2.into()],
            input,
            output,
        }
    }

    /// 注册双方并进行对局，每局结束后询问是否再来一局
    pub fn run(&mut self) -> Result<Vec<RoundOutcome>> {
        for player in self.players.clone() {
            let icon = self.game.register(player.clone())?;
            writeln!(self.output, "{player} plays {icon}")?;
        }

        let mut outcomes = Vec::new();
        loop {
            let outcome = self.play_round()?;
            let finished = outcome != RoundOutcome::Aborted;
            outcomes.push(outcome);

            if !finished || !self.ask_rematch()? {
                break;
            }
            self.game.restart()?;
        }

        Ok(outcomes)
    }

    /// 进行一局直到分出胜负、和棋或输入结束
    fn play_round(&mut self) -> Result<RoundOutcome> {
        loop {
            let status = self.game.status();
            let board = self.game.board_snapshot();
            write!(self.output, "\n{}", render_board(&board))?;
            writeln!(self.output, "{}", render_status(&status))?;

            if let Some(winner) = status.winner {
                writeln!(self.output, "{winner} wins!")?;
                return Ok(RoundOutcome::Won(winner));
            }
            let Some(active) = status.active_player else {
                writeln!(self.output, "The game is a draw!")?;
                return Ok(RoundOutcome::Drawn);
            };

            // 当前玩家输入直到落子成功
            loop {
                let icon = self
                    .game
                    .with(|game| game.icon_of(&active))
                    .map(|icon| icon.to_string())
                    .unwrap_or_default();
                write!(self.output, "{active} ({icon}), enter a column: ")?;
                self.output.flush()?;

                let Some(line) = self.read_line()? else {
                    writeln!(self.output)?;
                    return Ok(RoundOutcome::Aborted);
                };
                let Ok(column) = line.parse::<usize>() else {
                    writeln!(self.output, "Please enter a column number.")?;
                    continue;
                };

                match self.game.apply_move(column, &active) {
                    Ok(row) => {
                        debug!(player = %active, column, row, "本地落子");
                        break;
                    }
                    Err(e) => writeln!(self.output, "Illegal move: {e}")?,
                }
            }
        }
    }

    fn ask_rematch(&mut self) -> Result<bool> {
        write!(self.output, "Play again? [y/N] ")?;
        self.output.flush()?;

        let answer = self.read_line()?.unwrap_or_default();
        Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }

    /// 读取一行输入，输入结束时返回 None
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}
