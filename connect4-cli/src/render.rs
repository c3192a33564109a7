//! 文本棋盘渲染

use protocol::{BoardSnapshot, MatchStatus};

/// 空格子的显示字符
const EMPTY_CELL: &str = ".";

/// 渲染棋盘，首行为列号
///
/// ```text
/// 0 1 2 3 4 5 6
/// . . . . . . .
/// . . . X . . .
/// . O . X . . .
/// ```
pub fn render_board(board: &BoardSnapshot) -> String {
    let width = board.columns().saturating_sub(1).to_string().len();
    let mut out = String::new();

    let header: Vec<String> = (0..board.columns())
        .map(|column| format!("{column:>width$}"))
        .collect();
    out.push_str(&header.join(" "));
    out.push('\n');

    for row in board.iter_rows() {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| {
                let text = cell.map_or(EMPTY_CELL, |icon| icon.as_str());
                format!("{text:>width$}")
            })
            .collect();
        out.push_str(&cells.join(" "));
        out.push('\n');
    }

    out
}

/// 渲染状态行
pub fn render_status(status: &MatchStatus) -> String {
    let suffix = match (&status.winner, &status.active_player) {
        (Some(winner), _) => format!(", {winner} won"),
        (None, Some(active)) => format!(", {active} to move"),
        (None, None) => String::new(),
    };
    format!("Turn {}{suffix}", status.turn)
}
