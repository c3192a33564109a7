//! 棋子标记与玩家席位

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 玩家标识（由调用方提供，对引擎不透明）
pub type PlayerId = String;

/// 棋子标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Icon {
    /// 先注册的玩家
    #[serde(rename = "X")]
    X,
    /// 后注册的玩家
    #[serde(rename = "O")]
    O,
}

impl Icon {
    /// 获取显示字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            Icon::X => "X",
            Icon::O => "O",
        }
    }
}

impl fmt::Display for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Icon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "X" => Ok(Icon::X),
            "O" => Ok(Icon::O),
            other => Err(format!("unknown icon: {other:?}")),
        }
    }
}

/// 玩家席位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    /// 一号位（先手，偶数回合走棋）
    Slot1,
    /// 二号位（后手，奇数回合走棋）
    Slot2,
}

impl Slot {
    /// 按注册顺序排列的全部席位
    pub const ALL: [Slot; 2] = [Slot::Slot1, Slot::Slot2];

    /// 席位固定对应的棋子标记
    pub fn icon(&self) -> Icon {
        match self {
            Slot::Slot1 => Icon::X,
            Slot::Slot2 => Icon::O,
        }
    }

    /// 根据回合数推算当前走棋的席位
    pub fn for_turn(turn: usize) -> Slot {
        if turn % 2 == 0 {
            Slot::Slot1
        } else {
            Slot::Slot2
        }
    }

    /// 数组下标
    pub fn index(&self) -> usize {
        match self {
            Slot::Slot1 => 0,
            Slot::Slot2 => 1,
        }
    }
}

/// 已绑定的玩家席位
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSlot {
    pub player_id: PlayerId,
    pub icon: Icon,
}

impl PlayerSlot {
    pub fn new(player_id: PlayerId, icon: Icon) -> Self {
        Self { player_id, icon }
    }
}
