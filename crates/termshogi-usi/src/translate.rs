//! 読み筋（USI 指し手列）を表示用の表記に変換する
//!
//! 探索開始時の局面を複製して 1 手ずつ再生する。途中で再生できなくなったら
//! そこで打ち切る。エンジンが UI の局面変更より先行していると起こるので、
//! 呼び出し側はその行を表示せずに捨てる。

use std::fmt;

use termshogi_core::{
    Color, Move, MoveError, NotationError, ParseMoveError, Position, Square, kif_move, side_mark,
};
use thiserror::Error;

use crate::protocol::{InfoLine, Score};

/// 探索開始時の局面
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSnapshot {
    pub position: Position,
    /// 直前の手の移動先（開始局面なら None）
    pub last_to: Option<Square>,
}

impl BoardSnapshot {
    pub fn new(position: Position, last_to: Option<Square>) -> Self {
        BoardSnapshot { position, last_to }
    }
}

/// 表示用の 1 手
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMove {
    pub color: Color,
    pub notation: String,
}

impl fmt::Display for DisplayMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", side_mark(self.color), self.notation)
    }
}

/// 変換済みの読み筋 1 行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedVariation {
    pub multipv: u32,
    pub time_ms: u64,
    pub depth: u32,
    pub nodes: u64,
    pub score: Option<Score>,
    pub moves: Vec<DisplayMove>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StaleReason {
    #[error(transparent)]
    Parse(#[from] ParseMoveError),
    #[error(transparent)]
    Notation(#[from] NotationError),
    #[error(transparent)]
    Illegal(#[from] MoveError),
}

/// 読み筋が局面と合わなかった
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("pv move #{index} `{token}` does not replay: {reason}")]
pub struct StaleTranslation {
    /// 失敗した手の位置（1 始まり）
    pub index: usize,
    pub token: String,
    #[source]
    pub reason: StaleReason,
}

/// `translate_pv` の結果。`stale` が Some なら `moves` は途中まで。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub moves: Vec<DisplayMove>,
    pub stale: Option<StaleTranslation>,
}

fn replay_one(
    pos: &mut Position,
    token: &str,
    prev_to: Option<Square>,
) -> Result<(Move, String), StaleReason> {
    let mv = Move::from_usi(token)?;
    let notation = kif_move(pos, mv, prev_to)?;
    pos.do_move(mv)?;
    Ok((mv, notation))
}

pub fn translate_pv<S: AsRef<str>>(tokens: &[S], snapshot: &BoardSnapshot) -> Translation {
    let mut pos = snapshot.position.clone();
    let mut prev_to = snapshot.last_to;
    let mut moves = Vec::with_capacity(tokens.len());

    for (i, token) in tokens.iter().enumerate() {
        let token = token.as_ref();
        let color = pos.side_to_move();
        match replay_one(&mut pos, token, prev_to) {
            Ok((mv, notation)) => {
                moves.push(DisplayMove { color, notation });
                prev_to = Some(mv.to());
            }
            Err(reason) => {
                return Translation {
                    moves,
                    stale: Some(StaleTranslation {
                        index: i + 1,
                        token: token.to_string(),
                        reason,
                    }),
                };
            }
        }
    }
    Translation { moves, stale: None }
}

/// info 行全体を変換する。途中で失敗した行は `Err`。
pub fn translate_info(
    info: &InfoLine,
    snapshot: &BoardSnapshot,
) -> Result<TranslatedVariation, StaleTranslation> {
    let translation = translate_pv(info.pv.as_slice(), snapshot);
    if let Some(stale) = translation.stale {
        return Err(stale);
    }
    Ok(TranslatedVariation {
        multipv: info.multipv,
        time_ms: info.time_ms,
        depth: info.depth,
        nodes: info.nodes,
        score: info.score,
        moves: translation.moves,
    })
}
