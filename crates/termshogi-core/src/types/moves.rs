//! 指し手（Move）

use std::fmt;

use thiserror::Error;

use super::{PieceType, Square};

/// USI 形式の指し手トークンを解析できなかった
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid USI move token: {0:?}")]
pub struct ParseMoveError(pub String);

/// 指し手
///
/// 盤上の駒を動かす手と持ち駒を打つ手の 2 種類。合法かどうかはここでは
/// 判断せず、`Position::do_move` で検査する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Normal { from: Square, to: Square, promote: bool },
    Drop { piece_type: PieceType, to: Square },
}

impl Move {
    /// 移動先
    #[inline]
    pub const fn to(self) -> Square {
        match self {
            Move::Normal { to, .. } | Move::Drop { to, .. } => to,
        }
    }

    /// 移動元（駒打ちは None）
    #[inline]
    pub const fn from(self) -> Option<Square> {
        match self {
            Move::Normal { from, .. } => Some(from),
            Move::Drop { .. } => None,
        }
    }

    #[inline]
    pub const fn is_drop(self) -> bool {
        matches!(self, Move::Drop { .. })
    }

    #[inline]
    pub const fn is_promote(self) -> bool {
        matches!(self, Move::Normal { promote: true, .. })
    }

    /// USI 表記（"7g7f", "8h2b+", "P*5e"）を解析する
    pub fn from_usi(s: &str) -> Result<Move, ParseMoveError> {
        let err = || ParseMoveError(s.to_string());

        if let Some((piece, to)) = s.split_once('*') {
            let mut chars = piece.chars();
            let (piece_type, _) = match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_uppercase() => {
                    PieceType::from_usi_char(c).ok_or_else(err)?
                }
                _ => return Err(err()),
            };
            if piece_type == PieceType::King {
                return Err(err());
            }
            let to = Square::from_usi(to).ok_or_else(err)?;
            return Ok(Move::Drop { piece_type, to });
        }

        let (body, promote) = match s.strip_suffix('+') {
            Some(stripped) => (stripped, true),
            None => (s, false),
        };
        if body.len() != 4 || !body.is_ascii() {
            return Err(err());
        }
        let from = Square::from_usi(&body[0..2]).ok_or_else(err)?;
        let to = Square::from_usi(&body[2..4]).ok_or_else(err)?;
        if from == to {
            return Err(err());
        }
        Ok(Move::Normal { from, to, promote })
    }

    pub fn to_usi(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Move::Normal { from, to, promote } => {
                write!(f, "{from}{to}")?;
                if promote {
                    f.write_str("+")?;
                }
                Ok(())
            }
            Move::Drop { piece_type, to } => write!(f, "{}*{to}", piece_type.usi_char()),
        }
    }
}
