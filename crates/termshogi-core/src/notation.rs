//! KIF 形式の表示用表記
//!
//! 盤面に着手を適用する前の局面から `☗７六歩(77)` のような表記を作る。
//! 手番記号は `side_mark` で別に付ける。

use thiserror::Error;

use crate::position::Position;
use crate::types::{Color, Move, Square};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotationError {
    #[error("no piece on {0}")]
    EmptySource(Square),
}

const FILES: [&str; 9] = ["１", "２", "３", "４", "５", "６", "７", "８", "９"];
const RANKS: [&str; 9] = ["一", "二", "三", "四", "五", "六", "七", "八", "九"];

/// 手番記号（先手 ☗ / 後手 ☖）
pub const fn side_mark(color: Color) -> &'static str {
    match color {
        Color::Black => "☗",
        Color::White => "☖",
    }
}

fn square_label(sq: Square) -> String {
    let file = FILES[usize::from(sq.file() - 1)];
    let rank = RANKS[usize::from(sq.rank() - 1)];
    format!("{file}{rank}")
}

/// 指し手を KIF 表記にする
///
/// `prev_to` は直前の手の移動先。移動先が一致すれば `同　` と書く。
/// 合法性は検査しないので、呼び出し側で `Position::do_move` を使うこと。
pub fn kif_move(
    pos: &Position,
    mv: Move,
    prev_to: Option<Square>,
) -> Result<String, NotationError> {
    let mut out = if prev_to == Some(mv.to()) {
        "同　".to_string()
    } else {
        square_label(mv.to())
    };

    match mv {
        Move::Drop { piece_type, .. } => {
            out.push_str(piece_type.kanji(false));
            out.push('打');
        }
        Move::Normal { from, to, promote } => {
            let piece = pos.piece_at(from).ok_or(NotationError::EmptySource(from))?;
            out.push_str(piece.kanji());
            let us = piece.color;
            if promote {
                out.push('成');
            } else if piece.is_promotable()
                && (from.in_promotion_zone(us) || to.in_promotion_zone(us))
            {
                out.push_str("不成");
            }
            out.push_str(&format!("({}{})", from.file(), from.rank()));
        }
    }
    Ok(out)
}
