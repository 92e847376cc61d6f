//! SFEN の読み書き

use thiserror::Error;

use super::Position;
use crate::types::{Color, HAND_ORDER, Piece, PieceType, Square};

/// 平手初期局面
pub const SFEN_HIRATE: &str = "lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SfenError {
    #[error("SFEN must have at least 3 fields: {0:?}")]
    MissingFields(String),
    #[error("board must have 9 ranks, got {0}")]
    RankCount(usize),
    #[error("rank {rank} does not describe 9 files: {row:?}")]
    FileCount { rank: u8, row: String },
    #[error("unexpected character {0:?} in board")]
    BadPieceChar(char),
    #[error("invalid side to move: {0:?}")]
    BadSide(String),
    #[error("invalid hand: {0:?}")]
    BadHand(String),
    #[error("invalid move number: {0:?}")]
    BadMoveNumber(String),
}

impl Position {
    /// SFEN 文字列から局面を作る。手数は省略可能（省略時は 1）。
    pub fn from_sfen(sfen: &str) -> Result<Position, SfenError> {
        let fields: Vec<&str> = sfen.split_whitespace().collect();
        if fields.len() < 3 {
            return Err(SfenError::MissingFields(sfen.to_string()));
        }

        let mut pos = Position::empty();
        parse_board(&mut pos, fields[0])?;

        pos.side_to_move = match fields[1] {
            "b" => Color::Black,
            "w" => Color::White,
            other => return Err(SfenError::BadSide(other.to_string())),
        };

        parse_hands(&mut pos, fields[2])?;

        if let Some(ply) = fields.get(3) {
            pos.ply = match ply.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => return Err(SfenError::BadMoveNumber(ply.to_string())),
            };
        }
        Ok(pos)
    }

    pub fn to_sfen(&self) -> String {
        let mut rows = Vec::with_capacity(9);
        for rank in 1..=9u8 {
            let mut row = String::new();
            let mut empty = 0;
            for file in (1..=9u8).rev() {
                match Square::new(file, rank).and_then(|sq| self.piece_at(sq)) {
                    Some(piece) => {
                        if empty > 0 {
                            row.push_str(&empty.to_string());
                            empty = 0;
                        }
                        row.push_str(&piece.to_sfen());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                row.push_str(&empty.to_string());
            }
            rows.push(row);
        }

        let mut hands = String::new();
        for color in [Color::Black, Color::White] {
            for pt in HAND_ORDER {
                let n = self.hand_count(color, pt);
                if n == 0 {
                    continue;
                }
                if n > 1 {
                    hands.push_str(&n.to_string());
                }
                hands.push_str(&Piece::new(color, pt).to_sfen());
            }
        }
        if hands.is_empty() {
            hands.push('-');
        }

        format!(
            "{} {} {hands} {}",
            rows.join("/"),
            self.side_to_move.to_sfen_char(),
            self.ply
        )
    }
}

fn parse_board(pos: &mut Position, board: &str) -> Result<(), SfenError> {
    let rows: Vec<&str> = board.split('/').collect();
    if rows.len() != 9 {
        return Err(SfenError::RankCount(rows.len()));
    }
    for (i, row) in rows.iter().enumerate() {
        let rank = i as u8 + 1;
        let bad_row = || SfenError::FileCount {
            rank,
            row: row.to_string(),
        };
        // 9 筋から 1 筋へ
        let mut file: i8 = 9;
        let mut promoted = false;
        for c in row.chars() {
            if let Some(n) = c.to_digit(10) {
                if promoted || n == 0 {
                    return Err(SfenError::BadPieceChar(c));
                }
                file -= n as i8;
                if file < 0 {
                    return Err(bad_row());
                }
                continue;
            }
            if c == '+' {
                if promoted {
                    return Err(SfenError::BadPieceChar(c));
                }
                promoted = true;
                continue;
            }
            let (piece_type, color) =
                PieceType::from_usi_char(c).ok_or(SfenError::BadPieceChar(c))?;
            let sq = Square::new(file as u8, rank).ok_or_else(bad_row)?;
            let mut piece = Piece::new(color, piece_type);
            if promoted {
                if !piece_type.can_promote() {
                    return Err(SfenError::BadPieceChar(c));
                }
                piece = piece.promote();
                promoted = false;
            }
            pos.board[sq.index()] = Some(piece);
            file -= 1;
        }
        if file != 0 || promoted {
            return Err(bad_row());
        }
    }
    Ok(())
}

fn parse_hands(pos: &mut Position, hands: &str) -> Result<(), SfenError> {
    if hands == "-" {
        return Ok(());
    }
    let bad = || SfenError::BadHand(hands.to_string());
    let mut count: Option<u32> = None;
    for c in hands.chars() {
        if let Some(d) = c.to_digit(10) {
            let n = count.unwrap_or(0) * 10 + d;
            if n > 18 {
                return Err(bad());
            }
            count = Some(n);
            continue;
        }
        let (piece_type, color) = PieceType::from_usi_char(c).ok_or_else(bad)?;
        let index = piece_type.hand_index().ok_or_else(bad)?;
        let n = count.take().unwrap_or(1);
        if n == 0 {
            return Err(bad());
        }
        let slot = &mut pos.hands[color.index()][index];
        *slot = slot.saturating_add(n as u8);
    }
    if count.is_some() {
        return Err(bad());
    }
    Ok(())
}
