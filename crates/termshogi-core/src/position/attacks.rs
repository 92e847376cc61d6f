//! 駒の利き

use super::Position;
use crate::types::{Color, Piece, PieceType, Square};

/// 先手から見た方向（段が減る向きが前）
type Dir = (i8, i8);

const FORWARD: Dir = (0, -1);
const DIAGONALS: [Dir; 4] = [(-1, -1), (1, -1), (-1, 1), (1, 1)];
const ORTHOGONALS: [Dir; 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];
const GOLD_STEPS: [Dir; 6] = [(0, -1), (-1, -1), (1, -1), (-1, 0), (1, 0), (0, 1)];
const SILVER_STEPS: [Dir; 5] = [(0, -1), (-1, -1), (1, -1), (-1, 1), (1, 1)];
const KNIGHT_STEPS: [Dir; 2] = [(-1, -2), (1, -2)];
const KING_STEPS: [Dir; 8] = [(0, -1), (0, 1), (-1, 0), (1, 0), (-1, -1), (1, -1), (-1, 1), (1, 1)];

/// 1 マスずつ動く方向
fn steps(piece: Piece) -> &'static [Dir] {
    match (piece.piece_type, piece.promoted) {
        (PieceType::King, _) => &KING_STEPS,
        (PieceType::Gold, _)
        | (PieceType::Pawn | PieceType::Lance | PieceType::Knight | PieceType::Silver, true) => {
            &GOLD_STEPS
        }
        (PieceType::Silver, false) => &SILVER_STEPS,
        (PieceType::Knight, false) => &KNIGHT_STEPS,
        (PieceType::Pawn, false) => std::slice::from_ref(&FORWARD),
        (PieceType::Bishop, true) => &ORTHOGONALS,
        (PieceType::Rook, true) => &DIAGONALS,
        (PieceType::Lance | PieceType::Bishop | PieceType::Rook, false) => &[],
    }
}

/// 走り駒の方向
fn slides(piece: Piece) -> &'static [Dir] {
    match piece.piece_type {
        PieceType::Lance if !piece.promoted => std::slice::from_ref(&FORWARD),
        PieceType::Bishop => &DIAGONALS,
        PieceType::Rook => &ORTHOGONALS,
        _ => &[],
    }
}

#[inline]
fn oriented((df, dr): Dir, color: Color) -> Dir {
    match color {
        Color::Black => (df, dr),
        Color::White => (-df, -dr),
    }
}

impl Position {
    /// `from` の駒が利いている升（自駒のある升も含む）
    pub(crate) fn targets(&self, from: Square, piece: Piece) -> Vec<Square> {
        let mut out = Vec::new();
        for &dir in steps(piece) {
            let (df, dr) = oriented(dir, piece.color);
            if let Some(to) = from.offset(df, dr) {
                out.push(to);
            }
        }
        for &dir in slides(piece) {
            let (df, dr) = oriented(dir, piece.color);
            let mut cur = from;
            while let Some(next) = cur.offset(df, dr) {
                out.push(next);
                if self.piece_at(next).is_some() {
                    break;
                }
                cur = next;
            }
        }
        out
    }

    #[inline]
    pub(crate) fn reaches(&self, from: Square, piece: Piece, to: Square) -> bool {
        self.targets(from, piece).contains(&to)
    }

    /// `sq` に `by` 側の駒が利いているか
    pub fn is_attacked(&self, sq: Square, by: Color) -> bool {
        Square::all().any(|from| {
            self.piece_at(from)
                .is_some_and(|piece| piece.color == by && self.reaches(from, piece, sq))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        Square::from_usi(s).unwrap()
    }

    #[test]
    fn test_knight_targets_are_oriented() {
        let pos = Position::empty();
        let black = Piece::new(Color::Black, PieceType::Knight);
        let mut t = pos.targets(sq("5e"), black);
        t.sort();
        assert_eq!(t, vec![sq("4c"), sq("6c")]);

        let white = Piece::new(Color::White, PieceType::Knight);
        let mut t = pos.targets(sq("5e"), white);
        t.sort();
        assert_eq!(t, vec![sq("4g"), sq("6g")]);
    }

    #[test]
    fn test_dragon_and_horse_have_extra_steps() {
        let pos = Position::empty();
        let dragon = Piece::new(Color::Black, PieceType::Rook).promote();
        let horse = Piece::new(Color::Black, PieceType::Bishop).promote();
        assert!(pos.reaches(sq("5e"), dragon, sq("4d")));
        assert!(pos.reaches(sq("5e"), dragon, sq("5a")));
        assert!(pos.reaches(sq("5e"), horse, sq("5d")));
        assert!(pos.reaches(sq("5e"), horse, sq("1a")));
        assert!(!pos.reaches(sq("5e"), horse, sq("5c")));
    }

    #[test]
    fn test_is_attacked_from_startpos() {
        let pos = Position::startpos();
        // 先手の歩は 7f に利いている
        assert!(pos.is_attacked(sq("7f"), Color::Black));
        assert!(!pos.is_attacked(sq("5e"), Color::Black));
        assert!(pos.is_attacked(sq("3d"), Color::White));
    }
}
