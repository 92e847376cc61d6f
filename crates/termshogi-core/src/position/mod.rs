//! 局面（Position）

mod attacks;
mod sfen;

use thiserror::Error;

use crate::types::{Color, HAND_ORDER, Move, Piece, PieceType, Square};

pub use sfen::{SFEN_HIRATE, SfenError};

/// 着手が不正だった理由
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("no piece on {0}")]
    EmptySource(Square),
    #[error("piece on {0} belongs to the opponent")]
    NotOwnPiece(Square),
    #[error("piece on {from} cannot reach {to}")]
    Unreachable { from: Square, to: Square },
    #[error("cannot capture own piece on {0}")]
    OwnPieceCaptured(Square),
    #[error("king on {0} cannot be captured")]
    KingCaptured(Square),
    #[error("promotion is not allowed for {from}{to}")]
    IllegalPromotion { from: Square, to: Square },
    #[error("piece moving to {0} must promote")]
    MustPromote(Square),
    #[error("no {0:?} in hand")]
    EmptyHand(PieceType),
    #[error("cannot drop onto occupied square {0}")]
    DropOnOccupied(Square),
    #[error("dropped piece would have no move on {0}")]
    DeadDrop(Square),
    #[error("second unpromoted pawn on file {0}")]
    DoublePawn(u8),
    #[error("move leaves own king in check")]
    LeavesKingInCheck,
}

/// 局面
///
/// 盤面・持ち駒・手番・手数を保持する。`Clone` は安価なので、読み筋の再生では
/// 局面を複製してから着手する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    board: [Option<Piece>; Square::NUM],
    hands: [[u8; 7]; Color::NUM],
    side_to_move: Color,
    ply: u32,
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

impl Position {
    /// 駒のない局面（SFEN 解析の起点）
    pub(crate) fn empty() -> Self {
        Position {
            board: [None; Square::NUM],
            hands: [[0; 7]; Color::NUM],
            side_to_move: Color::Black,
            ply: 1,
        }
    }

    /// 平手初期局面
    pub fn startpos() -> Self {
        match Position::from_sfen(SFEN_HIRATE) {
            Ok(pos) => pos,
            Err(e) => unreachable!("SFEN_HIRATE must parse: {e}"),
        }
    }

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.board[sq.index()]
    }

    #[inline]
    pub fn hand_count(&self, color: Color, piece_type: PieceType) -> u8 {
        piece_type.hand_index().map_or(0, |i| self.hands[color.index()][i])
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// SFEN の手数（初期局面は 1）
    #[inline]
    pub fn ply(&self) -> u32 {
        self.ply
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        Square::all().find(|&sq| {
            self.piece_at(sq)
                .is_some_and(|p| p.color == color && p.piece_type == PieceType::King)
        })
    }

    /// 手番側の玉に王手がかかっているか
    pub fn is_in_check(&self) -> bool {
        self.is_king_attacked(self.side_to_move)
    }

    fn is_king_attacked(&self, color: Color) -> bool {
        self.king_square(color).is_some_and(|king| self.is_attacked(king, color.opponent()))
    }

    /// 指し手を検査して適用する。不正な場合は局面を変更せずにエラーを返す。
    pub fn do_move(&mut self, mv: Move) -> Result<(), MoveError> {
        let mut next = self.clone();
        match mv {
            Move::Normal { from, to, promote } => next.apply_normal(from, to, promote)?,
            Move::Drop { piece_type, to } => next.apply_drop(piece_type, to)?,
        }
        if next.is_king_attacked(self.side_to_move) {
            return Err(MoveError::LeavesKingInCheck);
        }
        next.side_to_move = self.side_to_move.opponent();
        next.ply += 1;
        *self = next;
        Ok(())
    }

    fn apply_normal(&mut self, from: Square, to: Square, promote: bool) -> Result<(), MoveError> {
        let us = self.side_to_move;
        let piece = self.piece_at(from).ok_or(MoveError::EmptySource(from))?;
        if piece.color != us {
            return Err(MoveError::NotOwnPiece(from));
        }
        if !self.reaches(from, piece, to) {
            return Err(MoveError::Unreachable { from, to });
        }
        let captured = self.piece_at(to);
        if let Some(captured) = captured {
            if captured.color == us {
                return Err(MoveError::OwnPieceCaptured(to));
            }
            if captured.piece_type == PieceType::King {
                return Err(MoveError::KingCaptured(to));
            }
        }

        let zone = from.in_promotion_zone(us) || to.in_promotion_zone(us);
        if promote && !(piece.is_promotable() && zone) {
            return Err(MoveError::IllegalPromotion { from, to });
        }
        if !promote && piece.is_dead_end(to.relative_rank(us)) {
            return Err(MoveError::MustPromote(to));
        }

        if let Some(i) = captured.and_then(|c| c.piece_type.hand_index()) {
            self.hands[us.index()][i] += 1;
        }
        self.board[from.index()] = None;
        self.board[to.index()] = Some(if promote { piece.promote() } else { piece });
        Ok(())
    }

    fn apply_drop(&mut self, piece_type: PieceType, to: Square) -> Result<(), MoveError> {
        let us = self.side_to_move;
        let Some(i) = piece_type.hand_index() else {
            return Err(MoveError::EmptyHand(piece_type));
        };
        if self.hands[us.index()][i] == 0 {
            return Err(MoveError::EmptyHand(piece_type));
        }
        if self.piece_at(to).is_some() {
            return Err(MoveError::DropOnOccupied(to));
        }
        let piece = Piece::new(us, piece_type);
        if piece.is_dead_end(to.relative_rank(us)) {
            return Err(MoveError::DeadDrop(to));
        }
        if piece_type == PieceType::Pawn && self.has_unpromoted_pawn_on_file(us, to.file()) {
            return Err(MoveError::DoublePawn(to.file()));
        }
        self.hands[us.index()][i] -= 1;
        self.board[to.index()] = Some(piece);
        Ok(())
    }

    fn has_unpromoted_pawn_on_file(&self, color: Color, file: u8) -> bool {
        (1..=9).filter_map(|rank| Square::new(file, rank)).any(|sq| {
            self.piece_at(sq).is_some_and(|p| {
                p.color == color && p.piece_type == PieceType::Pawn && !p.promoted
            })
        })
    }

    /// 手番側の合法手を列挙する（打ち歩詰めは検査しない）
    pub fn legal_moves(&self) -> Vec<Move> {
        let us = self.side_to_move;
        let mut candidates = Vec::new();
        for from in Square::all() {
            let Some(piece) = self.piece_at(from).filter(|p| p.color == us) else {
                continue;
            };
            for to in self.targets(from, piece) {
                candidates.push(Move::Normal { from, to, promote: false });
                candidates.push(Move::Normal { from, to, promote: true });
            }
        }
        for piece_type in HAND_ORDER {
            if self.hand_count(us, piece_type) == 0 {
                continue;
            }
            for to in Square::all().filter(|&sq| self.piece_at(sq).is_none()) {
                candidates.push(Move::Drop { piece_type, to });
            }
        }
        candidates
            .into_iter()
            .filter(|&mv| self.clone().do_move(mv).is_ok())
            .collect()
    }
}
