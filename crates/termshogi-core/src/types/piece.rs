//! 駒（PieceType / Piece）

use super::Color;

/// 駒種（成りは Piece 側のフラグで表す）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PieceType {
    Pawn = 0,
    Lance = 1,
    Knight = 2,
    Silver = 3,
    Gold = 4,
    Bishop = 5,
    Rook = 6,
    King = 7,
}

/// SFEN の持ち駒表記順（飛角金銀桂香歩）
pub const HAND_ORDER: [PieceType; 7] = [
    PieceType::Rook,
    PieceType::Bishop,
    PieceType::Gold,
    PieceType::Silver,
    PieceType::Knight,
    PieceType::Lance,
    PieceType::Pawn,
];

impl PieceType {
    /// 持ち駒配列のインデックス（玉は None）
    #[inline]
    pub const fn hand_index(self) -> Option<usize> {
        match self {
            PieceType::King => None,
            _ => Some(self as usize),
        }
    }

    #[inline]
    pub const fn can_promote(self) -> bool {
        matches!(
            self,
            PieceType::Pawn
                | PieceType::Lance
                | PieceType::Knight
                | PieceType::Silver
                | PieceType::Bishop
                | PieceType::Rook
        )
    }

    /// USI/SFEN の駒文字（大文字）
    pub const fn usi_char(self) -> char {
        match self {
            PieceType::Pawn => 'P',
            PieceType::Lance => 'L',
            PieceType::Knight => 'N',
            PieceType::Silver => 'S',
            PieceType::Gold => 'G',
            PieceType::Bishop => 'B',
            PieceType::Rook => 'R',
            PieceType::King => 'K',
        }
    }

    /// 駒文字から駒種と手番を得る（大文字が先手）
    pub fn from_usi_char(c: char) -> Option<(PieceType, Color)> {
        let color = if c.is_ascii_uppercase() { Color::Black } else { Color::White };
        let piece_type = match c.to_ascii_uppercase() {
            'P' => PieceType::Pawn,
            'L' => PieceType::Lance,
            'N' => PieceType::Knight,
            'S' => PieceType::Silver,
            'G' => PieceType::Gold,
            'B' => PieceType::Bishop,
            'R' => PieceType::Rook,
            'K' => PieceType::King,
            _ => return None,
        };
        Some((piece_type, color))
    }

    /// KIF の駒名
    pub const fn kanji(self, promoted: bool) -> &'static str {
        match (self, promoted) {
            (PieceType::Pawn, false) => "歩",
            (PieceType::Pawn, true) => "と",
            (PieceType::Lance, false) => "香",
            (PieceType::Lance, true) => "成香",
            (PieceType::Knight, false) => "桂",
            (PieceType::Knight, true) => "成桂",
            (PieceType::Silver, false) => "銀",
            (PieceType::Silver, true) => "成銀",
            (PieceType::Gold, _) => "金",
            (PieceType::Bishop, false) => "角",
            (PieceType::Bishop, true) => "馬",
            (PieceType::Rook, false) => "飛",
            (PieceType::Rook, true) => "龍",
            (PieceType::King, _) => "玉",
        }
    }
}

/// 盤上の駒
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub color: Color,
    pub piece_type: PieceType,
    pub promoted: bool,
}

impl Piece {
    #[inline]
    pub const fn new(color: Color, piece_type: PieceType) -> Self {
        Piece {
            color,
            piece_type,
            promoted: false,
        }
    }

    #[inline]
    pub const fn promote(self) -> Self {
        Piece {
            promoted: true,
            ..self
        }
    }

    /// 成ることができる状態か（成れる駒種で、まだ成っていない）
    #[inline]
    pub const fn is_promotable(self) -> bool {
        self.piece_type.can_promote() && !self.promoted
    }

    /// 行き所がない段に到達しているか（成らない前提）
    pub const fn is_dead_end(self, relative_rank: u8) -> bool {
        if self.promoted {
            return false;
        }
        match self.piece_type {
            PieceType::Pawn | PieceType::Lance => relative_rank == 1,
            PieceType::Knight => relative_rank <= 2,
            _ => false,
        }
    }

    /// SFEN の駒表記（例: "+P", "k"）
    pub fn to_sfen(self) -> String {
        let c = self.piece_type.usi_char();
        let c = match self.color {
            Color::Black => c,
            Color::White => c.to_ascii_lowercase(),
        };
        if self.promoted { format!("+{c}") } else { c.to_string() }
    }

    pub const fn kanji(self) -> &'static str {
        self.piece_type.kanji(self.promoted)
    }
}
