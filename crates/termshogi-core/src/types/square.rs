//! 升（Square）

use std::fmt;

use super::Color;

/// 盤上の升（0〜80）
///
/// 内部インデックスは `(筋 - 1) * 9 + (段 - 1)`。筋・段はどちらも 1 始まりで、
/// USI 表記の `7g` は 7 筋 7 段に対応する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(u8);

impl Square {
    /// 升の数
    pub const NUM: usize = 81;

    /// 筋（1〜9）と段（1〜9）から升を作る
    #[inline]
    pub const fn new(file: u8, rank: u8) -> Option<Square> {
        if file >= 1 && file <= 9 && rank >= 1 && rank <= 9 {
            Some(Square((file - 1) * 9 + (rank - 1)))
        } else {
            None
        }
    }

    /// インデックス（0〜80）から升を作る
    #[inline]
    pub const fn from_index(index: usize) -> Option<Square> {
        if index < Self::NUM { Some(Square(index as u8)) } else { None }
    }

    /// 筋（1〜9）
    #[inline]
    pub const fn file(self) -> u8 {
        self.0 / 9 + 1
    }

    /// 段（1〜9）
    #[inline]
    pub const fn rank(self) -> u8 {
        self.0 % 9 + 1
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// 全ての升（1一, 1二, ..., 9九 の順）
    pub fn all() -> impl Iterator<Item = Square> {
        (0..Self::NUM as u8).map(Square)
    }

    /// 筋・段方向にずらした升。盤外なら None
    #[inline]
    pub fn offset(self, file_delta: i8, rank_delta: i8) -> Option<Square> {
        let file = self.file() as i8 + file_delta;
        let rank = self.rank() as i8 + rank_delta;
        if (1..=9).contains(&file) && (1..=9).contains(&rank) {
            Square::new(file as u8, rank as u8)
        } else {
            None
        }
    }

    /// 手番から見た段（先手はそのまま、後手は反転）
    #[inline]
    pub const fn relative_rank(self, color: Color) -> u8 {
        match color {
            Color::Black => self.rank(),
            Color::White => 10 - self.rank(),
        }
    }

    /// 敵陣（成れる段）かどうか
    #[inline]
    pub const fn in_promotion_zone(self, color: Color) -> bool {
        self.relative_rank(color) <= 3
    }

    /// USI 表記（例: "7g"）から変換
    pub fn from_usi(s: &str) -> Option<Square> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(file), Some(rank), None) => {
                let file = file.to_digit(10)? as u8;
                let offset = (rank as u32).checked_sub('a' as u32)?;
                let rank = u8::try_from(offset).ok()?.checked_add(1)?;
                Square::new(file, rank)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rank = (b'a' + self.rank() - 1) as char;
        write!(f, "{}{}", self.file(), rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_usi_roundtrip() {
        let sq = Square::from_usi("7g").unwrap();
        assert_eq!(sq.file(), 7);
        assert_eq!(sq.rank(), 7);
        assert_eq!(sq.to_string(), "7g");
        assert_eq!(Square::from_usi("1a"), Square::new(1, 1));
        assert_eq!(Square::from_usi("9i"), Square::new(9, 9));
    }

    #[test]
    fn test_square_rejects_out_of_board() {
        assert_eq!(Square::from_usi("0a"), None);
        assert_eq!(Square::from_usi("1j"), None);
        assert_eq!(Square::from_usi("1"), None);
        assert_eq!(Square::from_usi("1ab"), None);
        assert_eq!(Square::new(10, 1), None);
    }

    #[test]
    fn test_square_offset_and_zone() {
        let sq = Square::new(5, 5).unwrap();
        assert_eq!(sq.offset(0, -1), Square::new(5, 4));
        assert_eq!(Square::new(1, 1).unwrap().offset(-1, 0), None);

        // 先手は1-3段、後手は7-9段が敵陣
        assert!(Square::new(3, 3).unwrap().in_promotion_zone(Color::Black));
        assert!(!Square::new(3, 4).unwrap().in_promotion_zone(Color::Black));
        assert!(Square::new(3, 7).unwrap().in_promotion_zone(Color::White));
        assert!(!Square::new(3, 6).unwrap().in_promotion_zone(Color::White));
    }
}
