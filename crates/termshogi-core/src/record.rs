//! 棋譜（手順と現在位置）

use crate::notation::{kif_move, side_mark};
use crate::position::{MoveError, Position};
use crate::types::{Move, Square};

/// 開始局面からの手順とカーソル
///
/// 各手の適用後の局面を保持しておき、前後移動では再計算しない。
/// カーソルより先に手を指すと、それ以降の手順は破棄される。
#[derive(Debug, Clone)]
pub struct GameRecord {
    initial: Position,
    moves: Vec<Move>,
    positions: Vec<Position>,
    cursor: usize,
}

impl Default for GameRecord {
    fn default() -> Self {
        Self::startpos()
    }
}

impl GameRecord {
    pub fn new(initial: Position) -> Self {
        GameRecord {
            positions: vec![initial.clone()],
            initial,
            moves: Vec::new(),
            cursor: 0,
        }
    }

    pub fn startpos() -> Self {
        Self::new(Position::startpos())
    }

    /// 現在位置で手を指す。不正手なら記録は変わらない。
    pub fn push(&mut self, mv: Move) -> Result<(), MoveError> {
        let mut next = self.position().clone();
        next.do_move(mv)?;
        self.moves.truncate(self.cursor);
        self.positions.truncate(self.cursor + 1);
        self.moves.push(mv);
        self.positions.push(next);
        self.cursor += 1;
        Ok(())
    }

    /// 1 手戻る。開始局面なら false
    pub fn back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// 1 手進む。最終手なら false
    pub fn forward(&mut self) -> bool {
        if self.cursor >= self.moves.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// 指定手数の局面へ移動する（範囲外は末尾に丸める）
    pub fn go_to(&mut self, ply: usize) {
        self.cursor = ply.min(self.moves.len());
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn initial(&self) -> &Position {
        &self.initial
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// カーソル位置の局面
    pub fn position(&self) -> &Position {
        &self.positions[self.cursor]
    }

    /// カーソル位置に至った手の移動先（`同` 表記に使う）
    pub fn last_destination(&self) -> Option<Square> {
        self.cursor.checked_sub(1).map(|i| self.moves[i].to())
    }

    /// 手順全体を KIF 風の行で返す
    pub fn kif_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.moves.len() + 1);
        lines.push("=== 開始局面 ===".to_string());
        let mut prev_to = None;
        for (i, &mv) in self.moves.iter().enumerate() {
            let pos = &self.positions[i];
            // 記録済みの手は適用に成功しているので表記も必ず作れる
            let text = kif_move(pos, mv, prev_to).unwrap_or_else(|_| mv.to_usi());
            lines.push(format!("{:>4} {}{}", i + 1, side_mark(pos.side_to_move()), text));
            prev_to = Some(mv.to());
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(s: &str) -> Move {
        Move::from_usi(s).unwrap()
    }

    fn record_of(tokens: &[&str]) -> GameRecord {
        let mut record = GameRecord::startpos();
        for token in tokens {
            record.push(mv(token)).unwrap();
        }
        record
    }

    #[test]
    fn test_navigation() {
        let mut record = record_of(&["7g7f", "3c3d", "2g2f"]);
        assert_eq!(record.cursor(), 3);
        assert!(!record.forward());
        assert!(record.back());
        // 2 手指した局面なので先手番
        assert_eq!(record.position().side_to_move(), crate::Color::Black);
        assert_eq!(record.last_destination(), Square::from_usi("3d"));
        record.go_to(0);
        assert_eq!(record.position(), &Position::startpos());
        assert_eq!(record.last_destination(), None);
        assert!(!record.back());
        record.go_to(99);
        assert_eq!(record.cursor(), 3);
    }

    #[test]
    fn test_push_truncates_forward_branch() {
        let mut record = record_of(&["7g7f", "3c3d", "2g2f"]);
        record.go_to(1);
        record.push(mv("8c8d")).unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(record.moves()[1], mv("8c8d"));
        assert!(!record.forward());
    }

    #[test]
    fn test_illegal_push_keeps_record() {
        let mut record = record_of(&["7g7f"]);
        assert!(record.push(mv("7f7e")).is_err());
        assert_eq!(record.len(), 1);
        assert_eq!(record.cursor(), 1);
    }

    #[test]
    fn test_kif_lines() {
        let record = record_of(&["7g7f", "3c3d", "8h2b+", "3a2b"]);
        assert_eq!(
            record.kif_lines(),
            vec![
                "=== 開始局面 ===",
                "   1 ☗７六歩(77)",
                "   2 ☖３四歩(33)",
                "   3 ☗２二角成(88)",
                "   4 ☖同　銀(31)",
            ]
        );
    }
}
