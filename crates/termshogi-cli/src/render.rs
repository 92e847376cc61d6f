//! コンソール表示用の文字列を組み立てる

use std::fmt::Write as _;

use termshogi_core::types::HAND_ORDER;
use termshogi_core::{Color, GameRecord, Piece, PieceType, Position, Square};
use termshogi_usi::{AnalysisView, StatusLine, TranslatedVariation};

const KANJI_NUMBERS: [&str; 19] = [
    "", "", "二", "三", "四", "五", "六", "七", "八", "九", "十", "十一", "十二", "十三", "十四",
    "十五", "十六", "十七", "十八",
];
const KANJI_RANKS: [&str; 10] = ["", "一", "二", "三", "四", "五", "六", "七", "八", "九"];

/// 盤面用の 1 文字表記（成駒も 1 文字）
fn board_char(piece: Piece) -> &'static str {
    match (piece.piece_type, piece.promoted) {
        (PieceType::Lance, true) => "杏",
        (PieceType::Knight, true) => "圭",
        (PieceType::Silver, true) => "全",
        (pt, promoted) => pt.kanji(promoted),
    }
}

fn hand_text(pos: &Position, color: Color) -> String {
    let parts: Vec<String> = HAND_ORDER
        .iter()
        .filter_map(|&pt| {
            let n = usize::from(pos.hand_count(color, pt));
            (n > 0).then(|| format!("{}{}", pt.kanji(false), KANJI_NUMBERS.get(n).unwrap_or(&"")))
        })
        .collect();
    if parts.is_empty() { "なし".to_string() } else { parts.join(" ") }
}

/// BOD 風の盤面
pub fn board(pos: &Position) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "後手の持駒：{}", hand_text(pos, Color::White));
    out.push_str("  ９ ８ ７ ６ ５ ４ ３ ２ １\n");
    out.push_str("+---------------------------+\n");
    for rank in 1..=9u8 {
        out.push('|');
        for file in (1..=9u8).rev() {
            let cell = Square::new(file, rank).and_then(|sq| pos.piece_at(sq));
            match cell {
                Some(piece) if piece.color == Color::White => {
                    let _ = write!(out, "v{}", board_char(piece));
                }
                Some(piece) => {
                    let _ = write!(out, " {}", board_char(piece));
                }
                None => out.push_str(" ・"),
            }
        }
        let _ = writeln!(out, "|{}", KANJI_RANKS[usize::from(rank)]);
    }
    out.push_str("+---------------------------+\n");
    let _ = writeln!(out, "先手の持駒：{}", hand_text(pos, Color::Black));
    let turn = match pos.side_to_move() {
        Color::Black => "先手番",
        Color::White => "後手番",
    };
    let _ = writeln!(out, "{turn}");
    out
}

fn row(variation: &TranslatedVariation) -> String {
    let score = variation.score.map_or_else(|| "-".to_string(), |s| s.to_string());
    let moves: Vec<String> = variation.moves.iter().map(ToString::to_string).collect();
    format!(
        "{:>2} {:>6.1}s {:>4} {:>10} {:>7}  {}",
        variation.multipv,
        variation.time_ms as f64 / 1000.0,
        variation.depth,
        variation.nodes,
        score,
        moves.join(" ")
    )
}

/// 読み筋の表。行が無ければ見出しだけ
pub fn analysis(view: &AnalysisView) -> String {
    let mut out = String::from(" R     時間 深さ   ノード数  評価値  読み筋\n");
    for variation in &view.rows {
        out.push_str(&row(variation));
        out.push('\n');
    }
    out
}

/// 棋譜。現在位置の行に `*` を付ける
pub fn moves(record: &GameRecord) -> String {
    let mut out = String::new();
    for (ply, line) in record.kif_lines().iter().enumerate() {
        let marker = if ply == record.cursor() { '*' } else { ' ' };
        let _ = writeln!(out, "{marker}{line}");
    }
    out
}

pub fn status(status: &StatusLine, record: &GameRecord) -> String {
    format!("[{status}] {}手目 / {}手", record.cursor(), record.len())
}
