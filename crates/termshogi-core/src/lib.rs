//! termshogi の盤面モデル
//!
//! 検討コーディネータが必要とする範囲に絞った将棋のルール実装。
//! - 局面の複製と SFEN の読み書き
//! - USI 形式の指し手トークンの解析
//! - 合法性検査付きの着手（不正手は局面を変更せずにエラーを返す）
//! - KIF 形式の表示用表記
//! - 手順の記録と前後移動

pub mod notation;
pub mod position;
pub mod record;
pub mod types;

pub use notation::{NotationError, kif_move, side_mark};
pub use position::{MoveError, Position, SFEN_HIRATE, SfenError};
pub use record::GameRecord;
pub use types::{Color, Move, ParseMoveError, Piece, PieceType, Square};
