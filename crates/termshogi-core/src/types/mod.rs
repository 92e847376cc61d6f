//! 基本型

mod color;
mod moves;
mod piece;
mod square;

pub use color::Color;
pub use moves::{Move, ParseMoveError};
pub use piece::{HAND_ORDER, Piece, PieceType};
pub use square::Square;
