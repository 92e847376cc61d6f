//! セッション単位のエラー
//!
//! 1 行単位のエラー（`DecodeError`, `StaleTranslation`）はその場で捨てるので
//! ここには含めない。

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::lifecycle::EngineState;

#[derive(Debug, Error)]
pub enum UsiError {
    /// エンジンを起動できなかった（パイプの取得失敗を含む）
    #[error("failed to spawn engine at {}: {source}", path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 標準入力への書き込みに失敗した。エンジンは終了したものとして扱う。
    #[error("failed to write to engine: {0}")]
    Write(#[from] io::Error),

    /// 現在の状態では送れないコマンド。呼び出し側の不具合。
    #[error("`{command}` is not allowed while {state:?}")]
    IllegalCommand { command: String, state: EngineState },

    #[error("engine session is closed")]
    SessionClosed,
}

pub type Result<T> = std::result::Result<T, UsiError>;
