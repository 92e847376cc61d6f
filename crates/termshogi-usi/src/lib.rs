//! USI エンジンの検討コーディネータ
//!
//! 外部 USI エンジンをサブプロセスとして起動し、`go infinite` の info 出力を
//! 読み筋ごとの表に集約する。
//!
//! スレッド構成:
//! - reader: エンジンの標準出力を読み、状態遷移と info イベントの送出を行う
//! - consumer: info チャネルから受け取り、世代を検査して表に反映する
//! - resume: 局面変更のたびに起動し、待機中になるのを待って探索を再開する

pub mod analysis;
pub mod channel;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod protocol;
pub mod resume;
pub mod session;
pub mod translate;

pub use analysis::{AnalysisTable, AnalysisView, Rejection, SharedTable, spawn_consumer};
pub use channel::{AnalysisEvent, InfoReceiver, InfoSender, info_channel};
pub use config::{AnalyzerConfig, EngineConfig, OverflowPolicy};
pub use error::{Result, UsiError};
pub use lifecycle::{EngineState, Lifecycle, LifecycleEvent};
pub use protocol::{DecodeError, EngineCommand, EngineMessage, InfoLine, Score, decode_line};
pub use resume::{Analyzer, BoardSource, Observer, StatusLine};
pub use session::{EngineIdentity, EngineSession};
pub use translate::{
    BoardSnapshot, DisplayMove, StaleTranslation, TranslatedVariation, Translation, translate_info,
    translate_pv,
};
