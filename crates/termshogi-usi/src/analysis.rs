//! 読み筋の集約
//!
//! 探索世代ごとに 1 つの表を持ち、読み筋番号ごとに最新の行だけを残す。
//! 表の初期化（`reset`）は探索を開始する側だけが行い、イベントの受信を
//! きっかけに初期化することはない。

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, trace};
use parking_lot::Mutex;
use thiserror::Error;

use crate::channel::{AnalysisEvent, InfoReceiver};
use crate::translate::{BoardSnapshot, StaleTranslation, TranslatedVariation, translate_info};

pub type SharedTable = Arc<Mutex<AnalysisTable>>;

/// イベントを表に反映しなかった理由
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("no search position has been adopted yet")]
    NoPosition,
    #[error("event from generation {got} while table is at {expected}")]
    GenerationMismatch { expected: u64, got: u64 },
    #[error(transparent)]
    Stale(#[from] StaleTranslation),
}

/// 表示層に渡す表のコピー
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnalysisView {
    pub generation: u64,
    pub rows: Vec<TranslatedVariation>,
}

#[derive(Debug, Default)]
pub struct AnalysisTable {
    generation: u64,
    snapshot: Option<BoardSnapshot>,
    rows: Vec<TranslatedVariation>,
}

impl AnalysisTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedTable {
        Arc::new(Mutex::new(Self::new()))
    }

    /// 新しい世代を開始する。古い行はすべて捨てる。
    pub fn reset(&mut self, generation: u64, snapshot: BoardSnapshot) {
        debug!("analysis table reset to generation {generation}");
        self.generation = generation;
        self.snapshot = Some(snapshot);
        self.rows.clear();
    }

    /// 同じ読み筋番号の行があれば置き換え、なければ末尾に追加する
    pub fn append_or_update(&mut self, variation: TranslatedVariation) {
        match self.rows.iter_mut().find(|row| row.multipv == variation.multipv) {
            Some(row) => *row = variation,
            None => self.rows.push(variation),
        }
    }

    /// 世代を検査し、変換できた行だけを反映する
    pub fn accept(&mut self, event: &AnalysisEvent) -> Result<(), Rejection> {
        if event.generation != self.generation {
            return Err(Rejection::GenerationMismatch {
                expected: self.generation,
                got: event.generation,
            });
        }
        let snapshot = self.snapshot.as_ref().ok_or(Rejection::NoPosition)?;
        let variation = translate_info(&event.info, snapshot)?;
        self.append_or_update(variation);
        Ok(())
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn snapshot(&self) -> Option<&BoardSnapshot> {
        self.snapshot.as_ref()
    }

    /// 初出順の行
    pub fn rows(&self) -> &[TranslatedVariation] {
        &self.rows
    }

    pub fn view(&self) -> AnalysisView {
        AnalysisView {
            generation: self.generation,
            rows: self.rows.clone(),
        }
    }
}

/// チャネルを読み切るまで表に反映し続けるスレッドを起動する
///
/// `observer` は反映に成功するたびに、ロックの外で新しい表のコピーを受け取る。
pub fn spawn_consumer<F>(rx: InfoReceiver, table: SharedTable, observer: F) -> JoinHandle<()>
where
    F: Fn(AnalysisView) + Send + 'static,
{
    thread::spawn(move || {
        for event in rx.iter() {
            let result = {
                let mut table = table.lock();
                table.accept(&event).map(|()| table.view())
            };
            match result {
                Ok(view) => observer(view),
                Err(Rejection::Stale(stale)) => trace!("stale pv discarded: {stale}"),
                Err(rejection) => debug!("info event discarded: {rejection}"),
            }
        }
        debug!("info channel closed, consumer exiting");
    })
}
