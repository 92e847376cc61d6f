//! 検討の開始と再開
//!
//! 局面が変わるたびに、探索中なら stop を送り、エンジンが待機中かつ
//! readyok 済みになるまで一定間隔で確認してから新しい局面で探索を始める。
//! 要求ごとにチケットを発行し、新しい要求が来たら古い確認ループは
//! 何もせずに終了する。

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded, select, tick};
use log::{debug, error, info, warn};
use parking_lot::{Mutex, MutexGuard};

use crate::analysis::{AnalysisTable, AnalysisView, SharedTable, spawn_consumer};
use crate::channel::info_channel;
use crate::config::AnalyzerConfig;
use crate::error::{Result, UsiError};
use crate::lifecycle::EngineState;
use crate::protocol::EngineCommand;
use crate::session::EngineSession;
use crate::translate::BoardSnapshot;

/// 検討対象の局面を提供する側（表示層）
pub trait BoardSource: Send + Sync {
    /// 現在の局面と直前の手の移動先
    fn snapshot(&self) -> BoardSnapshot;
}

/// 表が更新されるたびに、どのロックも持たない状態で呼ばれる
pub type Observer = Arc<dyn Fn(AnalysisView) + Send + Sync>;

/// ステータス行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub engine_name: Option<String>,
    /// セッションがなければ None
    pub state: Option<EngineState>,
    pub generation: u64,
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            None => f.write_str("エンジンなし"),
            Some(state) => {
                let name = self.engine_name.as_deref().unwrap_or("engine");
                write!(f, "{name}: {}", state.label())
            }
        }
    }
}

#[derive(Default)]
struct Coordinator {
    session: Option<Arc<EngineSession>>,
    consumer: Option<JoinHandle<()>>,
    /// 連続検討を続けたいか
    wanted: bool,
    options_applied: bool,
    new_game_sent: bool,
    generation: u64,
    ticket: u64,
    /// 落とすと確認ループが終了する
    cancel: Option<Sender<()>>,
}

struct Inner {
    config: AnalyzerConfig,
    board: Arc<dyn BoardSource>,
    observer: Observer,
    table: SharedTable,
    coord: Mutex<Coordinator>,
}

/// エンジン検討のファサード
pub struct Analyzer {
    inner: Arc<Inner>,
}

impl Analyzer {
    /// エンジンを起動せずに作る
    pub fn new(config: AnalyzerConfig, board: Arc<dyn BoardSource>, observer: Observer) -> Self {
        Analyzer {
            inner: Arc::new(Inner {
                config,
                board,
                observer,
                table: AnalysisTable::shared(),
                coord: Mutex::new(Coordinator::default()),
            }),
        }
    }

    /// 作成してすぐにエンジンを起動し、最初の探索を予約する
    pub fn start(
        config: AnalyzerConfig,
        board: Arc<dyn BoardSource>,
        observer: Observer,
    ) -> Result<Self> {
        let analyzer = Self::new(config, board, observer);
        analyzer.launch()?;
        Ok(analyzer)
    }

    fn launch(&self) -> Result<()> {
        let inner = &self.inner;
        let mut coord = inner.coord.lock();
        if coord.session.is_some() {
            return Ok(());
        }

        let (info_tx, info_rx) =
            info_channel(inner.config.info_capacity, inner.config.overflow_policy);
        let session = Arc::new(EngineSession::start(&inner.config.engine, info_tx)?);
        session.send(&EngineCommand::Usi)?;

        let observer = Arc::clone(&inner.observer);
        let consumer = spawn_consumer(info_rx, Arc::clone(&inner.table), move |view| {
            observer(view)
        });

        coord.session = Some(session);
        coord.consumer = Some(consumer);
        coord.wanted = true;
        coord.options_applied = false;
        coord.new_game_sent = false;
        schedule_resume(inner, &mut coord);
        Ok(())
    }

    /// 表示中の局面が変わった
    pub fn on_board_changed(&self) {
        let inner = &self.inner;
        let mut coord = inner.coord.lock();
        if coord.session.is_some() && coord.wanted {
            schedule_resume(inner, &mut coord);
            return;
        }
        // 検討していなくても古い行は消す
        cancel_pending(&mut coord);
        start_generation(inner, &mut coord);
        drop(coord);
        publish(inner);
    }

    /// 未起動（または終了済み）なら起動、検討中なら停止、停止中なら再開する
    pub fn toggle(&self) -> Result<()> {
        let inner = &self.inner;
        let mut coord = inner.coord.lock();
        if coord.session.as_ref().is_some_and(|s| s.has_exited()) {
            cancel_pending(&mut coord);
            let retired = retire(&mut coord);
            drop(coord);
            retired.finish();
            return self.launch();
        }
        if coord.session.is_none() {
            drop(coord);
            return self.launch();
        }
        if coord.wanted {
            drop(coord);
            self.pause();
        } else {
            coord.wanted = true;
            schedule_resume(inner, &mut coord);
        }
        Ok(())
    }

    /// 予約中の再開を取り消し、探索中なら stop を送る
    pub fn pause(&self) {
        let mut coord = self.inner.coord.lock();
        coord.wanted = false;
        cancel_pending(&mut coord);
        if let Some(session) = &coord.session {
            if let Err(e) = session.send(&EngineCommand::Stop) {
                warn!("failed to stop engine: {e}");
            }
        }
    }

    /// エンジンを終了し、consumer の終了を待つ
    pub fn shutdown(&self) {
        let retired = {
            let mut coord = self.inner.coord.lock();
            cancel_pending(&mut coord);
            retire(&mut coord)
        };
        retired.finish();
    }

    /// エンジンが終了していれば状態は None（`エンジンなし`）
    pub fn status(&self) -> StatusLine {
        let coord = self.inner.coord.lock();
        let live = coord.session.as_ref().filter(|s| !s.has_exited());
        StatusLine {
            engine_name: live.and_then(|s| s.engine_name()),
            state: live.map(|s| s.state()),
            generation: coord.generation,
        }
    }

    pub fn view(&self) -> AnalysisView {
        self.inner.table.lock().view()
    }

    /// 連続検討中（または再開待ち）か
    pub fn is_active(&self) -> bool {
        let coord = self.inner.coord.lock();
        coord.session.is_some() && coord.wanted
    }
}

impl Drop for Analyzer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn cancel_pending(coord: &mut Coordinator) {
    coord.ticket += 1;
    coord.cancel = None;
}

/// コーディネータから外したセッションと consumer。ロックの外で片付ける
struct Retired {
    session: Option<Arc<EngineSession>>,
    consumer: Option<JoinHandle<()>>,
}

impl Retired {
    fn finish(self) {
        if let Some(session) = self.session {
            session.close();
        }
        if let Some(consumer) = self.consumer {
            if consumer.join().is_err() {
                warn!("analysis consumer thread panicked");
            }
        }
    }
}

fn retire(coord: &mut Coordinator) -> Retired {
    coord.wanted = false;
    coord.cancel = None;
    Retired {
        session: coord.session.take(),
        consumer: coord.consumer.take(),
    }
}

/// 世代を進めて表を初期化する。通知は呼び出し側がロックを外してから `publish` で行う
fn start_generation(inner: &Inner, coord: &mut Coordinator) -> BoardSnapshot {
    coord.generation += 1;
    let snapshot = inner.board.snapshot();
    inner.table.lock().reset(coord.generation, snapshot.clone());
    snapshot
}

fn publish(inner: &Inner) {
    let view = inner.table.lock().view();
    (inner.observer)(view);
}

fn schedule_resume(inner: &Arc<Inner>, coord: &mut Coordinator) {
    let Some(session) = coord.session.clone() else {
        return;
    };
    if session.state() == EngineState::Thinking {
        if let Err(e) = session.send(&EngineCommand::Stop) {
            warn!("failed to stop engine: {e}");
        }
    }

    cancel_pending(coord);
    let ticket = coord.ticket;
    let (cancel_tx, cancel_rx) = bounded::<()>(0);
    coord.cancel = Some(cancel_tx);

    let inner = Arc::clone(inner);
    thread::spawn(move || poll_until_ready(&inner, &session, ticket, &cancel_rx));
    debug!("resume #{ticket} scheduled");
}

fn poll_until_ready(inner: &Inner, session: &EngineSession, ticket: u64, cancel: &Receiver<()>) {
    let ticker = tick(inner.config.resume_poll_interval);
    loop {
        select! {
            recv(cancel) -> _ => {
                debug!("resume #{ticket} superseded");
                return;
            }
            recv(ticker) -> _ => {}
        }

        let mut coord = inner.coord.lock();
        if coord.ticket != ticket {
            return;
        }
        if session.has_exited() {
            error!("engine exited before analysis could resume");
            abandon(inner, coord);
            return;
        }
        match resume_step(inner, &mut coord, session) {
            Ok(false) => {}
            Ok(true) => {
                coord.cancel = None;
                drop(coord);
                publish(inner);
                return;
            }
            Err(e @ (UsiError::Write(_) | UsiError::SessionClosed)) => {
                error!("engine connection lost: {e}");
                abandon(inner, coord);
                return;
            }
            Err(e) => {
                error!("failed to resume analysis: {e}");
                coord.cancel = None;
                return;
            }
        }
    }
}

/// 終了したエンジンを外し、古い行を新しい局面に残さないよう空の世代を始める
fn abandon(inner: &Inner, mut coord: MutexGuard<'_, Coordinator>) {
    let retired = retire(&mut coord);
    start_generation(inner, &mut coord);
    drop(coord);
    publish(inner);
    retired.finish();
}

/// 1 回分の確認。探索を開始したら true
fn resume_step(inner: &Inner, coord: &mut Coordinator, session: &EngineSession) -> Result<bool> {
    let lifecycle = session.lifecycle();
    match lifecycle.state() {
        EngineState::Idling if !coord.options_applied => {
            let identity = session.identity();
            for (name, value) in &inner.config.engine.options {
                match identity.advertised_name(name) {
                    Some(advertised) => session.send(&EngineCommand::SetOption {
                        name: advertised.to_string(),
                        value: Some(value.clone()),
                    })?,
                    None => warn!("engine does not advertise option {name}, skipped"),
                }
            }
            session.send(&EngineCommand::IsReady)?;
            coord.options_applied = true;
            Ok(false)
        }
        EngineState::Idling if lifecycle.ready_ok() => {
            if !coord.new_game_sent {
                session.send(&EngineCommand::UsiNewGame)?;
                coord.new_game_sent = true;
            }
            let snapshot = start_generation(inner, coord);
            let sfen = snapshot.position.to_sfen();
            session.begin_search(coord.generation, &sfen)?;
            info!("analysis generation {} started: {sfen}", coord.generation);
            Ok(true)
        }
        // 予約前に送った stop がまだ届いていない場合に備えて再送する（重複は抑止される）
        EngineState::Thinking => {
            session.send(&EngineCommand::Stop)?;
            Ok(false)
        }
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Weak;
    use termshogi_core::Position;

    #[test]
    fn test_status_line_text() {
        let none = StatusLine {
            engine_name: None,
            state: None,
            generation: 0,
        };
        assert_eq!(none.to_string(), "エンジンなし");
        let thinking = StatusLine {
            engine_name: Some("MockEngine".to_string()),
            state: Some(EngineState::Thinking),
            generation: 3,
        };
        assert_eq!(thinking.to_string(), "MockEngine: 検討中");
    }

    struct Fixed;

    impl BoardSource for Fixed {
        fn snapshot(&self) -> BoardSnapshot {
            BoardSnapshot::new(Position::startpos(), None)
        }
    }

    #[test]
    fn test_board_change_without_engine_clears_rows() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer: Observer = Arc::new(move |view: AnalysisView| sink.lock().push(view));
        let config = AnalyzerConfig::new(crate::config::EngineConfig::new("unused"));
        let analyzer = Analyzer::new(config, Arc::new(Fixed), observer);

        assert!(!analyzer.is_active());
        analyzer.on_board_changed();
        analyzer.on_board_changed();
        assert_eq!(analyzer.status().generation, 2);
        assert_eq!(analyzer.status().state, None);

        let views = seen.lock();
        assert_eq!(views.len(), 2);
        assert!(views.iter().all(|v| v.rows.is_empty()));
        assert_eq!(views[1].generation, 2);
    }

    #[test]
    fn test_observer_may_query_analyzer() {
        let slot: Arc<Mutex<Weak<Analyzer>>> = Arc::new(Mutex::new(Weak::new()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (handle, sink) = (Arc::clone(&slot), Arc::clone(&seen));
        let observer: Observer = Arc::new(move |view: AnalysisView| {
            let analyzer = handle.lock().upgrade();
            if let Some(analyzer) = analyzer {
                let status = analyzer.status();
                sink.lock().push((view.generation, status.generation, analyzer.view().generation));
            }
        });
        let config = AnalyzerConfig::new(crate::config::EngineConfig::new("unused"));
        let analyzer = Arc::new(Analyzer::new(config, Arc::new(Fixed), observer));
        *slot.lock() = Arc::downgrade(&analyzer);

        analyzer.on_board_changed();
        assert_eq!(*seen.lock(), vec![(1, 1, 1)]);
    }
}
