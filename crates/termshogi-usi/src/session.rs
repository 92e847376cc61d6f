//! エンジンプロセスのセッション
//!
//! 子プロセスと標準入出力を所有する。書き込みはライフサイクルの Mutex の中で
//! 行い、状態の検査・書き込み・遷移を 1 つの操作にする。標準出力は専用の
//! reader スレッドが読む。

use std::collections::HashSet;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, trace, warn};
use parking_lot::Mutex;

use crate::channel::{AnalysisEvent, InfoSender};
use crate::config::EngineConfig;
use crate::error::{Result, UsiError};
use crate::lifecycle::{EngineState, Lifecycle, LifecycleEvent, event_for};
use crate::protocol::{DecodeError, EngineCommand, EngineMessage, decode_line};

pub const ENGINE_QUIT_TIMEOUT: Duration = Duration::from_millis(300);
pub const ENGINE_QUIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// ハンドシェイクで得たエンジンの情報
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineIdentity {
    pub name: Option<String>,
    pub author: Option<String>,
    pub options: HashSet<String>,
}

impl EngineIdentity {
    /// 設定上の名前に対応する、エンジンが広告した綴りのオプション名
    ///
    /// 大文字小文字は区別しない（`MultiPv` は `MultiPV` に一致する）。
    /// 1 つも広告されていなければ設定の名前をそのまま返す。
    pub fn advertised_name<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.options.is_empty() {
            return Some(name);
        }
        if let Some(exact) = self.options.get(name) {
            return Some(exact.as_str());
        }
        self.options.iter().find(|o| o.eq_ignore_ascii_case(name)).map(String::as_str)
    }

    /// オプションを送ってよいか
    pub fn supports_option(&self, name: &str) -> bool {
        self.advertised_name(name).is_some()
    }
}

struct Control {
    lifecycle: Lifecycle,
    stdin: Option<BufWriter<ChildStdin>>,
}

struct Shared {
    control: Mutex<Control>,
    identity: Mutex<EngineIdentity>,
    /// reader が info に付ける探索世代
    search_generation: AtomicU64,
    exited: AtomicBool,
}

/// 1 つのエンジンプロセスとの入出力
pub struct EngineSession {
    path: PathBuf,
    shared: Arc<Shared>,
    child: Mutex<Child>,
    reader: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl EngineSession {
    /// エンジンを起動して reader スレッドを開始する。`usi` はまだ送らない。
    pub fn start(config: &EngineConfig, info_tx: InfoSender) -> Result<EngineSession> {
        let launch_error = |source: io::Error| UsiError::Launch {
            path: config.path.clone(),
            source,
        };

        let mut child = Command::new(&config.path)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(launch_error)?;

        let pipes = (child.stdin.take(), child.stdout.take());
        let (Some(stdin), Some(stdout)) = pipes else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(launch_error(io::Error::other("engine pipes are not attached")));
        };

        let shared = Arc::new(Shared {
            control: Mutex::new(Control {
                lifecycle: Lifecycle::new(),
                stdin: Some(BufWriter::new(stdin)),
            }),
            identity: Mutex::new(EngineIdentity::default()),
            search_generation: AtomicU64::new(0),
            exited: AtomicBool::new(false),
        });

        let reader_shared = Arc::clone(&shared);
        let reader = thread::Builder::new()
            .name("usi-reader".to_string())
            .spawn(move || read_loop(stdout, reader_shared, info_tx));
        let reader = match reader {
            Ok(handle) => handle,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(launch_error(e));
            }
        };

        info!("engine started: {}", config.path.display());
        Ok(EngineSession {
            path: config.path.clone(),
            shared,
            child: Mutex::new(child),
            reader: Mutex::new(Some(reader)),
            closed: AtomicBool::new(false),
        })
    }

    /// コマンドを 1 行送る
    ///
    /// 現在の状態で送れないコマンドは `IllegalCommand`。stop は探索中で未送信の
    /// ときだけ実際に書き込む。
    pub fn send(&self, command: &EngineCommand) -> Result<()> {
        let mut control = self.shared.control.lock();
        if control.stdin.is_none() {
            return Err(UsiError::SessionClosed);
        }
        control.lifecycle.check(command)?;
        if *command == EngineCommand::Stop && !control.lifecycle.stop_needed() {
            debug!("stop suppressed while {:?}", control.lifecycle.state());
            return Ok(());
        }
        write_command(&mut control, command)
    }

    /// 探索を開始する
    ///
    /// 待機中かつ readyok 済みであることを確認し、世代を記録してから
    /// `position` と `go infinite` を続けて送る。
    pub fn begin_search(&self, generation: u64, sfen: &str) -> Result<()> {
        let mut control = self.shared.control.lock();
        if control.stdin.is_none() {
            return Err(UsiError::SessionClosed);
        }
        if !control.lifecycle.is_idle_and_ready() {
            return Err(UsiError::IllegalCommand {
                command: "position".to_string(),
                state: control.lifecycle.state(),
            });
        }
        self.shared.search_generation.store(generation, Ordering::Release);
        write_command(&mut control, &EngineCommand::Position { sfen: sfen.to_string() })?;
        write_command(&mut control, &EngineCommand::GoInfinite)
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.shared.control.lock().lifecycle
    }

    pub fn state(&self) -> EngineState {
        self.lifecycle().state()
    }

    pub fn identity(&self) -> EngineIdentity {
        self.shared.identity.lock().clone()
    }

    pub fn engine_name(&self) -> Option<String> {
        self.shared.identity.lock().name.clone()
    }

    pub fn supports_option(&self, name: &str) -> bool {
        self.shared.identity.lock().supports_option(name)
    }

    /// エンジンの標準出力が閉じたか
    pub fn has_exited(&self) -> bool {
        self.shared.exited.load(Ordering::Acquire)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// quit を送り、終了しなければ kill する。2 回目以降は何もしない。
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        {
            let mut control = self.shared.control.lock();
            if let Some(mut stdin) = control.stdin.take() {
                debug!("> quit");
                let _ = write_line(&mut stdin, "quit");
            }
        }

        {
            let mut child = self.child.lock();
            let deadline = Instant::now() + ENGINE_QUIT_TIMEOUT;
            let mut exited = false;
            while Instant::now() < deadline {
                if let Ok(Some(status)) = child.try_wait() {
                    debug!("engine exited: {status}");
                    exited = true;
                    break;
                }
                thread::sleep(ENGINE_QUIT_POLL_INTERVAL);
            }
            if !exited {
                warn!("engine did not quit within {ENGINE_QUIT_TIMEOUT:?}, killing it");
                let _ = child.kill();
                let _ = child.wait();
            }
        }

        if let Some(handle) = self.reader.lock().take() {
            if handle.join().is_err() {
                warn!("usi reader thread panicked");
            }
        }
        info!("engine session closed: {}", self.path.display());
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn write_line(stdin: &mut BufWriter<ChildStdin>, line: &str) -> io::Result<()> {
    stdin.write_all(line.as_bytes())?;
    stdin.write_all(b"\n")?;
    stdin.flush()
}

fn write_command(control: &mut Control, command: &EngineCommand) -> Result<()> {
    let Some(stdin) = control.stdin.as_mut() else {
        return Err(UsiError::SessionClosed);
    };
    let line = command.to_string();
    debug!("> {line}");
    if let Err(e) = write_line(stdin, &line) {
        error!("failed to write `{line}` to engine: {e}");
        control.stdin = None;
        return Err(UsiError::Write(e));
    }
    if let Some(event) = event_for(command) {
        control.lifecycle.apply(event);
    }
    Ok(())
}

fn read_loop(stdout: ChildStdout, shared: Arc<Shared>, info_tx: InfoSender) {
    let reader = BufReader::new(stdout);
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("failed to read engine output: {e}");
                break;
            }
        };
        if line.starts_with("info") {
            trace!("< {line}");
        } else {
            debug!("< {line}");
        }
        match decode_line(&line) {
            Ok(message) => shared.dispatch(message, &info_tx),
            Err(DecodeError::Empty) => {}
            Err(e) => debug!("dropping engine line {line:?}: {e}"),
        }
    }
    shared.exited.store(true, Ordering::Release);
    info!("engine output closed");
}

impl Shared {
    fn apply(&self, event: LifecycleEvent) {
        self.control.lock().lifecycle.apply(event);
    }

    fn dispatch(&self, message: EngineMessage, info_tx: &InfoSender) {
        match message {
            EngineMessage::IdName(name) => self.identity.lock().name = Some(name),
            EngineMessage::IdAuthor(author) => self.identity.lock().author = Some(author),
            EngineMessage::Option(name) => {
                self.identity.lock().options.insert(name);
            }
            EngineMessage::UsiOk => self.apply(LifecycleEvent::UsiOkReceived),
            EngineMessage::ReadyOk => self.apply(LifecycleEvent::ReadyOkReceived),
            EngineMessage::BestMove { .. } => self.apply(LifecycleEvent::BestMoveReceived),
            EngineMessage::Info(info) if info.pv.is_empty() => {
                debug!("info without pv dropped");
            }
            EngineMessage::Info(info) => {
                let generation = self.search_generation.load(Ordering::Acquire);
                if info_tx.send(AnalysisEvent { generation, info }).is_err() {
                    debug!("info consumer is gone, event dropped");
                }
            }
            EngineMessage::InfoString(text) => debug!("engine says: {text}"),
        }
    }
}
