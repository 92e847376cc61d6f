//! 行入力のコンソール
//!
//! 標準入力から 1 行ずつコマンドを読み、棋譜を操作する。棋譜が変わるたびに
//! `Analyzer::on_board_changed` を呼ぶ。検討結果は別スレッドが一定間隔で
//! 最新の表だけを出力する。

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use crossbeam_channel::{Receiver, bounded, select, tick};
use log::{error, info, warn};
use parking_lot::Mutex;
use termshogi_core::{GameRecord, Move, Position};
use termshogi_usi::{Analyzer, AnalysisView, BoardSnapshot, BoardSource, Observer};

use crate::config::AppConfig;
use crate::render;

const HELP: &str = "\
v            検討の開始 / 停止 / 再開
<usi>, m <usi>  指す（例: 7g7f, P*5e, 8h2b+）
b / f        1 手戻る / 進む
j <ply>      指定した手数へ移動
sfen <sfen>  局面を指定して棋譜を作り直す
startpos     平手初期局面から棋譜を作り直す
p            盤面・棋譜・検討結果を表示
s            状態を表示
q            終了";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Toggle,
    Play(Move),
    Back,
    Forward,
    Jump(usize),
    Load(Position),
    Print,
    Status,
    Help,
    Quit,
}

/// 1 行を解釈する。空行は None
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    let command = match head {
        "" => return Ok(None),
        "v" => Command::Toggle,
        "b" => Command::Back,
        "f" => Command::Forward,
        "j" => Command::Jump(rest.parse().with_context(|| format!("invalid ply: {rest:?}"))?),
        "m" => Command::Play(Move::from_usi(rest)?),
        "sfen" => Command::Load(Position::from_sfen(rest)?),
        "startpos" => Command::Load(Position::startpos()),
        "p" => Command::Print,
        "s" => Command::Status,
        "h" | "help" | "?" => Command::Help,
        "q" | "quit" => Command::Quit,
        token => match Move::from_usi(token) {
            Ok(mv) if rest.is_empty() => Command::Play(mv),
            _ => bail!("unknown command: {line}"),
        },
    };
    Ok(Some(command))
}

/// 表示中の棋譜。`Analyzer` からも局面を読む
pub struct SharedRecord {
    record: Mutex<GameRecord>,
}

impl SharedRecord {
    pub fn new(record: GameRecord) -> Self {
        SharedRecord {
            record: Mutex::new(record),
        }
    }
}

impl BoardSource for SharedRecord {
    fn snapshot(&self) -> BoardSnapshot {
        let record = self.record.lock();
        BoardSnapshot::new(record.position().clone(), record.last_destination())
    }
}

type Output = Arc<Mutex<Box<dyn Write + Send>>>;

fn say(out: &Output, text: &str) -> io::Result<()> {
    let mut out = out.lock();
    writeln!(out, "{text}")?;
    out.flush()
}

struct Console {
    record: Arc<SharedRecord>,
    analyzer: Analyzer,
    out: Output,
}

impl Console {
    fn execute(&self, command: Command) -> io::Result<()> {
        match command {
            Command::Toggle => match self.analyzer.toggle() {
                Ok(()) => say(&self.out, &self.status_text()),
                Err(e) => {
                    error!("failed to start analysis: {e}");
                    say(&self.out, &format!("エンジンを起動できません: {e}"))
                }
            },
            Command::Play(mv) => {
                let pushed = self.record.record.lock().push(mv);
                match pushed {
                    Ok(()) => {
                        self.analyzer.on_board_changed();
                        let last = self.record.record.lock().kif_lines().pop().unwrap_or_default();
                        say(&self.out, last.trim_start())
                    }
                    Err(e) => say(&self.out, &format!("{} は指せません: {e}", mv.to_usi())),
                }
            }
            Command::Back => {
                let moved = self.record.record.lock().back();
                self.after_navigation(moved)
            }
            Command::Forward => {
                let moved = self.record.record.lock().forward();
                self.after_navigation(moved)
            }
            Command::Jump(ply) => {
                let moved = {
                    let mut record = self.record.record.lock();
                    let before = record.cursor();
                    record.go_to(ply);
                    record.cursor() != before
                };
                self.after_navigation(moved)
            }
            Command::Load(position) => {
                info!("new record from {}", position.to_sfen());
                *self.record.record.lock() = GameRecord::new(position);
                self.after_navigation(true)
            }
            Command::Print => {
                let text = {
                    let record = self.record.record.lock();
                    format!(
                        "{}\n{}\n{}",
                        render::board(record.position()),
                        render::moves(&record),
                        render::analysis(&self.analyzer.view())
                    )
                };
                say(&self.out, &text)
            }
            Command::Status => say(&self.out, &self.status_text()),
            Command::Help => say(&self.out, HELP),
            Command::Quit => Ok(()),
        }
    }

    /// 局面が変わったときだけ検討側に知らせる
    fn after_navigation(&self, moved: bool) -> io::Result<()> {
        if moved {
            self.analyzer.on_board_changed();
        }
        say(&self.out, &self.status_text())
    }

    fn status_text(&self) -> String {
        let status = self.analyzer.status();
        let record = self.record.record.lock();
        render::status(&status, &record)
    }
}

/// 最新の表があれば出力する。行のない表は出さない
fn spawn_refresher(
    latest: Arc<Mutex<Option<AnalysisView>>>,
    out: Output,
    interval: Duration,
    stop: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let ticker = tick(interval);
        loop {
            select! {
                recv(stop) -> _ => return,
                recv(ticker) -> _ => {}
            }
            let Some(view) = latest.lock().take() else {
                continue;
            };
            if view.rows.is_empty() {
                continue;
            }
            if let Err(e) = say(&out, &render::analysis(&view)) {
                warn!("failed to write analysis: {e}");
                return;
            }
        }
    })
}

/// 入力が尽きるか `q` を受け取るまでコマンドを処理する
pub fn run<R: BufRead>(
    config: &AppConfig,
    record: GameRecord,
    input: R,
    output: Box<dyn Write + Send>,
) -> Result<()> {
    let out: Output = Arc::new(Mutex::new(output));
    let record = Arc::new(SharedRecord::new(record));
    let latest = Arc::new(Mutex::new(None));

    // 表示層はここで最新の表を受け取るだけで、Analyzer には触れない
    let sink = Arc::clone(&latest);
    let observer: Observer = Arc::new(move |view: AnalysisView| {
        *sink.lock() = Some(view);
    });
    let analyzer = Analyzer::new(config.analyzer_config(), record.clone(), observer);

    let (stop_tx, stop_rx) = bounded::<()>(0);
    let refresher = spawn_refresher(latest, Arc::clone(&out), config.refresh_interval(), stop_rx);

    let console = Console {
        record,
        analyzer,
        out,
    };
    say(&console.out, "termshogi (h でヘルプ)")?;

    let result = command_loop(&console, input);

    drop(stop_tx);
    if refresher.join().is_err() {
        warn!("refresh thread panicked");
    }
    console.analyzer.shutdown();
    result
}

fn command_loop<R: BufRead>(console: &Console, input: R) -> Result<()> {
    for line in input.lines() {
        let line = line.context("failed to read console input")?;
        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => console.execute(command)?,
            Err(e) => say(&console.out, &format!("{e:#}"))?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn mv(s: &str) -> Move {
        Move::from_usi(s).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("").unwrap(), None);
        assert_eq!(parse_command("   ").unwrap(), None);
        assert_eq!(parse_command("v").unwrap(), Some(Command::Toggle));
        assert_eq!(parse_command("7g7f").unwrap(), Some(Command::Play(mv("7g7f"))));
        assert_eq!(parse_command("m P*5e").unwrap(), Some(Command::Play(mv("P*5e"))));
        assert_eq!(parse_command(" b ").unwrap(), Some(Command::Back));
        assert_eq!(parse_command("f").unwrap(), Some(Command::Forward));
        assert_eq!(parse_command("j 12").unwrap(), Some(Command::Jump(12)));
        assert_eq!(parse_command("startpos").unwrap(), Some(Command::Load(Position::startpos())));
        assert_eq!(parse_command("p").unwrap(), Some(Command::Print));
        assert_eq!(parse_command("s").unwrap(), Some(Command::Status));
        assert_eq!(parse_command("q").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn test_parse_sfen_command() {
        let line = "sfen lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1";
        assert_eq!(parse_command(line).unwrap(), Some(Command::Load(Position::startpos())));
        assert!(parse_command("sfen").is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("j").is_err());
        assert!(parse_command("j -1").is_err());
        assert!(parse_command("m").is_err());
        assert!(parse_command("hello").is_err());
        // 指し手の後ろに余計なトークンがある
        assert!(parse_command("7g7f 3c3d").is_err());
    }

    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn run_script(script: &str) -> String {
        let config = AppConfig {
            engine_path: "/nonexistent/termshogi-engine".into(),
            ..AppConfig::default()
        };
        let sink = Sink::default();
        run(&config, GameRecord::startpos(), Cursor::new(script), Box::new(sink.clone())).unwrap();
        let bytes = sink.0.lock().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_script_plays_and_navigates() {
        let output = run_script("7g7f\n3c3d\nb\np\nq\n7g7f\n");
        assert!(output.contains("☗７六歩(77)"));
        assert!(output.contains("☖３四歩(33)"));
        assert!(output.contains("[エンジンなし] 1手目 / 2手"));
        assert!(output.contains("*   1 ☗７六歩(77)"));
        // q の後の行は読まない
        assert_eq!(output.matches("☗７六歩(77)").count(), 2);
    }

    #[test]
    fn test_script_reports_errors() {
        let output = run_script("5e5d\nnonsense\nv\ns\n");
        assert!(output.contains("5e5d は指せません"));
        assert!(output.contains("unknown command: nonsense"));
        assert!(output.contains("エンジンを起動できません"));
        assert!(output.contains("[エンジンなし] 0手目 / 0手"));
    }
}
