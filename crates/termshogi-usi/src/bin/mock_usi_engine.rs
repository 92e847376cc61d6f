//! テスト用の擬似 USI エンジン
//!
//! `go` を受け取ると MultiPV の本数だけ info 行を出し、`stop` で bestmove を返す。
//! 読み筋は合法手の先頭から貪欲に選ぶだけで、探索はしない。
//!
//! `--silent-handshake` を付けると `usiok` を返さない。
//! `--exit-after-go` を付けると `go` への info を出した直後に終了する。

use std::io::{self, BufRead, Write};

use termshogi_core::{Move, Position};

const PV_LENGTH: usize = 4;

struct MockEngine {
    position: Position,
    multipv: usize,
    searching: bool,
    silent_handshake: bool,
    exit_after_go: bool,
}

impl MockEngine {
    fn handle(&mut self, line: &str, out: &mut impl Write) -> io::Result<bool> {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("usi") => {
                writeln!(out, "id name MockEngine")?;
                writeln!(out, "id author termshogi")?;
                writeln!(out, "option name MultiPV type spin default 1 min 1 max 8")?;
                writeln!(out, "option name Threads type spin default 1 min 1 max 4")?;
                if !self.silent_handshake {
                    writeln!(out, "usiok")?;
                }
            }
            Some("isready") => writeln!(out, "readyok")?,
            Some("setoption") => {
                let rest: Vec<&str> = tokens.collect();
                if let ["name", "MultiPV", "value", n] = rest.as_slice() {
                    self.multipv = n.parse().unwrap_or(1).max(1);
                }
            }
            Some("position") => self.set_position(tokens.collect()),
            Some("go") => {
                self.searching = true;
                writeln!(out, "info string mock search started")?;
                writeln!(out, "info depth 1 nodes 1 time 0")?;
                for (i, pv) in self.variations().iter().enumerate() {
                    let pv: Vec<String> = pv.iter().map(|mv| mv.to_usi()).collect();
                    writeln!(
                        out,
                        "info depth {} seldepth {} multipv {} score cp {} nodes {} nps 1000 time {} pv {}",
                        pv.len(),
                        pv.len(),
                        i + 1,
                        50 - 20 * i as i32,
                        1000 * (i + 1),
                        10 * (i + 1),
                        pv.join(" ")
                    )?;
                }
                if self.exit_after_go {
                    out.flush()?;
                    return Ok(false);
                }
            }
            Some("stop") => {
                if self.searching {
                    self.searching = false;
                    let best = self
                        .position
                        .legal_moves()
                        .first()
                        .map_or_else(|| "resign".to_string(), |mv| mv.to_usi());
                    writeln!(out, "bestmove {best}")?;
                }
            }
            Some("quit") => return Ok(false),
            _ => {}
        }
        out.flush()?;
        Ok(true)
    }

    fn set_position(&mut self, args: Vec<&str>) {
        let (mut position, rest) = match args.as_slice() {
            ["startpos", rest @ ..] => (Position::startpos(), rest),
            ["sfen", a, b, c, d, rest @ ..] => {
                match Position::from_sfen(&format!("{a} {b} {c} {d}")) {
                    Ok(pos) => (pos, rest),
                    Err(_) => return,
                }
            }
            _ => return,
        };
        if let ["moves", moves @ ..] = rest {
            for token in moves {
                match Move::from_usi(token) {
                    Ok(mv) if position.do_move(mv).is_ok() => {}
                    _ => return,
                }
            }
        }
        self.position = position;
    }

    fn variations(&self) -> Vec<Vec<Move>> {
        self.position
            .legal_moves()
            .into_iter()
            .take(self.multipv)
            .map(|first| {
                let mut pos = self.position.clone();
                let mut pv = Vec::with_capacity(PV_LENGTH);
                let mut next = Some(first);
                while let Some(mv) = next {
                    if pos.do_move(mv).is_err() {
                        break;
                    }
                    pv.push(mv);
                    if pv.len() == PV_LENGTH {
                        break;
                    }
                    next = pos.legal_moves().first().copied();
                }
                pv
            })
            .collect()
    }
}

fn main() -> io::Result<()> {
    let mut engine = MockEngine {
        position: Position::startpos(),
        multipv: 1,
        searching: false,
        silent_handshake: std::env::args().any(|a| a == "--silent-handshake"),
        exit_after_go: std::env::args().any(|a| a == "--exit-after-go"),
    };
    let stdin = io::stdin();
    let mut out = io::stdout().lock();
    for line in stdin.lock().lines() {
        if !engine.handle(&line?, &mut out)? {
            break;
        }
    }
    Ok(())
}
