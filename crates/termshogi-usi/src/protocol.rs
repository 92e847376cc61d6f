//! USI の行単位コーデック
//!
//! エンジン出力 1 行を `EngineMessage` に変換し、送信コマンドを
//! `EngineCommand` の `Display` で 1 行に整形する。

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// 評価値
///
/// 詰みの手数は負なら詰まされる側。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    MateIn(i32),
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Score::Centipawns(cp) => write!(f, "{cp:+}"),
            Score::MateIn(n) if n >= 0 => write!(f, "詰{n}"),
            Score::MateIn(n) => write!(f, "被詰{}", n.unsigned_abs()),
        }
    }
}

/// `info` 行の内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoLine {
    /// 読み筋番号（1 始まり、省略時は 1）
    pub multipv: u32,
    pub time_ms: u64,
    pub depth: u32,
    pub seldepth: Option<u32>,
    pub nodes: u64,
    pub nps: Option<u64>,
    pub score: Option<Score>,
    pub pv: Vec<String>,
}

impl Default for InfoLine {
    fn default() -> Self {
        InfoLine {
            multipv: 1,
            time_ms: 0,
            depth: 0,
            seldepth: None,
            nodes: 0,
            nps: None,
            score: None,
            pv: Vec::new(),
        }
    }
}

/// エンジンから受け取るメッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineMessage {
    IdName(String),
    IdAuthor(String),
    /// `option name <name> type ...` のオプション名
    Option(String),
    UsiOk,
    ReadyOk,
    BestMove { mv: String, ponder: Option<String> },
    Info(InfoLine),
    InfoString(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty line")]
    Empty,
    #[error("unknown message {0:?}")]
    Unknown(String),
    #[error("`{keyword}` is missing its value")]
    MissingValue { keyword: &'static str },
    #[error("`{keyword}` has a malformed value {value:?}")]
    BadValue { keyword: &'static str, value: String },
}

/// エンジン出力 1 行を解析する
pub fn decode_line(line: &str) -> Result<EngineMessage, DecodeError> {
    let line = line.trim();
    let (head, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim_start();
    match head {
        "" => Err(DecodeError::Empty),
        "usiok" => Ok(EngineMessage::UsiOk),
        "readyok" => Ok(EngineMessage::ReadyOk),
        "id" => {
            if let Some(name) = rest.strip_prefix("name") {
                Ok(EngineMessage::IdName(name.trim().to_string()))
            } else if let Some(author) = rest.strip_prefix("author") {
                Ok(EngineMessage::IdAuthor(author.trim().to_string()))
            } else {
                Err(DecodeError::Unknown(line.to_string()))
            }
        }
        "option" => parse_option_name(rest)
            .map(EngineMessage::Option)
            .ok_or(DecodeError::MissingValue { keyword: "name" }),
        "bestmove" => {
            let mut tokens = rest.split_whitespace();
            let mv = tokens.next().ok_or(DecodeError::MissingValue { keyword: "bestmove" })?;
            let ponder = match tokens.next() {
                Some("ponder") => tokens.next().map(str::to_string),
                _ => None,
            };
            Ok(EngineMessage::BestMove {
                mv: mv.to_string(),
                ponder,
            })
        }
        "info" => decode_info(rest),
        _ => Err(DecodeError::Unknown(line.to_string())),
    }
}

fn value<T: FromStr>(tokens: &[&str], i: usize, keyword: &'static str) -> Result<T, DecodeError> {
    let raw = tokens.get(i + 1).ok_or(DecodeError::MissingValue { keyword })?;
    raw.parse::<T>().map_err(|_| DecodeError::BadValue {
        keyword,
        value: raw.to_string(),
    })
}

fn decode_info(rest: &str) -> Result<EngineMessage, DecodeError> {
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    let mut info = InfoLine::default();
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            "string" => {
                let text = rest.split_once("string").map_or("", |(_, s)| s.trim());
                return Ok(EngineMessage::InfoString(text.to_string()));
            }
            "multipv" => {
                info.multipv = value(&tokens, i, "multipv")?;
                if info.multipv == 0 {
                    return Err(DecodeError::BadValue {
                        keyword: "multipv",
                        value: "0".to_string(),
                    });
                }
                i += 2;
            }
            "depth" => {
                info.depth = value(&tokens, i, "depth")?;
                i += 2;
            }
            "seldepth" => {
                info.seldepth = Some(value(&tokens, i, "seldepth")?);
                i += 2;
            }
            "time" => {
                info.time_ms = value(&tokens, i, "time")?;
                i += 2;
            }
            "nodes" => {
                info.nodes = value(&tokens, i, "nodes")?;
                i += 2;
            }
            "nps" => {
                info.nps = Some(value(&tokens, i, "nps")?);
                i += 2;
            }
            "score" => {
                info.score = match tokens.get(i + 1).copied() {
                    Some("cp") => Some(Score::Centipawns(value(&tokens, i + 1, "cp")?)),
                    // 符号だけの "mate +" / "mate -" は手数不明として扱う
                    Some("mate") => match tokens.get(i + 2).copied() {
                        Some("+" | "-") => None,
                        _ => Some(Score::MateIn(value(&tokens, i + 1, "mate")?)),
                    },
                    _ => return Err(DecodeError::MissingValue { keyword: "score" }),
                };
                i += 3;
            }
            "hashfull" | "currmove" | "currmovenumber" | "cpuload" | "refutation" => i += 2,
            "pv" => {
                info.pv = tokens[i + 1..].iter().map(|s| s.to_string()).collect();
                break;
            }
            // lowerbound / upperbound やエンジン独自の拡張
            _ => i += 1,
        }
    }
    Ok(EngineMessage::Info(info))
}

/// `option` 行の残りからオプション名を取り出す（空白を含む名前に対応）
pub fn parse_option_name(rest: &str) -> Option<String> {
    let parts: Vec<&str> = rest
        .split_whitespace()
        .skip_while(|t| *t != "name")
        .skip(1)
        .take_while(|t| *t != "type")
        .collect();
    if parts.is_empty() { None } else { Some(parts.join(" ")) }
}

/// エンジンへ送るコマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    Usi,
    IsReady,
    SetOption { name: String, value: Option<String> },
    UsiNewGame,
    Position { sfen: String },
    GoInfinite,
    Stop,
    Quit,
}

impl EngineCommand {
    /// コマンド名（ログとエラー用）
    pub const fn keyword(&self) -> &'static str {
        match self {
            EngineCommand::Usi => "usi",
            EngineCommand::IsReady => "isready",
            EngineCommand::SetOption { .. } => "setoption",
            EngineCommand::UsiNewGame => "usinewgame",
            EngineCommand::Position { .. } => "position",
            EngineCommand::GoInfinite => "go",
            EngineCommand::Stop => "stop",
            EngineCommand::Quit => "quit",
        }
    }
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineCommand::SetOption { name, value: Some(value) } => {
                write!(f, "setoption name {name} value {value}")
            }
            EngineCommand::SetOption { name, value: None } => write!(f, "setoption name {name}"),
            EngineCommand::Position { sfen } => write!(f, "position sfen {sfen}"),
            EngineCommand::GoInfinite => f.write_str("go infinite"),
            other => f.write_str(other.keyword()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(line: &str) -> InfoLine {
        match decode_line(line).unwrap() {
            EngineMessage::Info(info) => info,
            other => panic!("expected info, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_multipv_info() {
        let info = info(
            "info depth 10 seldepth 14 score cp 34 multipv 2 nodes 500 nps 12000 time 41 \
             hashfull 3 pv 7g7f 3c3d",
        );
        assert_eq!(info.multipv, 2);
        assert_eq!(info.depth, 10);
        assert_eq!(info.seldepth, Some(14));
        assert_eq!(info.nodes, 500);
        assert_eq!(info.nps, Some(12000));
        assert_eq!(info.time_ms, 41);
        assert_eq!(info.score, Some(Score::Centipawns(34)));
        assert_eq!(info.pv, vec!["7g7f", "3c3d"]);
    }

    #[test]
    fn test_decode_missing_fields_use_defaults() {
        let info = info("info depth 3 pv 2g2f");
        assert_eq!(info.multipv, 1);
        assert_eq!(info.nodes, 0);
        assert_eq!(info.score, None);
        assert_eq!(info.pv, vec!["2g2f"]);
    }

    #[test]
    fn test_decode_mate_scores() {
        assert_eq!(info("info score mate 5 pv 2b3c+").score, Some(Score::MateIn(5)));
        assert_eq!(info("info score mate -3 pv 2b3c+").score, Some(Score::MateIn(-3)));
        assert_eq!(info("info score mate + pv 2b3c+").score, None);
        assert_eq!(
            info("info score cp -120 lowerbound pv 7g7f").score,
            Some(Score::Centipawns(-120))
        );
    }

    #[test]
    fn test_decode_info_string() {
        assert_eq!(
            decode_line("info string  Loading eval file").unwrap(),
            EngineMessage::InfoString("Loading eval file".to_string())
        );
    }

    #[test]
    fn test_decode_handshake_lines() {
        assert_eq!(decode_line("usiok").unwrap(), EngineMessage::UsiOk);
        assert_eq!(decode_line("readyok\r").unwrap(), EngineMessage::ReadyOk);
        assert_eq!(
            decode_line("id name YaneuraOu NNUE 8.30").unwrap(),
            EngineMessage::IdName("YaneuraOu NNUE 8.30".to_string())
        );
        assert_eq!(
            decode_line("option name USI_Hash type spin default 256").unwrap(),
            EngineMessage::Option("USI_Hash".to_string())
        );
        assert_eq!(
            decode_line("bestmove 7g7f ponder 3c3d").unwrap(),
            EngineMessage::BestMove {
                mv: "7g7f".to_string(),
                ponder: Some("3c3d".to_string())
            }
        );
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(decode_line("   "), Err(DecodeError::Empty));
        assert!(matches!(decode_line("checkmate notimplemented"), Err(DecodeError::Unknown(_))));
        assert!(matches!(
            decode_line("info depth x pv 7g7f"),
            Err(DecodeError::BadValue { keyword: "depth", .. })
        ));
        assert!(matches!(
            decode_line("info nodes"),
            Err(DecodeError::MissingValue { keyword: "nodes" })
        ));
        assert!(decode_line("info multipv 0 pv 7g7f").is_err());
        assert!(decode_line("bestmove").is_err());
    }

    #[test]
    fn test_parse_option_name_with_spaces() {
        assert_eq!(
            parse_option_name("name Eval Dir type string default eval"),
            Some("Eval Dir".to_string())
        );
        assert_eq!(parse_option_name("name type spin"), None);
        assert_eq!(parse_option_name("type spin"), None);
    }

    #[test]
    fn test_command_lines() {
        let set = EngineCommand::SetOption {
            name: "MultiPV".to_string(),
            value: Some("3".to_string()),
        };
        assert_eq!(set.to_string(), "setoption name MultiPV value 3");
        assert_eq!(EngineCommand::GoInfinite.to_string(), "go infinite");
        assert_eq!(
            EngineCommand::Position { sfen: "4k4/9/9/9/9/9/9/9/4K4 b - 1".into() }.to_string(),
            "position sfen 4k4/9/9/9/9/9/9/9/4K4 b - 1"
        );
        assert_eq!(EngineCommand::Stop.to_string(), "stop");
    }
}
