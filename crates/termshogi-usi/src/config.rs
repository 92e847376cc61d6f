//! エンジンと検討の設定

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// info チャネルの既定容量
pub const DEFAULT_INFO_CAPACITY: usize = 128;
/// 待機中になるのを確認する既定の間隔
pub const DEFAULT_RESUME_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// エンジンプロセス起動時の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub path: PathBuf,
    pub args: Vec<String>,
    /// ハンドシェイク後に送る (名前, 値)。順序どおりに送る。
    pub options: Vec<(String, String)>,
}

impl EngineConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        EngineConfig {
            path: path.into(),
            args: Vec::new(),
            options: Vec::new(),
        }
    }
}

/// info チャネルが満杯のときの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// reader を待たせる（イベントは失われない）
    #[default]
    Block,
    /// 最も古いイベントを捨てて空きを作る
    DropOldest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerConfig {
    pub engine: EngineConfig,
    pub info_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    pub resume_poll_interval: Duration,
}

impl AnalyzerConfig {
    pub fn new(engine: EngineConfig) -> Self {
        AnalyzerConfig {
            engine,
            info_capacity: DEFAULT_INFO_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
            resume_poll_interval: DEFAULT_RESUME_POLL_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_policy_names() {
        let policy: OverflowPolicy = serde_json::from_str("\"drop_oldest\"").unwrap();
        assert_eq!(policy, OverflowPolicy::DropOldest);
        assert_eq!(serde_json::to_string(&OverflowPolicy::Block).unwrap(), "\"block\"");
        assert!(serde_json::from_str::<OverflowPolicy>("\"drop_newest\"").is_err());
    }

    #[test]
    fn test_analyzer_defaults() {
        let config = AnalyzerConfig::new(EngineConfig::new("/usr/bin/engine"));
        assert_eq!(config.info_capacity, 128);
        assert_eq!(config.resume_poll_interval, Duration::from_millis(100));
        assert_eq!(config.overflow_policy, OverflowPolicy::Block);
    }
}
