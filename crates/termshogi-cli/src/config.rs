//! 設定ファイル（JSON）

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use termshogi_usi::{AnalyzerConfig, EngineConfig, OverflowPolicy};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub engine_path: PathBuf,
    /// setoption で送る (名前, 値)。エンジンが公開していない名前は送らない
    pub engine_options: Vec<(String, String)>,
    #[serde(default)]
    pub engine_args: Vec<String>,
    #[serde(default = "default_info_capacity")]
    pub info_capacity: usize,
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,
    #[serde(default = "default_resume_poll_ms")]
    pub resume_poll_ms: u64,
    /// 検討結果を再描画する最短間隔
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,
}

fn default_info_capacity() -> usize {
    termshogi_usi::config::DEFAULT_INFO_CAPACITY
}

fn default_resume_poll_ms() -> u64 {
    termshogi_usi::config::DEFAULT_RESUME_POLL_INTERVAL.as_millis() as u64
}

fn default_refresh_ms() -> u64 {
    300
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            engine_path: PathBuf::from("/path/to/yaneuraou"),
            engine_options: vec![
                ("Threads".to_string(), "1".to_string()),
                ("MultiPV".to_string(), "3".to_string()),
            ],
            engine_args: Vec::new(),
            info_capacity: default_info_capacity(),
            overflow_policy: OverflowPolicy::default(),
            resume_poll_ms: default_resume_poll_ms(),
            refresh_ms: default_refresh_ms(),
        }
    }
}

impl AppConfig {
    pub fn analyzer_config(&self) -> AnalyzerConfig {
        let mut engine = EngineConfig::new(&self.engine_path);
        engine.args = self.engine_args.clone();
        engine.options = self.engine_options.clone();

        let mut config = AnalyzerConfig::new(engine);
        config.info_capacity = self.info_capacity;
        config.overflow_policy = self.overflow_policy;
        config.resume_poll_interval = Duration::from_millis(self.resume_poll_ms.max(1));
        config
    }

    #[inline]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_ms.max(1))
    }
}

/// `<設定ディレクトリ>/termshogi/config.json`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("termshogi").join("config.json"))
}

/// 読み込む。ファイルがなければ既定値で作成してそれを返す
pub fn load_or_create(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        let config = AppConfig::default();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(&config)?;
        fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
        info!("created default config at {}", path.display());
        return Ok(config);
    }

    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}
