use crate::error::{EnrichError, Result};
use crate::fetcher::RetryPolicy;
use order_enricher_common::{
    DedupScope, MatchPolicy, DEFAULT_HASH_DIFF_THRESHOLD, DEFAULT_TEXT_SIMILARITY_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 画像取得1回あたりのタイムアウト
    pub timeout_seconds: u64,
    /// 取得の最大試行回数
    pub max_retries: u32,
    /// バックオフ係数（待ち時間 = 係数 * 2^試行番号）
    pub backoff_factor_ms: u64,
    /// ハッシュ前に縮小する一辺のピクセル数
    pub image_size: u32,
    pub hash_diff_threshold: u32,
    pub text_similarity_threshold: f64,
    /// 並列取得のワーカー数（0 = CPU数）
    pub workers: usize,
    pub dedup_scope: DedupScope,
    pub match_policy: MatchPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_seconds: 5,
            max_retries: 3,
            backoff_factor_ms: 1000,
            image_size: 100,
            hash_diff_threshold: DEFAULT_HASH_DIFF_THRESHOLD,
            text_similarity_threshold: DEFAULT_TEXT_SIMILARITY_THRESHOLD,
            workers: 0,
            dedup_scope: DedupScope::Global,
            match_policy: MatchPolicy::BestOfAll,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| EnrichError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("order-enricher").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(EnrichError::Config("max_retries は1以上にしてください".into()));
        }
        if self.image_size == 0 {
            return Err(EnrichError::Config("image_size は1以上にしてください".into()));
        }
        if !(0.0..=1.0).contains(&self.text_similarity_threshold) {
            return Err(EnrichError::Config(format!(
                "text_similarity_threshold は0.0〜1.0で指定してください: {}",
                self.text_similarity_threshold
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_factor: Duration::from_millis(self.backoff_factor_ms),
        }
    }
}
