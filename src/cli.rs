use crate::config::Config;
use clap::{Parser, Subcommand};
use order_enricher_common::{DedupScope, MatchPolicy};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "order-enricher")]
#[command(about = "注文データにアプリ名・エディタを付与（アイコン画像照合 + 商品名照合）", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// カタログと注文を照合して結果CSVを出力
    Run {
        /// カタログCSV（title, editor, icon 列）
        #[arg(required = true)]
        catalog: PathBuf,

        /// 注文CSV（product_name, product_url_img 列）
        #[arg(required = true)]
        orders: PathBuf,

        /// 出力CSV（デフォルト: 注文CSVと同じフォルダの enriched_orders.csv）
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        overrides: RunOverrides,
    },

    /// 画像URLの知覚ハッシュを表示
    Hash {
        /// 画像URL（複数可）
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// 設定を表示/初期化
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// 設定をデフォルトに戻して保存
        #[arg(long)]
        reset: bool,
    },
}

/// 1回の実行だけ設定ファイルの値を上書きする
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RunOverrides {
    /// ハッシュ距離の閾値（この値未満で一致）
    #[arg(long)]
    pub threshold: Option<u32>,

    /// テキスト類似度の閾値（0.0-1.0）
    #[arg(long)]
    pub text_threshold: Option<f64>,

    /// 画像照合の方式 (best/first)
    #[arg(long)]
    pub policy: Option<MatchPolicy>,

    /// 重複排除の範囲 (global/per-editor)
    #[arg(long)]
    pub dedup_scope: Option<DedupScope>,

    /// 並列ワーカー数（0 = 自動）
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// 画像取得の最大試行回数
    #[arg(long)]
    pub retries: Option<u32>,

    /// 画像取得のタイムアウト（秒）
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl RunOverrides {
    pub fn apply(&self, config: &Config) -> Config {
        let mut config = config.clone();
        if let Some(v) = self.threshold {
            config.hash_diff_threshold = v;
        }
        if let Some(v) = self.text_threshold {
            config.text_similarity_threshold = v;
        }
        if let Some(v) = self.policy {
            config.match_policy = v;
        }
        if let Some(v) = self.dedup_scope {
            config.dedup_scope = v;
        }
        if let Some(v) = self.workers {
            config.workers = v;
        }
        if let Some(v) = self.retries {
            config.max_retries = v;
        }
        if let Some(v) = self.timeout {
            config.timeout_seconds = v;
        }
        config
    }
}

/// 出力先のデフォルト
pub fn default_output_path(orders: &Path) -> PathBuf {
    orders
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("enriched_orders.csv")
}
