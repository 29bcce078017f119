use anyhow::Context;
use clap::Parser;
use order_enricher::{cli, config, enrich, fetcher};
use cli::{Cli, Commands};
use config::Config;
use fetcher::{HttpSource, ImageHasher};
use order_enricher_common::PartialRatioScorer;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let config = Config::load().context("設定ファイルの読み込みに失敗")?;

    match cli.command {
        Commands::Run { catalog, orders, output, overrides } => {
            println!("🔎 order-enricher - 注文照合\n");

            let config = overrides.apply(&config);
            config.validate()?;

            let output = output.unwrap_or_else(|| cli::default_output_path(&orders));
            let hasher = ImageHasher::new(
                HttpSource::new(config.timeout())?,
                config.retry_policy(),
                config.image_size,
            );

            let summary = enrich::run(&catalog, &orders, &output, &hasher, PartialRatioScorer, &config)
                .with_context(|| format!("照合処理に失敗: {}", orders.display()))?;

            println!("\n集計:");
            println!("{}", summary);
            println!("\n✅ 照合完了");
        }

        Commands::Hash { urls } => {
            let hasher = ImageHasher::new(
                HttpSource::new(config.timeout())?,
                config.retry_policy(),
                config.image_size,
            );

            for url in &urls {
                match hasher.hash(url) {
                    Some(hash) => println!("{}  {}", hash, url),
                    None => println!("{:16}  {}", "✗", url),
                }
            }
        }

        Commands::Config { show, reset } => {
            let mut config = config;

            if reset {
                config = Config::default();
                config.save()?;
                println!("✔ 設定を初期化しました: {}", Config::config_path()?.display());
            }

            if show || !reset {
                println!("設定:");
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  最大試行回数: {}", config.max_retries);
                println!("  バックオフ係数: {}ms", config.backoff_factor_ms);
                println!("  正規化サイズ: {}px", config.image_size);
                println!("  ハッシュ距離閾値: {}", config.hash_diff_threshold);
                println!("  テキスト類似度閾値: {}", config.text_similarity_threshold);
                println!(
                    "  ワーカー数: {}",
                    if config.workers == 0 { "自動".to_string() } else { config.workers.to_string() }
                );
                println!("  重複排除の範囲: {}", config.dedup_scope);
                println!("  照合方式: {}", config.match_policy);
            }
        }
    }

    Ok(())
}

fn init_logger(verbose: bool) {
    let mut builder = colog::default_builder();
    builder.filter(
        None,
        if verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info },
    );
    builder.init();
}
