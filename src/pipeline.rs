//! 並列ハッシュ計算
//!
//! 上限付きのrayonスレッドプールで (キー, URL) の組を並列に処理する。
//! 各アイテムの失敗は他に影響せず、結果マップには全キーが必ず1回ずつ入る
//! （失敗したキーは None）。完了順は保証しない。

use crate::error::Result;
use crate::fetcher::{ImageHasher, ImageSource};
use indicatif::{ProgressBar, ProgressStyle};
use order_enricher_common::{ImageRecord, PerceptualHash};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::collections::HashMap;
use std::hash::Hash;
use std::thread::available_parallelism;

/// ワーカー数の上限（0指定時の自動決定に使う）
const MAX_AUTO_WORKERS: usize = 32;

/// 0 のときは CPU数 + 4（最大32）。通信待ちが主なのでCPU数より多めに取る
pub fn effective_workers(workers: usize) -> usize {
    if workers > 0 {
        return workers;
    }
    available_parallelism()
        .map(|n| (n.get() + 4).min(MAX_AUTO_WORKERS))
        .unwrap_or(4)
}

/// 全アイテムのハッシュを並列計算
pub fn hash_all<K, S>(
    items: &[ImageRecord<K>],
    hasher: &ImageHasher<S>,
    workers: usize,
    label: &str,
) -> Result<HashMap<K, Option<PerceptualHash>>>
where
    K: Eq + Hash + Clone + Send + Sync,
    S: ImageSource,
{
    let pool = ThreadPoolBuilder::new()
        .num_threads(effective_workers(workers))
        .thread_name(|idx| format!("image-hash-{idx}"))
        .build()?;

    let pb = ProgressBar::new(items.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message(label.to_string());

    let results: HashMap<K, Option<PerceptualHash>> = pool.install(|| {
        items
            .par_iter()
            .map(|item| {
                let hash = hasher.hash(&item.url);
                pb.inc(1);
                (item.key.clone(), hash)
            })
            .collect()
    });

    pb.finish_and_clear();

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{RetryPolicy, TransportError};
    use crate::hasher::test_images::png;
    use std::time::Duration;

    /// URLの末尾で挙動を切り替えるスタブ
    struct UrlSource;

    impl ImageSource for UrlSource {
        fn get(&self, url: &str) -> std::result::Result<Vec<u8>, TransportError> {
            if url.ends_with("down") {
                Err(TransportError::Connect("refused".into()))
            } else if url.ends_with("corrupt") {
                Ok(b"garbage".to_vec())
            } else {
                let seed: u32 = url.rsplit('/').next().and_then(|s| s.parse().ok()).unwrap_or(1);
                Ok(png(24, 24, seed))
            }
        }
    }

    fn hasher() -> ImageHasher<UrlSource> {
        ImageHasher::new(
            UrlSource,
            RetryPolicy { max_retries: 2, backoff_factor: Duration::ZERO },
            100,
        )
    }

    #[test]
    fn test_every_key_present_despite_failures() {
        let items: Vec<ImageRecord<usize>> = (0..30)
            .map(|i| {
                let url = match i % 3 {
                    0 => format!("http://img/{}", i),
                    1 => format!("http://img/{}/down", i),
                    _ => format!("http://img/{}/corrupt", i),
                };
                ImageRecord::new(i, url)
            })
            .collect();

        let results = hash_all(&items, &hasher(), 4, "test").unwrap();
        assert_eq!(results.len(), 30);
        for i in 0..30 {
            assert_eq!(results[&i].is_some(), i % 3 == 0, "key {}", i);
        }
    }

    #[test]
    fn test_same_url_same_hash() {
        let items = vec![
            ImageRecord::new("a".to_string(), "http://img/7"),
            ImageRecord::new("b".to_string(), "http://other-host/7"),
        ];
        let results = hash_all(&items, &hasher(), 2, "test").unwrap();
        assert_eq!(results["a"], results["b"]);
        assert!(results["a"].is_some());
    }

    #[test]
    fn test_empty_input() {
        let items: Vec<ImageRecord<usize>> = Vec::new();
        let results = hash_all(&items, &hasher(), 0, "test").unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_effective_workers() {
        assert_eq!(effective_workers(3), 3);
        let auto = effective_workers(0);
        assert!(auto >= 1 && auto <= MAX_AUTO_WORKERS);
    }
}
