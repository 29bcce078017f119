//! 画像取得 + ハッシュ計算（リトライ付き）
//!
//! 1回の試行は `Attempt` のいずれかになる:
//! - Success: デコード・ハッシュ計算まで成功
//! - TransportFail: タイムアウト・接続失敗・2xx以外 → バックオフ後に再試行
//! - DecodeFail: 取得できたが画像として読めない → 再試行しても変わらないので打ち切り
//!
//! 失敗は呼び出し側にエラーとして返さず、警告ログを出して None にする。

mod http;

pub use http::HttpSource;

use crate::hasher;
use log::{debug, warn};
use order_enricher_common::PerceptualHash;
use std::time::Duration;
use thiserror::Error;

/// 通信レベルの失敗（再試行対象）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Other(String),
}

/// 画像バイト列の取得元（HTTP、テスト用スタブなど）
pub trait ImageSource: Send + Sync {
    fn get(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}

/// リトライ方針
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大試行回数（初回を含む）
    pub max_retries: u32,
    /// 待ち時間 = backoff_factor * 2^attempt
    pub backoff_factor: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// `attempt` 回目（0始まり）が失敗した後の待ち時間
    pub fn delay(&self, attempt: u32) -> Duration {
        let multiplier = 1u32 << attempt.min(20);
        self.backoff_factor
            .checked_mul(multiplier)
            .unwrap_or(Duration::MAX)
    }
}

/// 1回の試行結果
#[derive(Debug)]
pub enum Attempt {
    Success(PerceptualHash),
    TransportFail(TransportError),
    DecodeFail(image::ImageError),
}

/// URLから画像を取得して知覚ハッシュを計算する
pub struct ImageHasher<S> {
    source: S,
    policy: RetryPolicy,
    image_size: u32,
}

impl<S: ImageSource> ImageHasher<S> {
    pub fn new(source: S, policy: RetryPolicy, image_size: u32) -> Self {
        Self { source, policy, image_size }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// 1回だけ取得・デコード・ハッシュ計算を試みる
    pub fn attempt(&self, url: &str) -> Attempt {
        let bytes = match self.source.get(url) {
            Ok(bytes) => bytes,
            Err(e) => return Attempt::TransportFail(e),
        };

        match hasher::hash_bytes(&bytes, self.image_size) {
            Ok(hash) => Attempt::Success(hash),
            Err(e) => Attempt::DecodeFail(e),
        }
    }

    /// リトライ込みでハッシュを計算。失敗時は None
    pub fn hash(&self, url: &str) -> Option<PerceptualHash> {
        let url = url.trim();
        if url.is_empty() {
            debug!("Empty image URL, skipping");
            return None;
        }

        let max = self.policy.max_retries;
        for attempt in 0..max {
            match self.attempt(url) {
                Attempt::Success(hash) => return Some(hash),
                Attempt::DecodeFail(e) => {
                    warn!("Cannot decode image from {}: {}", url, e);
                    return None;
                }
                Attempt::TransportFail(e) if attempt + 1 < max => {
                    let delay = self.policy.delay(attempt);
                    warn!(
                        "Error fetching image from {} (attempt {}/{}): {}, retrying in {:?}",
                        url,
                        attempt + 1,
                        max,
                        e,
                        delay
                    );
                    std::thread::sleep(delay);
                }
                Attempt::TransportFail(e) => {
                    warn!("Error fetching image from {} (attempt {}/{}): {}", url, attempt + 1, max, e);
                }
            }
        }

        warn!("Failed to process image from {} after {} attempts", url, max);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::test_images::png;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// 台本どおりに応答するスタブ
    struct ScriptedSource {
        responses: Mutex<Vec<Result<Vec<u8>, TransportError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(mut responses: Vec<Result<Vec<u8>, TransportError>>) -> Self {
            responses.reverse();
            Self { responses: Mutex::new(responses), calls: AtomicUsize::new(0) }
        }
    }

    impl ImageSource for ScriptedSource {
        fn get(&self, _url: &str) -> Result<Vec<u8>, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(TransportError::Other("script exhausted".into())))
        }
    }

    fn no_wait(max_retries: u32) -> RetryPolicy {
        RetryPolicy { max_retries, backoff_factor: Duration::ZERO }
    }

    #[test]
    fn test_delay_is_exponential() {
        let policy = RetryPolicy { max_retries: 3, backoff_factor: Duration::from_millis(100) };
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_saturates() {
        let policy = RetryPolicy { max_retries: 3, backoff_factor: Duration::MAX };
        assert_eq!(policy.delay(5), Duration::MAX);
    }

    #[test]
    fn test_success_first_try() {
        let source = ScriptedSource::new(vec![Ok(png(32, 32, 1))]);
        let hasher = ImageHasher::new(source, no_wait(3), 100);
        assert!(hasher.hash("http://img/1.png").is_some());
        assert_eq!(hasher.source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transport_failure_then_success() {
        let source = ScriptedSource::new(vec![
            Err(TransportError::Timeout("5s".into())),
            Err(TransportError::Status(503)),
            Ok(png(32, 32, 1)),
        ]);
        let hasher = ImageHasher::new(source, no_wait(3), 100);
        assert!(hasher.hash("http://img/1.png").is_some());
        assert_eq!(hasher.source.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_retries_exhausted_returns_none() {
        let source = ScriptedSource::new(vec![
            Err(TransportError::Connect("refused".into())),
            Err(TransportError::Connect("refused".into())),
            Err(TransportError::Connect("refused".into())),
            Ok(png(32, 32, 1)),
        ]);
        let hasher = ImageHasher::new(source, no_wait(3), 100);
        assert_eq!(hasher.hash("http://img/1.png"), None);
        assert_eq!(hasher.source.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_decode_failure_is_not_retried() {
        let source = ScriptedSource::new(vec![
            Ok(b"<html>not found</html>".to_vec()),
            Ok(png(32, 32, 1)),
        ]);
        let hasher = ImageHasher::new(source, no_wait(3), 100);
        assert_eq!(hasher.hash("http://img/1.png"), None);
        assert_eq!(hasher.source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_waits_between_attempts_only() {
        let source = ScriptedSource::new(vec![
            Err(TransportError::Connect("refused".into())),
            Err(TransportError::Connect("refused".into())),
            Err(TransportError::Connect("refused".into())),
        ]);
        let policy = RetryPolicy { max_retries: 3, backoff_factor: Duration::from_millis(20) };
        let hasher = ImageHasher::new(source, policy, 100);

        let started = std::time::Instant::now();
        assert_eq!(hasher.hash("http://img/1.png"), None);
        let elapsed = started.elapsed();

        // 20ms + 40ms。最後の試行の後には待たない
        assert!(elapsed >= Duration::from_millis(60), "elapsed: {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(140), "elapsed: {:?}", elapsed);
        assert_eq!(hasher.source.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_zero_sized_image_is_not_retried() {
        let source = ScriptedSource::new(vec![Ok(b"P5 0 0 255\n".to_vec()), Ok(png(32, 32, 1))]);
        let hasher = ImageHasher::new(source, no_wait(3), 100);
        assert_eq!(hasher.hash("http://img/1.png"), None);
        assert_eq!(hasher.source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_url_is_skipped() {
        let source = ScriptedSource::new(vec![Ok(png(32, 32, 1))]);
        let hasher = ImageHasher::new(source, no_wait(3), 100);
        assert_eq!(hasher.hash("  "), None);
        assert_eq!(hasher.source.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_attempt_classification() {
        let source = ScriptedSource::new(vec![
            Err(TransportError::Status(404)),
            Ok(vec![0, 1, 2, 3]),
            Ok(png(16, 16, 2)),
        ]);
        let hasher = ImageHasher::new(source, no_wait(1), 100);
        assert!(matches!(hasher.attempt("u"), Attempt::TransportFail(TransportError::Status(404))));
        assert!(matches!(hasher.attempt("u"), Attempt::DecodeFail(_)));
        assert!(matches!(hasher.attempt("u"), Attempt::Success(_)));
    }
}
