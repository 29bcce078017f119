use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("HTTPクライアント初期化エラー: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("スレッドプール初期化エラー: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] order_enricher_common::Error),
}

pub type Result<T> = std::result::Result<T, EnrichError>;
