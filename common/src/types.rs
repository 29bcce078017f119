//! 照合処理で共有される型定義
//!
//! - ImageRecord: ハッシュ計算の入力（キー + 画像URL）
//! - CatalogRow / CatalogEntry: カタログ行と、ハッシュ付きで重複排除を通過した行
//! - MatchResult / TextMatch: 画像照合・テキスト照合の結果
//! - FinalMatch: 最終決定（タイトル・エディタ）

use crate::phash::PerceptualHash;

/// カタログCSVの列名
pub const CATALOG_TITLE: &str = "title";
pub const CATALOG_EDITOR: &str = "editor";
pub const CATALOG_ICON: &str = "icon";

/// 注文CSVの列名
pub const ORDER_PRODUCT_NAME: &str = "product_name";
pub const ORDER_IMAGE_URL: &str = "product_url_img";

/// 出力列（この順で注文テーブルに追加される）
pub const IMAGE_MATCHED_TITLE: &str = "image_matched_title";
pub const IMAGE_MATCHED_EDITOR: &str = "image_matched_editor";
pub const IMAGE_MATCH_SCORE: &str = "image_match_score";
pub const TEXT_MATCHED_TITLE: &str = "text_matched_title";
pub const TEXT_MATCHED_EDITOR: &str = "text_matched_editor";
pub const TEXT_MATCH_SCORE: &str = "text_match_score";
pub const FINAL_TITLE: &str = "final_title";
pub const FINAL_EDITOR: &str = "final_editor";

pub const OUTPUT_COLUMNS: [&str; 8] = [
    IMAGE_MATCHED_TITLE,
    IMAGE_MATCHED_EDITOR,
    IMAGE_MATCH_SCORE,
    TEXT_MATCHED_TITLE,
    TEXT_MATCHED_EDITOR,
    TEXT_MATCH_SCORE,
    FINAL_TITLE,
    FINAL_EDITOR,
];

/// ハッシュ計算対象（キーは注文の行番号やカタログ行番号）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord<K> {
    pub key: K,
    pub url: String,
}

impl<K> ImageRecord<K> {
    pub fn new(key: K, url: impl Into<String>) -> Self {
        Self { key, url: url.into() }
    }
}

/// カタログの1行
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogRow {
    pub title: String,
    pub editor: String,
    pub icon: String,
}

/// 重複排除を通過したカタログ行（ハッシュ必須）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// 元のカタログでの行番号
    pub row: usize,
    pub title: String,
    pub editor: String,
    pub hash: PerceptualHash,
}

/// 注文の1行（照合に必要な列のみ）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderRow {
    pub product_name: String,
    pub product_url_img: String,
}

/// 画像照合の結果。フィールドが None なら閾値内の一致なし
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResult {
    pub matched_title: Option<String>,
    pub matched_editor: Option<String>,
    pub score: Option<f64>,
}

impl MatchResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_match(&self) -> bool {
        self.matched_title.is_some()
    }

    /// (タイトル, エディタ) の組
    pub fn pair(&self) -> Option<(&str, &str)> {
        Some((self.matched_title.as_deref()?, self.matched_editor.as_deref()?))
    }
}

/// テキスト照合の結果
#[derive(Debug, Clone, PartialEq)]
pub struct TextMatch {
    pub title: String,
    pub editor: String,
    pub score: f64,
}

/// 最終決定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalMatch {
    pub title: String,
    pub editor: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_result_none() {
        let result = MatchResult::none();
        assert!(!result.is_match());
        assert_eq!(result.pair(), None);
        assert_eq!(result.score, None);
    }

    #[test]
    fn test_match_result_pair() {
        let result = MatchResult {
            matched_title: Some("AppX".into()),
            matched_editor: Some("EditorY".into()),
            score: Some(1.0),
        };
        assert!(result.is_match());
        assert_eq!(result.pair(), Some(("AppX", "EditorY")));
    }
}
