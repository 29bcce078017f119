//! 商品名とカタログタイトルのテキスト照合
//!
//! スコアラーは `StringScorer` トレイトで差し替え可能。既定は部分一致比
//! （短い方の文字列を長い方の同じ長さの窓と比較し、最大の正規化レーベンシュタイン類似度）。

use crate::types::{CatalogEntry, TextMatch};
use std::collections::HashMap;

/// 既定のテキスト類似度閾値
pub const DEFAULT_TEXT_SIMILARITY_THRESHOLD: f64 = 0.9;

/// 文字列類似度スコアラー（0.0〜1.0）
pub trait StringScorer {
    fn score(&self, query: &str, candidate: &str) -> f64;

    /// 最高スコアの候補を返す。同点なら先の候補
    fn best_match<'a>(&self, query: &str, candidates: &[&'a str]) -> Option<(&'a str, f64)> {
        let mut best: Option<(&'a str, f64)> = None;
        for &candidate in candidates {
            let score = self.score(query, candidate);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((candidate, score));
            }
        }
        best
    }
}

impl<F> StringScorer for F
where
    F: Fn(&str, &str) -> f64,
{
    fn score(&self, query: &str, candidate: &str) -> f64 {
        self(query, candidate)
    }
}

/// 部分一致比スコアラー
#[derive(Debug, Clone, Copy, Default)]
pub struct PartialRatioScorer;

impl StringScorer for PartialRatioScorer {
    fn score(&self, query: &str, candidate: &str) -> f64 {
        partial_ratio(&normalize_name(query), &normalize_name(candidate))
    }
}

/// 小文字化し、英数字以外を空白にして前後の空白を除く
pub fn normalize_name(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

fn partial_ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (short, long) = if a_chars.len() <= b_chars.len() {
        (a_chars, b_chars)
    } else {
        (b_chars, a_chars)
    };

    if short.is_empty() {
        return 0.0;
    }

    let short: String = short.into_iter().collect();
    let mut best = 0.0_f64;
    for window in long.windows(short.chars().count()) {
        let window: String = window.iter().collect();
        let score = strsim::normalized_levenshtein(&short, &window);
        if score > best {
            best = score;
            if best >= 1.0 {
                break;
            }
        }
    }
    best
}

/// カタログタイトルに対するテキスト照合器
pub struct TextMatcher<S = PartialRatioScorer> {
    scorer: S,
    threshold: f64,
    titles: Vec<String>,
    title_to_editor: HashMap<String, String>,
}

impl<S: StringScorer> TextMatcher<S> {
    /// 同じタイトルが複数ある場合は最後の行のエディタを使う
    pub fn new(catalog: &[CatalogEntry], scorer: S, threshold: f64) -> Self {
        let mut titles = Vec::new();
        let mut title_to_editor = HashMap::new();
        for entry in catalog {
            if title_to_editor
                .insert(entry.title.clone(), entry.editor.clone())
                .is_none()
            {
                titles.push(entry.title.clone());
            }
        }

        Self { scorer, threshold, titles, title_to_editor }
    }

    /// 商品名を照合。閾値未満なら None
    pub fn match_name(&self, product_name: &str) -> Option<TextMatch> {
        let query = product_name.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }

        let candidates: Vec<&str> = self.titles.iter().map(String::as_str).collect();
        let (title, score) = self.scorer.best_match(&query, &candidates)?;
        if score < self.threshold {
            return None;
        }

        let editor = self.title_to_editor.get(title)?;
        Some(TextMatch {
            title: title.to_string(),
            editor: editor.clone(),
            score,
        })
    }
}
