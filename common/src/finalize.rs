//! テキスト照合と画像照合の結果を統合して最終決定する
//!
//! 1. 両方が (タイトル, エディタ) で完全一致 → その組
//! 2. テキストのみ → テキスト
//! 3. 画像のみ → 画像
//! 4. 両方あって食い違う、または両方なし → 未決定（調停はしない）

use crate::types::{FinalMatch, MatchResult, TextMatch};

pub fn finalize(text: Option<(&str, &str)>, image: Option<(&str, &str)>) -> Option<FinalMatch> {
    let pick = match (text, image) {
        (Some(t), Some(i)) if t == i => t,
        (Some(t), None) => t,
        (None, Some(i)) => i,
        _ => return None,
    };

    Some(FinalMatch {
        title: pick.0.to_string(),
        editor: pick.1.to_string(),
    })
}

/// 照合結果の型から直接統合する
pub fn finalize_matches(text: Option<&TextMatch>, image: &MatchResult) -> Option<FinalMatch> {
    finalize(
        text.map(|t| (t.title.as_str(), t.editor.as_str())),
        image.pair(),
    )
}
