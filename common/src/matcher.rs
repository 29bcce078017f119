//! ハッシュ照合
//!
//! 重複排除済みカタログから (ハッシュ, タイトル, エディタ) の一覧を1度だけ作り、
//! 注文ごとに閾値未満の距離を持つカタログ行を探す。

use crate::phash::PerceptualHash;
use crate::types::{CatalogEntry, MatchResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

/// 既定のハッシュ距離閾値（この値未満で一致）
pub const DEFAULT_HASH_DIFF_THRESHOLD: u32 = 5;

/// 候補の選び方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// 全件走査して最小距離を採用（距離0で打ち切り）。同距離なら先の行
    #[default]
    BestOfAll,
    /// 閾値未満の最初の候補で打ち切り。カタログ順に依存する
    FirstBelowThreshold,
}

impl std::str::FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "best" | "best-of-all" => Ok(MatchPolicy::BestOfAll),
            "first" | "first-below-threshold" => Ok(MatchPolicy::FirstBelowThreshold),
            _ => Err(format!("Unknown match policy: {}. Use best or first", s)),
        }
    }
}

impl std::fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchPolicy::BestOfAll => write!(f, "best"),
            MatchPolicy::FirstBelowThreshold => write!(f, "first"),
        }
    }
}

#[derive(Debug, Clone)]
struct LookupEntry {
    hash: PerceptualHash,
    title: String,
    editor: String,
}

/// カタログハッシュの照合器
#[derive(Debug, Clone)]
pub struct HashMatcher {
    lookup: Vec<LookupEntry>,
    threshold: u32,
    policy: MatchPolicy,
}

impl HashMatcher {
    pub fn new(catalog: &[CatalogEntry], threshold: u32, policy: MatchPolicy) -> Self {
        let lookup = catalog
            .iter()
            .map(|e| LookupEntry {
                hash: e.hash,
                title: e.title.clone(),
                editor: e.editor.clone(),
            })
            .collect();

        Self { lookup, threshold, policy }
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// 1件照合。クエリハッシュが None なら空の結果
    pub fn match_hash(&self, query: Option<&PerceptualHash>) -> MatchResult {
        let Some(query) = query else {
            return MatchResult::none();
        };

        let found = match self.policy {
            MatchPolicy::BestOfAll => self.best_of_all(query),
            MatchPolicy::FirstBelowThreshold => self.first_below_threshold(query),
        };

        match found {
            Some((entry, distance)) => MatchResult {
                matched_title: Some(entry.title.clone()),
                matched_editor: Some(entry.editor.clone()),
                score: Some(similarity_score(distance, query.bit_len())),
            },
            None => MatchResult::none(),
        }
    }

    /// 全件照合
    pub fn match_all<K>(&self, queries: &HashMap<K, Option<PerceptualHash>>) -> HashMap<K, MatchResult>
    where
        K: Eq + Hash + Clone,
    {
        queries
            .iter()
            .map(|(key, hash)| (key.clone(), self.match_hash(hash.as_ref())))
            .collect()
    }

    fn best_of_all(&self, query: &PerceptualHash) -> Option<(&LookupEntry, u32)> {
        let mut best: Option<(&LookupEntry, u32)> = None;

        for entry in &self.lookup {
            let distance = query.distance(&entry.hash);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((entry, distance));
            }
            if distance == 0 {
                break;
            }
        }

        best.filter(|(_, d)| *d < self.threshold)
    }

    fn first_below_threshold(&self, query: &PerceptualHash) -> Option<(&LookupEntry, u32)> {
        self.lookup
            .iter()
            .map(|entry| (entry, query.distance(&entry.hash)))
            .find(|(_, d)| *d < self.threshold)
    }
}

/// 類似度スコア `1 - distance / bit_len`（[0, 1] にクランプ）
pub fn similarity_score(distance: u32, bit_len: u32) -> f64 {
    if bit_len == 0 {
        return 0.0;
    }
    (1.0 - f64::from(distance) / f64::from(bit_len)).clamp(0.0, 1.0)
}
