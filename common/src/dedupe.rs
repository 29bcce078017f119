//! カタログ重複排除
//!
//! エディタ単位でグループ化し（エディタ名の昇順、グループ内は行順）、
//! 既に採用したハッシュと完全一致するアイコンを持つ行を捨てる。
//!
//! 既定の `DedupScope::Global` では採用済みハッシュの集合を1回の実行全体で共有する。
//! 別エディタ同士でも同一アイコンなら先に見た方だけが残る。
//! エディタ内でのみ重複を除きたい場合は `DedupScope::PerEditor` を使う。

use crate::phash::PerceptualHash;
use crate::types::{CatalogEntry, CatalogRow};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// 採用済みハッシュ集合の有効範囲
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupScope {
    /// 実行全体で1つの集合
    #[default]
    Global,
    /// エディタごとに集合をリセット
    PerEditor,
}

impl std::str::FromStr for DedupScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "global" => Ok(DedupScope::Global),
            "per-editor" | "editor" => Ok(DedupScope::PerEditor),
            _ => Err(format!("Unknown dedup scope: {}. Use global or per-editor", s)),
        }
    }
}

impl std::fmt::Display for DedupScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DedupScope::Global => write!(f, "global"),
            DedupScope::PerEditor => write!(f, "per-editor"),
        }
    }
}

/// 計算済みハッシュを使って重複を除く
///
/// `hashes[i]` は `rows[i]` のアイコンのハッシュ。None（取得・デコード失敗）の行は
/// 照合できないため黙って捨てる。結果は元の行順。
pub fn dedupe_entries(
    rows: &[CatalogRow],
    hashes: &[Option<PerceptualHash>],
    scope: DedupScope,
) -> Vec<CatalogEntry> {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, row) in rows.iter().enumerate() {
        groups.entry(row.editor.as_str()).or_default().push(idx);
    }

    let mut seen: HashSet<PerceptualHash> = HashSet::new();
    let mut kept: Vec<(usize, PerceptualHash)> = Vec::new();

    for indices in groups.values() {
        if scope == DedupScope::PerEditor {
            seen.clear();
        }

        for &idx in indices {
            let Some(hash) = hashes.get(idx).copied().flatten() else {
                continue;
            };
            if seen.insert(hash) {
                kept.push((idx, hash));
            }
        }
    }

    kept.sort_by_key(|(idx, _)| *idx);

    kept.into_iter()
        .map(|(idx, hash)| CatalogEntry {
            row: idx,
            title: rows[idx].title.clone(),
            editor: rows[idx].editor.clone(),
            hash,
        })
        .collect()
}
