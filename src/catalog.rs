//! カタログの読み込みと重複排除

use crate::error::Result;
use crate::fetcher::{ImageHasher, ImageSource};
use crate::pipeline;
use order_enricher_common::types::{CATALOG_EDITOR, CATALOG_ICON, CATALOG_TITLE};
use order_enricher_common::{dedupe_entries, CatalogEntry, CatalogRow, DedupScope, ImageRecord, PerceptualHash, Table};

/// テーブルからカタログ行を取り出す（title / editor / icon 列が必須）
pub fn read_catalog(table: &Table) -> Result<Vec<CatalogRow>> {
    let titles = table.column(CATALOG_TITLE)?;
    let editors = table.column(CATALOG_EDITOR)?;
    let icons = table.column(CATALOG_ICON)?;

    let rows = titles
        .into_iter()
        .zip(editors)
        .zip(icons)
        .map(|((title, editor), icon)| CatalogRow {
            title: title.to_string(),
            editor: editor.to_string(),
            icon: icon.to_string(),
        })
        .collect();

    Ok(rows)
}

/// アイコンのハッシュを並列計算し、重複・取得失敗の行を除く
pub fn dedupe_catalog<S: ImageSource>(
    rows: &[CatalogRow],
    hasher: &ImageHasher<S>,
    workers: usize,
    scope: DedupScope,
) -> Result<Vec<CatalogEntry>> {
    let items: Vec<ImageRecord<usize>> = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| ImageRecord::new(idx, row.icon.clone()))
        .collect();

    let hashes = pipeline::hash_all(&items, hasher, workers, "カタログ画像")?;
    let hashes: Vec<Option<PerceptualHash>> = (0..rows.len())
        .map(|idx| hashes.get(&idx).copied().flatten())
        .collect();

    Ok(dedupe_entries(rows, &hashes, scope))
}
