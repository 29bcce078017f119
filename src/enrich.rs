//! 1回分の照合処理
//!
//! カタログ読み込み → 重複排除 → テキスト照合 → 画像照合 → 最終決定 → CSV出力

use crate::catalog;
use crate::config::Config;
use crate::error::{EnrichError, Result};
use crate::fetcher::{ImageHasher, ImageSource};
use crate::pipeline;
use order_enricher_common::types::{
    FINAL_EDITOR, FINAL_TITLE, IMAGE_MATCHED_EDITOR, IMAGE_MATCHED_TITLE, IMAGE_MATCH_SCORE,
    ORDER_IMAGE_URL, ORDER_PRODUCT_NAME, TEXT_MATCHED_EDITOR, TEXT_MATCHED_TITLE, TEXT_MATCH_SCORE,
};
use order_enricher_common::{
    finalize_matches, CatalogEntry, FinalMatch, HashMatcher, ImageRecord, MatchResult, OrderRow,
    PerceptualHash, StringScorer, Table, TextMatch, TextMatcher,
};
use std::collections::HashMap;
use std::path::Path;

/// 注文1件分の照合結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderEnrichment {
    pub image: MatchResult,
    pub text: Option<TextMatch>,
    pub final_match: Option<FinalMatch>,
}

/// 実行結果の集計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichSummary {
    pub catalog_rows: usize,
    pub catalog_kept: usize,
    pub orders: usize,
    pub orders_hashed: usize,
    pub image_matches: usize,
    pub text_matches: usize,
    pub finalized: usize,
}

impl std::fmt::Display for EnrichSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "  カタログ: {}件 → 重複排除後 {}件", self.catalog_rows, self.catalog_kept)?;
        writeln!(f, "  注文: {}件（画像ハッシュ取得 {}件）", self.orders, self.orders_hashed)?;
        writeln!(f, "  画像一致: {}件", self.image_matches)?;
        writeln!(f, "  テキスト一致: {}件", self.text_matches)?;
        write!(f, "  最終決定: {}件", self.finalized)
    }
}

/// テーブルから注文行を取り出す（product_name / product_url_img 列が必須）
pub fn read_orders(table: &Table) -> Result<Vec<OrderRow>> {
    let names = table.column(ORDER_PRODUCT_NAME)?;
    let urls = table.column(ORDER_IMAGE_URL)?;

    Ok(names
        .into_iter()
        .zip(urls)
        .map(|(name, url)| OrderRow {
            product_name: name.to_string(),
            product_url_img: url.to_string(),
        })
        .collect())
}

/// CSVファイルを読み込んで照合し、結果を書き出す
pub fn run<S, T>(
    catalog_path: &Path,
    orders_path: &Path,
    output_path: &Path,
    hasher: &ImageHasher<S>,
    scorer: T,
    config: &Config,
) -> Result<EnrichSummary>
where
    S: ImageSource,
    T: StringScorer,
{
    for path in [catalog_path, orders_path] {
        if !path.exists() {
            return Err(EnrichError::FileNotFound(path.display().to_string()));
        }
    }

    println!("[1/5] CSVを読み込み中...");
    let catalog_table = Table::from_csv(catalog_path)?;
    let orders_table = Table::from_csv(orders_path)?;
    println!(
        "✔ カタログ {}件 / 注文 {}件\n",
        catalog_table.len(),
        orders_table.len()
    );

    let (output, summary) = enrich_tables(&catalog_table, &orders_table, hasher, scorer, config)?;

    println!("[5/5] 結果を保存中...");
    output.write_csv(output_path)?;
    println!("✔ 結果を保存: {}", output_path.display());

    Ok(summary)
}

/// カタログと注文のテーブルから出力テーブルを作る
pub fn enrich_tables<S, T>(
    catalog_table: &Table,
    orders_table: &Table,
    hasher: &ImageHasher<S>,
    scorer: T,
    config: &Config,
) -> Result<(Table, EnrichSummary)>
where
    S: ImageSource,
    T: StringScorer,
{
    // 列の欠落はハッシュ計算前に検出する
    let catalog_rows = catalog::read_catalog(catalog_table)?;
    let orders = read_orders(orders_table)?;

    println!("[2/5] カタログ画像の重複排除中... (範囲: {})", config.dedup_scope);
    let catalog = catalog::dedupe_catalog(&catalog_rows, hasher, config.workers, config.dedup_scope)?;
    println!("✔ {}件 → {}件\n", catalog_rows.len(), catalog.len());

    println!("[3/5] 商品名を照合中...");
    let text_matcher = TextMatcher::new(&catalog, scorer, config.text_similarity_threshold);
    let text_results: Vec<Option<TextMatch>> = orders
        .iter()
        .map(|order| text_matcher.match_name(&order.product_name))
        .collect();
    println!("✔ 商品名照合完了\n");

    println!("[4/5] 注文画像を照合中... (方式: {})", config.match_policy);
    let order_hashes = hash_orders(&orders, hasher, config.workers)?;
    let image_results = match_order_hashes(&order_hashes, &catalog, config);
    println!("✔ 画像照合完了\n");

    let enrichments: Vec<OrderEnrichment> = (0..orders.len())
        .map(|idx| {
            let image = image_results.get(&idx).cloned().unwrap_or_default();
            let text = text_results[idx].clone();
            let final_match = finalize_matches(text.as_ref(), &image);
            OrderEnrichment { image, text, final_match }
        })
        .collect();

    let summary = EnrichSummary {
        catalog_rows: catalog_rows.len(),
        catalog_kept: catalog.len(),
        orders: orders.len(),
        orders_hashed: order_hashes.values().filter(|h| h.is_some()).count(),
        image_matches: enrichments.iter().filter(|e| e.image.is_match()).count(),
        text_matches: enrichments.iter().filter(|e| e.text.is_some()).count(),
        finalized: enrichments.iter().filter(|e| e.final_match.is_some()).count(),
    };

    Ok((build_output(orders_table, &enrichments), summary))
}

fn hash_orders<S: ImageSource>(
    orders: &[OrderRow],
    hasher: &ImageHasher<S>,
    workers: usize,
) -> Result<HashMap<usize, Option<PerceptualHash>>> {
    let items: Vec<ImageRecord<usize>> = orders
        .iter()
        .enumerate()
        .map(|(idx, order)| ImageRecord::new(idx, order.product_url_img.clone()))
        .collect();

    pipeline::hash_all(&items, hasher, workers, "注文画像")
}

fn match_order_hashes(
    order_hashes: &HashMap<usize, Option<PerceptualHash>>,
    catalog: &[CatalogEntry],
    config: &Config,
) -> HashMap<usize, MatchResult> {
    let matcher = HashMatcher::new(catalog, config.hash_diff_threshold, config.match_policy);
    matcher.match_all(order_hashes)
}

fn build_output(orders_table: &Table, enrichments: &[OrderEnrichment]) -> Table {
    let mut output = orders_table.clone();

    let rows = enrichments;
    let values: [(&str, Vec<String>); 8] = [
        (IMAGE_MATCHED_TITLE, column(rows, |e| e.image.matched_title.clone())),
        (IMAGE_MATCHED_EDITOR, column(rows, |e| e.image.matched_editor.clone())),
        (IMAGE_MATCH_SCORE, column(rows, |e| e.image.score.map(format_score))),
        (TEXT_MATCHED_TITLE, column(rows, |e| e.text.as_ref().map(|t| t.title.clone()))),
        (TEXT_MATCHED_EDITOR, column(rows, |e| e.text.as_ref().map(|t| t.editor.clone()))),
        (TEXT_MATCH_SCORE, column(rows, |e| e.text.as_ref().map(|t| format_score(t.score)))),
        (FINAL_TITLE, column(rows, |e| e.final_match.as_ref().map(|m| m.title.clone()))),
        (FINAL_EDITOR, column(rows, |e| e.final_match.as_ref().map(|m| m.editor.clone()))),
    ];

    for (name, column_values) in values {
        output.set_column(name, column_values);
    }

    output
}

/// 空欄は一致なし
fn column<F>(enrichments: &[OrderEnrichment], f: F) -> Vec<String>
where
    F: Fn(&OrderEnrichment) -> Option<String>,
{
    enrichments.iter().map(|e| f(e).unwrap_or_default()).collect()
}

fn format_score(score: f64) -> String {
    format!("{:.4}", score)
}
