//! Order Enricher Common Library
//!
//! 注文データとアプリカタログの照合ロジック（ネットワーク・画像処理を含まない部分）

pub mod error;
pub mod phash;
pub mod table;
pub mod types;
pub mod dedupe;
pub mod matcher;
pub mod text;
pub mod finalize;

pub use error::{Error, Result};
pub use phash::PerceptualHash;
pub use table::Table;
pub use types::{CatalogEntry, CatalogRow, FinalMatch, ImageRecord, MatchResult, OrderRow, TextMatch};
pub use dedupe::{dedupe_entries, DedupScope};
pub use matcher::{similarity_score, HashMatcher, MatchPolicy, DEFAULT_HASH_DIFF_THRESHOLD};
pub use text::{PartialRatioScorer, StringScorer, TextMatcher, DEFAULT_TEXT_SIMILARITY_THRESHOLD};
pub use finalize::{finalize, finalize_matches};
