//! 注文データにアプリ名・エディタを付与する
//!
//! 商品アイコンの知覚ハッシュと商品名のあいまい一致の2つの手掛かりで、
//! 注文をアプリカタログと照合する。

pub mod catalog;
pub mod cli;
pub mod config;
pub mod enrich;
pub mod error;
pub mod fetcher;
pub mod hasher;
pub mod pipeline;
