//! 住宅点検報告書の作成・出力
//!
//! 受付で作った報告書に欠陥記録（写真付き）と設備点検結果を積み上げ、
//! PDFと透かし入り画像ZIPを都度生成する。

pub mod cli;
pub mod config;
pub mod equipment;
pub mod error;
pub mod export;
pub mod ledger;
pub mod photo;
pub mod scanner;
pub mod service;
pub mod store;
pub mod telemetry;
