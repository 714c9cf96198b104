//! 出力ファイル名

use crate::error::{ReportError, Result};
use inspection_report_common::ReportKind;
use regex::Regex;

/// 出力物の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Document,
    ImageBundle,
}

impl ArtifactKind {
    pub fn content_type(&self) -> &'static str {
        match self {
            ArtifactKind::Document => "application/pdf",
            ArtifactKind::ImageBundle => "application/zip",
        }
    }
}

/// 顧客名の英数字・ハングル以外を `_` に置換
pub fn sanitize_customer_name(name: &str) -> String {
    lazy_static::lazy_static! {
        static ref UNSAFE_RE: Regex = Regex::new(r"[^a-zA-Z0-9가-힣]").unwrap();
    }
    UNSAFE_RE.replace_all(name.trim(), "_").into_owned()
}

/// `{顧客名}_{pre|post}-inspection-{report.pdf|images.zip}`
///
/// 顧客名が空（または記号のみ）の場合は出力できない。
pub fn artifact_file_name(customer_name: &str, kind: ReportKind, artifact: ArtifactKind) -> Result<String> {
    let sanitized = sanitize_customer_name(customer_name);
    if sanitized.trim_matches('_').is_empty() {
        return Err(ReportError::Render(format!(
            "顧客名からファイル名を作れません: {:?}",
            customer_name
        )));
    }

    let suffix = match artifact {
        ArtifactKind::Document => "inspection-report.pdf",
        ArtifactKind::ImageBundle => "inspection-images.zip",
    };
    Ok(format!("{}_{}-{}", sanitized, kind.file_tag(), suffix))
}

/// ZIP内の画像エントリ名（通し番号は1始まり）
pub fn bundle_entry_name(kind: ReportKind, index: usize) -> String {
    match kind {
        ReportKind::Pre => format!("image-{}.jpg", index),
        ReportKind::After => format!("after-image-{}.jpg", index),
    }
}
