//! アップロード受付
//!
//! 拡張子・Content-Typeの検証と、保存用ファイル名の生成。

use crate::error::{ReportError, Result};
use regex::Regex;
use std::path::Path;
use uuid::Uuid;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];
const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/gif"];

/// アップロード欄の種類（欄ごとに枚数上限が異なる）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadField {
    /// 一括登録（最大300枚）
    Bulk,
    /// 欠陥の追加（最大2枚）
    AdHoc,
}

/// 受信済みの画像ファイル
#[derive(Debug, Clone)]
pub struct IncomingImage {
    pub original_name: String,
    pub content_type: String,
    pub source: std::path::PathBuf,
}

impl IncomingImage {
    /// ローカルファイルから作成（Content-Typeは拡張子から推定）
    pub fn from_path(path: &Path) -> Self {
        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            content_type: content_type_for(path).to_string(),
            original_name,
            source: path.to_path_buf(),
        }
    }
}

/// 元ファイル名の英数字とドット以外を `_` に置換
pub fn sanitize_upload_name(name: &str) -> String {
    lazy_static::lazy_static! {
        static ref UNSAFE_RE: Regex = Regex::new(r"[^a-zA-Z0-9.]").unwrap();
    }
    UNSAFE_RE.replace_all(name, "_").into_owned()
}

/// 保存用の一意なファイル名: `{ミリ秒}-{乱数}-{元ファイル名}`
pub fn generate_filename(original_name: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = (Uuid::new_v4().as_u128() % 1_000_000_000) as u64;
    format!("{}-{}-{}", millis, suffix, sanitize_upload_name(original_name))
}

/// 拡張子とContent-Typeの両方が画像形式であること
pub fn validate_upload(original_name: &str, content_type: &str) -> Result<()> {
    let ext = Path::new(original_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let content_type = content_type.trim().to_lowercase();

    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) || !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
        return Err(ReportError::Validation(format!(
            "許可されていないファイル形式です: {} ({})",
            original_name, content_type
        )));
    }
    Ok(())
}

/// バッチ全体を検証（形式と枚数上限）
pub fn validate_batch(images: &[IncomingImage], cap: usize) -> Result<()> {
    if images.len() > cap {
        return Err(ReportError::Validation(format!(
            "アップロード枚数が上限を超えています: {}枚 (上限{}枚)",
            images.len(),
            cap
        )));
    }
    for image in images {
        validate_upload(&image.original_name, &image.content_type)?;
    }
    Ok(())
}

/// 拡張子からContent-Typeを推定
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}
