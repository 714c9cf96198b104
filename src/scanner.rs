//! 写真フォルダの走査（CLIの一括登録用）

use crate::error::{ReportError, Result};
use crate::photo::IncomingImage;
use std::path::Path;
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

/// フォルダ直下の画像をファイル名順で返す
pub fn scan_folder(folder: &Path) -> Result<Vec<IncomingImage>> {
    if !folder.is_dir() {
        return Err(ReportError::NotFound(format!(
            "フォルダが見つかりません: {}",
            folder.display()
        )));
    }

    let mut images: Vec<IncomingImage> = WalkDir::new(folder)
        .max_depth(1) // 直下のみ（再帰しない）
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| is_image_extension(&ext.to_string_lossy()))
                .unwrap_or(false)
        })
        .map(|e| IncomingImage::from_path(e.path()))
        .collect();

    // ファイル名でソート（撮影順 = 欠陥の並び順）
    images.sort_by(|a, b| a.original_name.cmp(&b.original_name));

    Ok(images)
}
