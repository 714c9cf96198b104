//! 画像処理モジュール
//!
//! - アップロード画像の受付（形式検証・一意なファイル名での保存）
//! - 圧縮（最大幅1024px・JPEG品質50、元ファイルは削除）
//! - エクスポート用の連番透かし（元画像は変更しない）
//!
//! すべてアップロードディレクトリへのファイル書き込みで完結し、
//! メモリ上のキャッシュは持たない。

mod glyph;
mod normalize;
pub mod upload;
mod watermark;

pub use upload::{IncomingImage, UploadField};

use crate::config::Config;
use crate::error::{ReportError, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ImageProcessor {
    upload_dir: PathBuf,
    max_width: u32,
    jpeg_quality: u8,
}

impl ImageProcessor {
    pub fn new(upload_dir: impl Into<PathBuf>, max_width: u32, jpeg_quality: u8) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            max_width,
            jpeg_quality,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.upload_dir, config.max_image_width, config.jpeg_quality)
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// 保存済みファイル名からパスを解決
    pub fn stored_path(&self, stored_filename: &str) -> PathBuf {
        self.upload_dir.join(stored_filename)
    }

    /// 受信画像を検証してアップロードディレクトリへコピー
    pub fn stage(&self, image: &IncomingImage) -> Result<PathBuf> {
        upload::validate_upload(&image.original_name, &image.content_type)?;
        std::fs::create_dir_all(&self.upload_dir)?;

        let target = self.upload_dir.join(upload::generate_filename(&image.original_name));
        std::fs::copy(&image.source, &target).map_err(|e| {
            ReportError::Processing(format!(
                "アップロード画像の保存に失敗: {}: {}",
                image.source.display(),
                e
            ))
        })?;
        Ok(target)
    }

    /// 保存済みファイルを削除（存在しなければ何もしない）
    pub fn discard(&self, stored_filenames: &[String]) {
        for name in stored_filenames {
            let path = self.stored_path(name);
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(file = %path.display(), error = %e, "画像の削除に失敗");
                }
            }
        }
    }
}
