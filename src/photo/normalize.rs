//! アップロード画像の圧縮

use super::ImageProcessor;
use crate::error::{ReportError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ImageReader;
use rayon::prelude::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

impl ImageProcessor {
    /// 最大幅に縮小しJPEGで再圧縮する。戻り値は保存ファイル名
    ///
    /// 成否にかかわらず圧縮前のファイルは削除する。
    pub fn normalize(&self, raw_path: &Path) -> Result<String> {
        let result = self.compress(raw_path);

        if let Err(e) = std::fs::remove_file(raw_path) {
            tracing::warn!(file = %raw_path.display(), error = %e, "圧縮前ファイルの削除に失敗");
        }

        result
    }

    /// 複数画像をまとめて圧縮（順序は入力順）
    ///
    /// 1枚でも失敗したら、このバッチで作成したファイルを全て削除してエラーを返す。
    pub fn normalize_batch(&self, raw_paths: &[std::path::PathBuf]) -> Result<Vec<String>> {
        let results: Vec<Result<String>> = raw_paths
            .par_iter()
            .map(|path| self.normalize(path))
            .collect();

        let mut stored = Vec::with_capacity(results.len());
        let mut first_error = None;
        for result in results {
            match result {
                Ok(name) => stored.push(name),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(err) = first_error {
            self.discard(&stored);
            return Err(err);
        }
        Ok(stored)
    }

    fn compress(&self, raw_path: &Path) -> Result<String> {
        let img = ImageReader::open(raw_path)
            .map_err(|e| processing_error(raw_path, e))?
            .with_guessed_format()
            .map_err(|e| processing_error(raw_path, e))?
            .decode()
            .map_err(|e| processing_error(raw_path, e))?;

        let img = if img.width() > self.max_width {
            img.resize(self.max_width, u32::MAX, FilterType::Lanczos3)
        } else {
            img
        };

        let stem = raw_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());
        let stored_name = format!("compressed-{}.jpg", stem);
        let output_path = self.upload_dir.join(&stored_name);

        let file = File::create(&output_path)?;
        let mut writer = BufWriter::new(file);
        let mut encoder = JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality);
        encoder
            .encode_image(&img.to_rgb8())
            .map_err(|e| processing_error(raw_path, e))?;

        tracing::debug!(
            source = %raw_path.display(),
            stored = %stored_name,
            width = img.width(),
            height = img.height(),
            "画像を圧縮"
        );
        Ok(stored_name)
    }
}

fn processing_error(path: &Path, err: impl std::fmt::Display) -> ReportError {
    ReportError::Processing(format!("{}: {}", path.display(), err))
}
