//! エクスポート用の連番透かし

use super::glyph::{render_digits, GlyphMetrics};
use super::ImageProcessor;
use crate::error::{ReportError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, Rgba};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// 白・不透明度60%
const WATERMARK_COLOR: Rgba<u8> = Rgba([255, 255, 255, 153]);
const WATERMARK_JPEG_QUALITY: u8 = 80;

/// 透かし画像のファイル名
pub fn watermarked_name(index: usize, stored_filename: &str) -> String {
    format!("watermarked-{}-{}", index, stored_filename)
}

impl ImageProcessor {
    /// 連番を画像中央に重ねたコピーを `out_dir` に書き出す
    ///
    /// 元画像は変更しない。同じ (ファイル名, 番号) なら同じパスに上書きする。
    pub fn watermark(&self, stored_filename: &str, index: usize, out_dir: &Path) -> Result<PathBuf> {
        let source = self.stored_path(stored_filename);
        if !source.is_file() {
            return Err(ReportError::Processing(format!(
                "画像が見つかりません: {}",
                source.display()
            )));
        }

        let mut img = image::open(&source)
            .map_err(|e| ReportError::Processing(format!("{}: {}", source.display(), e)))?
            .to_rgba8();
        let (width, height) = img.dimensions();

        let metrics = GlyphMetrics::for_height(height / 6);
        let label = render_digits(&index.to_string(), metrics, WATERMARK_COLOR);
        let x = (width as i64 - label.width() as i64) / 2;
        let y = (height as i64 - label.height() as i64) / 2;
        imageops::overlay(&mut img, &label, x, y);

        let output = out_dir.join(watermarked_name(index, stored_filename));
        let file = File::create(&output)?;
        let mut writer = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut writer, WATERMARK_JPEG_QUALITY)
            .encode_image(&image::DynamicImage::ImageRgba8(img).to_rgb8())
            .map_err(|e| ReportError::Processing(format!("{}: {}", output.display(), e)))?;

        tracing::debug!(index, source = %stored_filename, "透かしを追加");
        Ok(output)
    }
}
