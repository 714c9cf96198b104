//! 透かし入り画像のZIP作成

use super::naming::bundle_entry_name;
use crate::error::{ReportError, Result};
use crate::photo::ImageProcessor;
use inspection_report_common::{Report, ReportKind};
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

const BUNDLE_FILE_NAME: &str = "bundle.zip";

/// 通し番号付きの画像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedImage {
    /// 1始まり、欠陥記録をまたいで連番
    pub index: usize,
    pub stored_filename: String,
}

/// 台帳順・記録内の画像順で通し番号を振る
pub fn number_images(report: &Report) -> Vec<NumberedImage> {
    report
        .visual_inspection
        .iter()
        .flat_map(|entry| entry.images.iter())
        .enumerate()
        .map(|(i, name)| NumberedImage {
            index: i + 1,
            stored_filename: name.clone(),
        })
        .collect()
}

/// 全画像に透かしを入れてZIPにまとめ、バイト列を返す
///
/// 作業ファイルは `work_dir` に置く。1枚でも失敗したら全体を中止する。
pub fn build_bundle(
    report: &Report,
    processor: &ImageProcessor,
    work_dir: &Path,
) -> Result<Vec<u8>> {
    let kind = report.kind();
    let numbered = number_images(report);

    let marked: Vec<(usize, PathBuf)> = numbered
        .par_iter()
        .map(|img| {
            processor
                .watermark(&img.stored_filename, img.index, work_dir)
                .map(|path| (img.index, path))
        })
        .collect::<Result<Vec<_>>>()?;

    let zip_path = work_dir.join(BUNDLE_FILE_NAME);
    write_zip(&zip_path, kind, &marked)?;

    tracing::info!(
        report = %report.id,
        kind = %kind,
        images = marked.len(),
        "画像ZIPを作成"
    );
    Ok(std::fs::read(&zip_path)?)
}

fn write_zip(zip_path: &Path, kind: ReportKind, marked: &[(usize, PathBuf)]) -> Result<()> {
    let file = File::create(zip_path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    for (index, path) in marked {
        let bytes = std::fs::read(path)?;
        zip.start_file(bundle_entry_name(kind, *index), options)
            .map_err(|e| ReportError::Processing(format!("ZIP書き込みエラー: {}", e)))?;
        zip.write_all(&bytes)?;
    }

    let mut writer = zip
        .finish()
        .map_err(|e| ReportError::Processing(format!("ZIP書き込みエラー: {}", e)))?;
    writer.flush()?;
    Ok(())
}
