//! 出力生成
//!
//! 報告書からPDF・画像ZIPを都度生成する。出力物は保存せず、
//! 作業ファイルはリクエストごとの一時ディレクトリに置いて必ず削除する。

pub mod bundle;
pub mod layout;
pub mod naming;
pub mod pdf;

pub use naming::{artifact_file_name, sanitize_customer_name, ArtifactKind};

use crate::config::Config;
use crate::error::{ReportError, Result};
use crate::photo::ImageProcessor;
use inspection_report_common::Report;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// ダウンロード用の出力物
#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// 指定ディレクトリに書き出す
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

#[derive(Debug, Clone)]
pub struct Exporter {
    images: ImageProcessor,
    export_dir: PathBuf,
    font_path: Option<PathBuf>,
    max_images: usize,
    timeout: Duration,
}

impl Exporter {
    pub fn from_config(config: &Config) -> Self {
        Self {
            images: ImageProcessor::from_config(config),
            export_dir: config.export_dir.clone(),
            font_path: config.font_path.clone(),
            max_images: config.max_export_images,
            timeout: Duration::from_secs(config.export_timeout_seconds),
        }
    }

    fn check_bounds(&self, report: &Report) -> Result<()> {
        let count = report.image_count();
        if count > self.max_images {
            return Err(ReportError::Validation(format!(
                "画像が多すぎて出力できません: {}枚 (上限{}枚)",
                count, self.max_images
            )));
        }
        Ok(())
    }

    /// PDFを生成
    pub async fn document(&self, report: Report) -> Result<Artifact> {
        self.check_bounds(&report)?;
        let file_name = artifact_file_name(&report.customer_name, report.kind(), ArtifactKind::Document)?;

        let upload_dir = self.images.upload_dir().to_path_buf();
        let font_path = self.font_path.clone();
        let report_id = report.id;
        let task = tokio::task::spawn_blocking(move || {
            let plan = layout::plan(&report);
            let bytes = pdf::render_pdf(&report, &plan, &upload_dir, font_path.as_deref())?;
            Ok::<_, ReportError>((bytes, plan.page_count()))
        });

        let (bytes, pages) = self.run(task).await?;
        tracing::info!(report = %report_id, pages, file = %file_name, "PDFを生成");
        Ok(Artifact {
            file_name,
            content_type: ArtifactKind::Document.content_type(),
            bytes,
        })
    }

    /// 透かし入り画像ZIPを生成
    pub async fn image_bundle(&self, report: Report) -> Result<Artifact> {
        self.check_bounds(&report)?;
        let file_name = artifact_file_name(&report.customer_name, report.kind(), ArtifactKind::ImageBundle)?;

        std::fs::create_dir_all(&self.export_dir)?;
        let work_dir = tempfile::Builder::new()
            .prefix("bundle-")
            .tempdir_in(&self.export_dir)?;
        let images = self.images.clone();
        let task = tokio::task::spawn_blocking(move || {
            // work_dir はタスク終了時に削除される
            bundle::build_bundle(&report, &images, work_dir.path())
        });

        let bytes = self.run(task).await?;
        Ok(Artifact {
            file_name,
            content_type: ArtifactKind::ImageBundle.content_type(),
            bytes,
        })
    }

    async fn run<T>(&self, task: tokio::task::JoinHandle<Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(ReportError::Render(format!("出力処理が異常終了: {}", join_err))),
            Err(_) => Err(ReportError::Render(format!(
                "出力がタイムアウトしました ({}秒)",
                self.timeout.as_secs()
            ))),
        }
    }
}
