//! 報告書サービス
//!
//! 受付・欠陥記録・設備点検・事後点検の作成・出力をまとめた操作群。
//! ストアは呼び出し側で構築して渡す（`Arc<dyn ReportStore>`）。

use crate::config::Config;
use crate::equipment::{self, FieldTransforms, RawPanels};
use crate::error::{ReportError, Result};
use crate::export::{Artifact, Exporter};
use crate::ledger;
use crate::photo::{upload, ImageProcessor, IncomingImage, UploadField};
use crate::store::{AfterChange, ReportStore};
use inspection_report_common::{
    CustomerPatch, DefectEdit, DefectEntry, DefectId, DraftDefect, NewReport, Report, ReportId,
    ReportKind,
};
use std::collections::HashSet;
use std::sync::Arc;

/// 事後点検の作成・更新内容
#[derive(Debug, Clone, Default)]
pub struct ForkRequest {
    /// 上書きする顧客・物件情報（指定分のみ）
    pub customer: CustomerPatch,
    /// 引き継いだ記録のうち削除するもの
    pub remove: HashSet<DefectId>,
    /// 追加する欠陥
    pub drafts: Vec<DraftDefect>,
    pub uploads: Vec<IncomingImage>,
}

pub struct ReportService {
    store: Arc<dyn ReportStore>,
    images: ImageProcessor,
    exporter: Exporter,
    transforms: FieldTransforms,
    bulk_upload_cap: usize,
    adhoc_upload_cap: usize,
}

impl ReportService {
    pub fn new(config: &Config, store: Arc<dyn ReportStore>) -> Self {
        Self {
            store,
            images: ImageProcessor::from_config(config),
            exporter: Exporter::from_config(config),
            transforms: FieldTransforms::from_config(config),
            bulk_upload_cap: config.bulk_upload_cap,
            adhoc_upload_cap: config.adhoc_upload_cap,
        }
    }

    fn upload_cap(&self, field: UploadField) -> usize {
        match field {
            UploadField::Bulk => self.bulk_upload_cap,
            UploadField::AdHoc => self.adhoc_upload_cap,
        }
    }

    async fn require(&self, kind: ReportKind, id: ReportId) -> Result<Report> {
        self.store
            .find(kind, id)
            .await?
            .ok_or_else(|| ReportError::NotFound(format!("{}/{}", kind.collection(), id)))
    }

    /// 受付: 新しい事前点検報告書を作成
    pub async fn create_report(&self, intake: NewReport) -> Result<ReportId> {
        if intake.customer_name.trim().is_empty() {
            return Err(ReportError::Validation("顧客名は必須です".into()));
        }
        let report = Report::new(intake);
        self.store.insert(ReportKind::Pre, &report).await?;
        tracing::info!(report = %report.id, customer = %report.customer_name, "報告書を作成");
        Ok(report.id)
    }

    pub async fn get_report(&self, id: ReportId, kind: ReportKind) -> Result<Report> {
        self.require(kind, id).await
    }

    /// 事前点検の一覧（新しい順）。顧客名で大文字小文字を区別せず絞り込む
    pub async fn list_reports(&self, search: Option<&str>) -> Result<Vec<Report>> {
        let reports = self.store.list(ReportKind::Pre).await?;
        let needle = search.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());

        Ok(match needle {
            Some(needle) => reports
                .into_iter()
                .filter(|r| r.customer_name.to_lowercase().contains(&needle))
                .collect(),
            None => reports,
        })
    }

    pub async fn update_customer(&self, id: ReportId, kind: ReportKind, patch: &CustomerPatch) -> Result<()> {
        if patch.is_empty() {
            self.require(kind, id).await?;
            return Ok(());
        }
        if matches!(patch.customer_name.as_deref(), Some(name) if name.trim().is_empty()) {
            return Err(ReportError::Validation("顧客名は空にできません".into()));
        }
        self.store.set_customer(kind, id, patch).await?;
        tracing::info!(report = %id, kind = %kind, "顧客情報を更新");
        Ok(())
    }

    /// 受信画像を保存・圧縮し、保存ファイル名を送信順で返す
    async fn ingest(&self, uploads: Vec<IncomingImage>) -> Result<Vec<String>> {
        if uploads.is_empty() {
            return Ok(Vec::new());
        }
        let images = self.images.clone();
        tokio::task::spawn_blocking(move || {
            let mut staged = Vec::with_capacity(uploads.len());
            for incoming in &uploads {
                match images.stage(incoming) {
                    Ok(path) => staged.push(path),
                    Err(e) => {
                        for path in &staged {
                            let _ = std::fs::remove_file(path);
                        }
                        return Err(e);
                    }
                }
            }
            images.normalize_batch(&staged)
        })
        .await
        .map_err(|e| ReportError::Processing(format!("画像処理が異常終了: {}", e)))?
    }

    /// 欠陥記録を追加
    ///
    /// 必須項目が欠けた行は捨てる。画像は採用された行の順に2枚ずつ割り当て、
    /// 余った画像は削除する。
    pub async fn append_defects(
        &self,
        id: ReportId,
        kind: ReportKind,
        drafts: &[DraftDefect],
        uploads: Vec<IncomingImage>,
        field: UploadField,
    ) -> Result<Vec<DefectEntry>> {
        upload::validate_batch(&uploads, self.upload_cap(field))?;
        self.require(kind, id).await?;

        let stored = self.ingest(uploads).await?;
        let appended = ledger::build_entries(drafts, &stored);
        self.images.discard(&appended.unclaimed_images);

        if appended.entries.is_empty() {
            return Ok(Vec::new());
        }

        if let Err(e) = self.store.push_defects(kind, id, &appended.entries).await {
            let claimed: Vec<String> = appended.entries.iter().flat_map(|entry| entry.images.clone()).collect();
            self.images.discard(&claimed);
            return Err(e);
        }

        tracing::info!(
            report = %id,
            kind = %kind,
            entries = appended.entries.len(),
            images = stored.len() - appended.unclaimed_images.len(),
            "欠陥記録を追加"
        );
        Ok(appended.entries)
    }

    /// 欠陥記録を削除（未知のIDは無視）。削除件数を返す
    pub async fn remove_defects(&self, id: ReportId, kind: ReportKind, ids: &HashSet<DefectId>) -> Result<usize> {
        let removed = self.store.pull_defects(kind, id, ids).await?;
        tracing::info!(report = %id, kind = %kind, removed = removed.len(), "欠陥記録を削除");
        Ok(removed.len())
    }

    /// 欠陥記録1件を編集し、所属する報告書IDを返す
    pub async fn edit_defect(&self, kind: ReportKind, entry_id: DefectId, edit: &DefectEdit) -> Result<ReportId> {
        let report_id = self.store.set_defect_fields(kind, entry_id, edit).await?;
        tracing::info!(report = %report_id, entry = %entry_id, "欠陥記録を編集");
        Ok(report_id)
    }

    /// 設備点検の結果を置き換え
    pub async fn set_equipment_panel(&self, id: ReportId, kind: ReportKind, raw: &RawPanels) -> Result<()> {
        let record = equipment::encode(raw, &self.transforms)?;
        self.store.set_equipment(kind, id, record).await?;
        tracing::info!(report = %id, kind = %kind, "設備点検を保存");
        Ok(())
    }

    /// 事後点検を作成、または既存の事後点検を更新
    ///
    /// 初回は事前点検のスナップショット（欠陥記録・設備点検を含む）から作る。
    /// 既存の記録と同じIDまたは同じ内容の欠陥は追加しない。
    pub async fn fork_after_report(&self, id: ReportId, request: ForkRequest) -> Result<Report> {
        upload::validate_batch(&request.uploads, self.bulk_upload_cap)?;
        self.require(ReportKind::Pre, id).await?;

        let stored = self.ingest(request.uploads).await?;
        let appended = ledger::build_entries(&request.drafts, &stored);
        self.images.discard(&appended.unclaimed_images);
        let claimed: Vec<String> = appended.entries.iter().flat_map(|entry| entry.images.clone()).collect();

        // 画像処理の間に事前点検が変わっている可能性があるため読み直す
        let pre = match self.require(ReportKind::Pre, id).await {
            Ok(pre) => pre,
            Err(e) => {
                self.images.discard(&claimed);
                return Err(e);
            }
        };

        let change = AfterChange {
            customer: request.customer,
            remove: request.remove,
            incoming: appended.entries,
        };
        let outcome = match self.store.merge_after(&pre, change).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.images.discard(&claimed);
                return Err(e);
            }
        };

        // 重複として捨てた記録の画像は参照されない
        let orphaned: Vec<String> = outcome.skipped.iter().flat_map(|e| e.images.clone()).collect();
        self.images.discard(&orphaned);

        tracing::info!(
            report = %id,
            created = outcome.created,
            removed = outcome.removed,
            skipped = outcome.skipped.len(),
            entries = outcome.report.visual_inspection.len(),
            "事後点検を保存"
        );
        Ok(outcome.report)
    }

    pub async fn after_report_exists(&self, id: ReportId) -> Result<bool> {
        self.store.exists(ReportKind::After, id).await
    }

    pub async fn render_document(&self, id: ReportId, kind: ReportKind) -> Result<Artifact> {
        let report = self.require(kind, id).await?;
        self.exporter.document(report).await
    }

    pub async fn render_image_bundle(&self, id: ReportId, kind: ReportKind) -> Result<Artifact> {
        let report = self.require(kind, id).await?;
        self.exporter.image_bundle(report).await
    }
}
