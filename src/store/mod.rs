//! 報告書ストア
//!
//! 事前点検（`reports`）と事後点検（`after-reports`）の2コレクションを持つ
//! ドキュメントストア。配列の追加・削除や項目の更新は1ドキュメント単位で
//! 不可分に行う（後勝ち）。
//!
//! - `JsonFileStore`: コレクションごとのJSONファイル
//! - `MemoryStore`: テスト用

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::{ReportError, Result};
use async_trait::async_trait;
use chrono::Utc;
use inspection_report_common::{
    CustomerPatch, DefectEdit, DefectEntry, DefectId, EquipmentPanelRecord, Report, ReportId,
    ReportKind,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[async_trait]
pub trait ReportStore: Send + Sync {
    /// 新規ドキュメントを追加（同じIDが既にあればエラー）
    async fn insert(&self, kind: ReportKind, report: &Report) -> Result<()>;

    async fn find(&self, kind: ReportKind, id: ReportId) -> Result<Option<Report>>;

    async fn exists(&self, kind: ReportKind, id: ReportId) -> Result<bool>;

    /// 全件（作成日時の新しい順）
    async fn list(&self, kind: ReportKind) -> Result<Vec<Report>>;

    async fn push_defects(&self, kind: ReportKind, id: ReportId, entries: &[DefectEntry]) -> Result<()>;

    /// ID集合に含まれる欠陥記録を取り除き、取り除いた記録を返す
    async fn pull_defects(
        &self,
        kind: ReportKind,
        id: ReportId,
        entry_ids: &HashSet<DefectId>,
    ) -> Result<Vec<DefectEntry>>;

    /// 欠陥記録1件を編集し、所属する報告書IDを返す
    async fn set_defect_fields(
        &self,
        kind: ReportKind,
        entry_id: DefectId,
        edit: &DefectEdit,
    ) -> Result<ReportId>;

    async fn set_equipment(
        &self,
        kind: ReportKind,
        id: ReportId,
        record: EquipmentPanelRecord,
    ) -> Result<()>;

    async fn set_customer(&self, kind: ReportKind, id: ReportId, patch: &CustomerPatch) -> Result<()>;

    /// 事後点検を作成または更新（`after-reports` 上で不可分に行う）
    async fn merge_after(&self, pre: &Report, change: AfterChange) -> Result<AfterMerge>;
}

/// 事後点検への変更内容
#[derive(Debug, Clone, Default)]
pub struct AfterChange {
    pub customer: CustomerPatch,
    /// 引き継いだ記録のうち削除するもの
    pub remove: HashSet<DefectId>,
    /// 画像割当済みの新しい記録
    pub incoming: Vec<DefectEntry>,
}

/// 事後点検の保存結果
#[derive(Debug, Clone)]
pub struct AfterMerge {
    pub report: Report,
    pub created: bool,
    pub removed: usize,
    /// 既存の記録と重複したため追加しなかった記録
    pub skipped: Vec<DefectEntry>,
}

/// 1コレクション分のドキュメント
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    /// バージョン（互換性チェック用）
    version: u32,
    documents: BTreeMap<ReportId, Report>,
}

impl Default for Collection {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            documents: BTreeMap::new(),
        }
    }
}

fn not_found(kind: ReportKind, id: ReportId) -> ReportError {
    ReportError::NotFound(format!("{}/{}", kind.collection(), id))
}

impl Collection {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn document_mut(&mut self, kind: ReportKind, id: ReportId) -> Result<&mut Report> {
        self.documents.get_mut(&id).ok_or_else(|| not_found(kind, id))
    }

    pub fn insert(&mut self, kind: ReportKind, report: &Report) -> Result<()> {
        if self.documents.contains_key(&report.id) {
            return Err(ReportError::Storage(format!(
                "既に存在します: {}/{}",
                kind.collection(),
                report.id
            )));
        }
        self.documents.insert(report.id, report.clone());
        Ok(())
    }

    pub fn find(&self, id: ReportId) -> Option<Report> {
        self.documents.get(&id).cloned()
    }

    pub fn contains(&self, id: ReportId) -> bool {
        self.documents.contains_key(&id)
    }

    pub fn list(&self) -> Vec<Report> {
        let mut reports: Vec<Report> = self.documents.values().cloned().collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        reports
    }

    pub fn push_defects(&mut self, kind: ReportKind, id: ReportId, entries: &[DefectEntry]) -> Result<()> {
        let report = self.document_mut(kind, id)?;
        report.visual_inspection.extend(entries.iter().cloned());
        report.updated_at = Some(Utc::now());
        Ok(())
    }

    pub fn pull_defects(
        &mut self,
        kind: ReportKind,
        id: ReportId,
        entry_ids: &HashSet<DefectId>,
    ) -> Result<Vec<DefectEntry>> {
        let report = self.document_mut(kind, id)?;
        let removed = crate::ledger::remove(&mut report.visual_inspection, entry_ids);
        report.updated_at = Some(Utc::now());
        Ok(removed)
    }

    pub fn set_defect_fields(
        &mut self,
        kind: ReportKind,
        entry_id: DefectId,
        edit: &DefectEdit,
    ) -> Result<ReportId> {
        let report = self
            .documents
            .values_mut()
            .find(|r| r.visual_inspection.iter().any(|e| e.id == entry_id))
            .ok_or_else(|| {
                ReportError::NotFound(format!("{} の欠陥記録: {}", kind.collection(), entry_id))
            })?;
        crate::ledger::edit(&mut report.visual_inspection, entry_id, edit)?;
        report.updated_at = Some(Utc::now());
        Ok(report.id)
    }

    pub fn set_equipment(
        &mut self,
        kind: ReportKind,
        id: ReportId,
        mut record: EquipmentPanelRecord,
    ) -> Result<()> {
        let report = self.document_mut(kind, id)?;
        let now = Utc::now();
        if let Some(existing) = &report.equipment_inspection {
            record.created_at = existing.created_at;
            record.updated_at = Some(now);
        }
        report.equipment_inspection = Some(record);
        report.updated_at = Some(now);
        Ok(())
    }

    pub fn set_customer(&mut self, kind: ReportKind, id: ReportId, patch: &CustomerPatch) -> Result<()> {
        let report = self.document_mut(kind, id)?;
        report.apply_customer(patch);
        report.updated_at = Some(Utc::now());
        Ok(())
    }

    /// 事後点検が無ければ事前点検のスナップショットから作り、変更を適用する
    ///
    /// 既存の事後点検では、同時に追加された記録を含む現在の台帳に対して
    /// 削除とマージを行う。
    pub fn merge_after(&mut self, pre: &Report, change: AfterChange) -> AfterMerge {
        let created = !self.documents.contains_key(&pre.id);
        let report = self
            .documents
            .entry(pre.id)
            .or_insert_with(|| Report::fork_from(pre));
        if !created {
            report.updated_at = Some(Utc::now());
        }

        report.apply_customer(&change.customer);
        let removed = crate::ledger::remove(&mut report.visual_inspection, &change.remove).len();
        let skipped = crate::ledger::merge(&mut report.visual_inspection, change.incoming);

        AfterMerge {
            report: report.clone(),
            created,
            removed,
            skipped,
        }
    }
}
