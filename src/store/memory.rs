use super::{AfterChange, AfterMerge, Collection, ReportStore};
use crate::error::Result;
use async_trait::async_trait;
use inspection_report_common::{
    CustomerPatch, DefectEdit, DefectEntry, DefectId, EquipmentPanelRecord, Report, ReportId,
    ReportKind,
};
use std::collections::HashSet;
use tokio::sync::Mutex;

/// プロセス内のみで保持するストア
#[derive(Default)]
pub struct MemoryStore {
    reports: Mutex<Collection>,
    after_reports: Mutex<Collection>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collection(&self, kind: ReportKind) -> &Mutex<Collection> {
        match kind {
            ReportKind::Pre => &self.reports,
            ReportKind::After => &self.after_reports,
        }
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn insert(&self, kind: ReportKind, report: &Report) -> Result<()> {
        self.collection(kind).lock().await.insert(kind, report)
    }

    async fn find(&self, kind: ReportKind, id: ReportId) -> Result<Option<Report>> {
        Ok(self.collection(kind).lock().await.find(id))
    }

    async fn exists(&self, kind: ReportKind, id: ReportId) -> Result<bool> {
        Ok(self.collection(kind).lock().await.contains(id))
    }

    async fn list(&self, kind: ReportKind) -> Result<Vec<Report>> {
        Ok(self.collection(kind).lock().await.list())
    }

    async fn push_defects(&self, kind: ReportKind, id: ReportId, entries: &[DefectEntry]) -> Result<()> {
        self.collection(kind).lock().await.push_defects(kind, id, entries)
    }

    async fn pull_defects(
        &self,
        kind: ReportKind,
        id: ReportId,
        entry_ids: &HashSet<DefectId>,
    ) -> Result<Vec<DefectEntry>> {
        self.collection(kind).lock().await.pull_defects(kind, id, entry_ids)
    }

    async fn set_defect_fields(
        &self,
        kind: ReportKind,
        entry_id: DefectId,
        edit: &DefectEdit,
    ) -> Result<ReportId> {
        self.collection(kind).lock().await.set_defect_fields(kind, entry_id, edit)
    }

    async fn set_equipment(
        &self,
        kind: ReportKind,
        id: ReportId,
        record: EquipmentPanelRecord,
    ) -> Result<()> {
        self.collection(kind).lock().await.set_equipment(kind, id, record)
    }

    async fn set_customer(&self, kind: ReportKind, id: ReportId, patch: &CustomerPatch) -> Result<()> {
        self.collection(kind).lock().await.set_customer(kind, id, patch)
    }

    async fn merge_after(&self, pre: &Report, change: AfterChange) -> Result<AfterMerge> {
        Ok(self.after_reports.lock().await.merge_after(pre, change))
    }
}
