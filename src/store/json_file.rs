//! JSONファイルによる報告書ストア
//!
//! `{data_dir}/reports.json` と `{data_dir}/after-reports.json` に保存する。
//! 更新はストア単位の非同期ロックで直列化し、一時ファイル経由で置き換える。

use super::{AfterChange, AfterMerge, Collection, ReportStore};
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use inspection_report_common::{
    CustomerPatch, DefectEdit, DefectEntry, DefectId, EquipmentPanelRecord, Report, ReportId,
    ReportKind,
};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub struct JsonFileStore {
    data_dir: PathBuf,
    lock: Mutex<()>,
}

fn load_collection(path: &Path) -> Result<Collection> {
    if !path.exists() {
        return Ok(Collection::default());
    }

    let file = File::open(path)?;
    let collection: Collection = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| ReportError::Storage(format!("{}: {}", path.display(), e)))?;

    if collection.version() != Collection::CURRENT_VERSION {
        return Err(ReportError::Storage(format!(
            "{}: 未対応のバージョン {}",
            path.display(),
            collection.version()
        )));
    }
    Ok(collection)
}

fn save_collection(data_dir: &Path, path: &Path, collection: &Collection) -> Result<()> {
    let temp = tempfile::NamedTempFile::new_in(data_dir)?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        serde_json::to_writer_pretty(&mut writer, collection)?;
        writer.flush()?;
    }
    temp.persist(path)
        .map_err(|e| ReportError::Storage(format!("{}: {}", path.display(), e)))?;
    Ok(())
}

/// ファイルI/Oをブロッキングスレッドで実行
async fn blocking<T: Send + 'static>(task: impl FnOnce() -> Result<T> + Send + 'static) -> Result<T> {
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ReportError::Storage(format!("ファイル処理が異常終了: {}", e)))?
}

impl JsonFileStore {
    /// データディレクトリを開く（既存ファイルが読めなければエラー）
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir).map_err(|e| {
            ReportError::Storage(format!("データディレクトリを作成できません: {}: {}", data_dir.display(), e))
        })?;

        let store = Self {
            data_dir,
            lock: Mutex::new(()),
        };
        for kind in [ReportKind::Pre, ReportKind::After] {
            let collection = load_collection(&store.collection_path(kind))?;
            tracing::debug!(collection = kind.collection(), documents = collection.len(), "コレクションを読み込み");
        }
        Ok(store)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn collection_path(&self, kind: ReportKind) -> PathBuf {
        self.data_dir.join(format!("{}.json", kind.collection()))
    }

    async fn load(&self, kind: ReportKind) -> Result<Collection> {
        let path = self.collection_path(kind);
        blocking(move || load_collection(&path)).await
    }

    async fn save(&self, kind: ReportKind, collection: Collection) -> Result<()> {
        let data_dir = self.data_dir.clone();
        let path = self.collection_path(kind);
        blocking(move || save_collection(&data_dir, &path, &collection)).await
    }

    async fn read<T>(&self, kind: ReportKind, f: impl FnOnce(&Collection) -> T) -> Result<T> {
        let _guard = self.lock.lock().await;
        let collection = self.load(kind).await?;
        Ok(f(&collection))
    }

    async fn write<T>(
        &self,
        kind: ReportKind,
        f: impl FnOnce(&mut Collection) -> Result<T>,
    ) -> Result<T> {
        let _guard = self.lock.lock().await;
        let mut collection = self.load(kind).await?;
        let value = f(&mut collection)?;
        self.save(kind, collection).await?;
        Ok(value)
    }
}

#[async_trait]
impl ReportStore for JsonFileStore {
    async fn insert(&self, kind: ReportKind, report: &Report) -> Result<()> {
        self.write(kind, |c| c.insert(kind, report)).await
    }

    async fn find(&self, kind: ReportKind, id: ReportId) -> Result<Option<Report>> {
        self.read(kind, |c| c.find(id)).await
    }

    async fn exists(&self, kind: ReportKind, id: ReportId) -> Result<bool> {
        self.read(kind, |c| c.contains(id)).await
    }

    async fn list(&self, kind: ReportKind) -> Result<Vec<Report>> {
        self.read(kind, |c| c.list()).await
    }

    async fn push_defects(&self, kind: ReportKind, id: ReportId, entries: &[DefectEntry]) -> Result<()> {
        self.write(kind, |c| c.push_defects(kind, id, entries)).await
    }

    async fn pull_defects(
        &self,
        kind: ReportKind,
        id: ReportId,
        entry_ids: &HashSet<DefectId>,
    ) -> Result<Vec<DefectEntry>> {
        self.write(kind, |c| c.pull_defects(kind, id, entry_ids)).await
    }

    async fn set_defect_fields(
        &self,
        kind: ReportKind,
        entry_id: DefectId,
        edit: &DefectEdit,
    ) -> Result<ReportId> {
        self.write(kind, |c| c.set_defect_fields(kind, entry_id, edit)).await
    }

    async fn set_equipment(
        &self,
        kind: ReportKind,
        id: ReportId,
        record: EquipmentPanelRecord,
    ) -> Result<()> {
        self.write(kind, |c| c.set_equipment(kind, id, record)).await
    }

    async fn set_customer(&self, kind: ReportKind, id: ReportId, patch: &CustomerPatch) -> Result<()> {
        self.write(kind, |c| c.set_customer(kind, id, patch)).await
    }

    async fn merge_after(&self, pre: &Report, change: AfterChange) -> Result<AfterMerge> {
        self.write(ReportKind::After, |c| Ok(c.merge_after(pre, change))).await
    }
}
