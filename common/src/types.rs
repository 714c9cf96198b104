//! 点検報告書の型定義
//!
//! CLIとサービスで共有される型:
//! - Report: 報告書アグリゲート（事前点検・事後点検）
//! - DefectEntry: 目視点検の欠陥記録（写真付き）
//! - EquipmentPanelRecord: 設備点検の結果

use crate::error::{Error, Result};
use crate::panels::PanelKind;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// 報告書ID（事前・事後で共有）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(Uuid);

impl ReportId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| Error::InvalidId(s.to_string()))
    }
}

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::str::FromStr for ReportId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for ReportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// 欠陥記録ID（削除後も再利用しない）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefectId(Uuid);

impl DefectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| Error::InvalidId(s.to_string()))
    }
}

impl Default for DefectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::str::FromStr for DefectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for DefectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// 報告書の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// 事前点検（入居前）
    #[default]
    Pre,
    /// 事後点検（入居後）
    After,
}

impl ReportKind {
    /// 保存先コレクション名
    pub fn collection(&self) -> &'static str {
        match self {
            ReportKind::Pre => "reports",
            ReportKind::After => "after-reports",
        }
    }

    /// 表紙タイトル
    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::Pre => "Pre-Handover Inspection Report",
            ReportKind::After => "Post-Handover Inspection Report",
        }
    }

    /// 出力ファイル名の識別子
    pub fn file_tag(&self) -> &'static str {
        match self {
            ReportKind::Pre => "pre",
            ReportKind::After => "post",
        }
    }
}

impl std::str::FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pre" | "before" => Ok(ReportKind::Pre),
            "after" | "post" => Ok(ReportKind::After),
            _ => Err(format!("Unknown report kind: {}. Use pre or after", s)),
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportKind::Pre => write!(f, "pre"),
            ReportKind::After => write!(f, "after"),
        }
    }
}

/// 受付時の顧客・物件情報
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    pub date: NaiveDate,
    pub apartment_name: String,
    pub dong: String,
    pub home: String,
    pub customer_name: String,
    pub phone: String,
}

/// 顧客・物件情報の部分更新（指定されたフィールドのみ上書き）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerPatch {
    pub date: Option<NaiveDate>,
    pub apartment_name: Option<String>,
    pub dong: Option<String>,
    pub home: Option<String>,
    pub customer_name: Option<String>,
    pub phone: Option<String>,
}

impl CustomerPatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.apartment_name.is_none()
            && self.dong.is_none()
            && self.home.is_none()
            && self.customer_name.is_none()
            && self.phone.is_none()
    }
}

/// 報告書アグリゲート
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(rename = "_id")]
    pub id: ReportId,

    /// 事後点検のみ: 元の事前点検ID（= 自身のID）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_report_id: Option<ReportId>,

    pub date: NaiveDate,          // 点検日
    pub apartment_name: String,   // 団地名
    pub dong: String,             // 棟
    pub home: String,             // 号室
    pub customer_name: String,
    pub phone: String,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// 目視点検（追加順）
    #[serde(default)]
    pub visual_inspection: Vec<DefectEntry>,

    /// 設備点検
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_inspection: Option<EquipmentPanelRecord>,
}

impl Report {
    pub fn new(intake: NewReport) -> Self {
        Self {
            id: ReportId::new(),
            original_report_id: None,
            date: intake.date,
            apartment_name: intake.apartment_name,
            dong: intake.dong,
            home: intake.home,
            customer_name: intake.customer_name,
            phone: intake.phone,
            created_at: Utc::now(),
            updated_at: None,
            visual_inspection: Vec::new(),
            equipment_inspection: None,
        }
    }

    /// 事前点検のスナップショットから事後点検を作成
    ///
    /// IDは事前点検と同一。欠陥記録・設備点検はコピーされ、以後は独立して変更される。
    pub fn fork_from(pre: &Report) -> Self {
        Self {
            id: pre.id,
            original_report_id: Some(pre.id),
            date: pre.date,
            apartment_name: pre.apartment_name.clone(),
            dong: pre.dong.clone(),
            home: pre.home.clone(),
            customer_name: pre.customer_name.clone(),
            phone: pre.phone.clone(),
            created_at: Utc::now(),
            updated_at: None,
            visual_inspection: pre.visual_inspection.clone(),
            equipment_inspection: pre.equipment_inspection.clone(),
        }
    }

    pub fn kind(&self) -> ReportKind {
        if self.original_report_id.is_some() {
            ReportKind::After
        } else {
            ReportKind::Pre
        }
    }

    /// 指定されたフィールドのみ上書き
    pub fn apply_customer(&mut self, patch: &CustomerPatch) {
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(v) = &patch.apartment_name {
            self.apartment_name = v.clone();
        }
        if let Some(v) = &patch.dong {
            self.dong = v.clone();
        }
        if let Some(v) = &patch.home {
            self.home = v.clone();
        }
        if let Some(v) = &patch.customer_name {
            self.customer_name = v.clone();
        }
        if let Some(v) = &patch.phone {
            self.phone = v.clone();
        }
    }

    pub fn is_equipment_inspected(&self) -> bool {
        self.equipment_inspection.is_some()
    }

    /// 全欠陥記録の画像枚数
    pub fn image_count(&self) -> usize {
        self.visual_inspection.iter().map(|e| e.images.len()).sum()
    }
}

/// 事後点検の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterReportState {
    NotStarted,
    Drafted,
    Updated,
}

impl AfterReportState {
    pub fn of(after: Option<&Report>) -> Self {
        match after {
            None => AfterReportState::NotStarted,
            Some(r) if r.updated_at.is_none() => AfterReportState::Drafted,
            Some(_) => AfterReportState::Updated,
        }
    }
}

/// 欠陥記録
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectEntry {
    #[serde(rename = "_id")]
    pub id: DefectId,

    pub location: String,  // 場所
    pub sector: String,    // 部位
    pub specific: String,  // 詳細項目
    pub content: String,   // 内容

    #[serde(default)]
    pub extra: String,     // 備考

    /// 圧縮済み画像ファイル名（0〜2枚）
    #[serde(default)]
    pub images: Vec<String>,

    pub created_at: DateTime<Utc>,
}

/// フォーム1行分の欠陥入力（未検証）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DraftDefect {
    pub location: Option<String>,
    pub sector: Option<String>,
    pub specific: Option<String>,
    pub content: Option<String>,
    pub extra: Option<String>,
}

fn filled(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}

impl DraftDefect {
    /// 必須項目（場所・部位・詳細・内容）が揃っているか
    pub fn is_complete(&self) -> bool {
        filled(&self.location) && filled(&self.sector) && filled(&self.specific) && filled(&self.content)
    }
}

/// 欠陥記録の編集内容（指定されたフィールドのみ上書き）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefectEdit {
    pub location: Option<String>,
    pub sector: Option<String>,
    pub specific: Option<String>,
    pub content: Option<String>,
    pub extra: Option<String>,
}

/// 設備点検の項目値
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Flag(true) => write!(f, "Yes"),
            FieldValue::Flag(false) => write!(f, "No"),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// 設備点検1箇所分の結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelItem {
    pub location: String,

    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
}

/// 設備点検の結果（6パネル）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentPanelRecord {
    #[serde(default)]
    pub radon: Vec<PanelItem>,
    #[serde(default)]
    pub formaldehyde: Vec<PanelItem>,
    #[serde(default)]
    pub thermal_camera: Vec<PanelItem>,
    #[serde(default)]
    pub pipe_inspection: Vec<PanelItem>,
    #[serde(default)]
    pub floor_level: Vec<PanelItem>,
    #[serde(default)]
    pub drain_inspection: Vec<PanelItem>,

    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl EquipmentPanelRecord {
    pub fn empty() -> Self {
        Self {
            radon: Vec::new(),
            formaldehyde: Vec::new(),
            thermal_camera: Vec::new(),
            pipe_inspection: Vec::new(),
            floor_level: Vec::new(),
            drain_inspection: Vec::new(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn panel(&self, kind: PanelKind) -> &[PanelItem] {
        match kind {
            PanelKind::Radon => &self.radon,
            PanelKind::Formaldehyde => &self.formaldehyde,
            PanelKind::ThermalCamera => &self.thermal_camera,
            PanelKind::PipeInspection => &self.pipe_inspection,
            PanelKind::FloorLevel => &self.floor_level,
            PanelKind::DrainInspection => &self.drain_inspection,
        }
    }

    pub fn panel_mut(&mut self, kind: PanelKind) -> &mut Vec<PanelItem> {
        match kind {
            PanelKind::Radon => &mut self.radon,
            PanelKind::Formaldehyde => &mut self.formaldehyde,
            PanelKind::ThermalCamera => &mut self.thermal_camera,
            PanelKind::PipeInspection => &mut self.pipe_inspection,
            PanelKind::FloorLevel => &mut self.floor_level,
            PanelKind::DrainInspection => &mut self.drain_inspection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_intake() -> NewReport {
        NewReport {
            date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            apartment_name: "Hillstate".to_string(),
            dong: "101".to_string(),
            home: "1203".to_string(),
            customer_name: "Kim".to_string(),
            phone: "010-0000-0000".to_string(),
        }
    }

    #[test]
    fn test_report_serialize_shape() {
        let report = Report::new(sample_intake());
        let json = serde_json::to_string(&report).expect("シリアライズ失敗");
        assert!(json.contains("\"_id\""));
        assert!(json.contains("\"apartmentName\":\"Hillstate\""));
        assert!(json.contains("\"visualInspection\":[]"));
        assert!(!json.contains("originalReportId"));
        assert!(!json.contains("equipmentInspection"));
    }

    #[test]
    fn test_fork_shares_identity() {
        let pre = Report::new(sample_intake());
        let after = Report::fork_from(&pre);
        assert_eq!(after.id, pre.id);
        assert_eq!(after.original_report_id, Some(pre.id));
        assert_eq!(after.kind(), ReportKind::After);
        assert_eq!(pre.kind(), ReportKind::Pre);
    }

    #[test]
    fn test_apply_customer_partial() {
        let mut report = Report::new(sample_intake());
        report.apply_customer(&CustomerPatch {
            phone: Some("010-1111-2222".to_string()),
            ..Default::default()
        });
        assert_eq!(report.phone, "010-1111-2222");
        assert_eq!(report.customer_name, "Kim");
    }

    #[test]
    fn test_draft_completeness() {
        let mut draft = DraftDefect {
            location: Some("Kitchen".to_string()),
            sector: Some("Wall".to_string()),
            specific: Some("Tile".to_string()),
            content: Some("Crack".to_string()),
            extra: None,
        };
        assert!(draft.is_complete());

        draft.content = Some("   ".to_string());
        assert!(!draft.is_complete());
    }

    #[test]
    fn test_id_parse_invalid() {
        assert!(ReportId::parse("abc").is_err());
        let id = ReportId::new();
        assert_eq!(ReportId::parse(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_panel_item_flatten() {
        let json = r#"{"location":"Kitchen","normal":true,"value":"0.02"}"#;
        let item: PanelItem = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert_eq!(item.location, "Kitchen");
        assert_eq!(item.fields.get("normal"), Some(&FieldValue::Flag(true)));
        assert_eq!(item.fields.get("value"), Some(&FieldValue::Text("0.02".to_string())));
    }

    #[test]
    fn test_after_report_state() {
        let pre = Report::new(sample_intake());
        assert_eq!(AfterReportState::of(None), AfterReportState::NotStarted);
        let mut after = Report::fork_from(&pre);
        assert_eq!(AfterReportState::of(Some(&after)), AfterReportState::Drafted);
        after.updated_at = Some(Utc::now());
        assert_eq!(AfterReportState::of(Some(&after)), AfterReportState::Updated);
    }
}
