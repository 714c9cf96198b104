//! 設備点検パネルの正規化
//!
//! フォーム送信された箇所ごとの入力を、パネルごとの固定箇所リストに
//! 位置で対応付けて `EquipmentPanelRecord` を作る。

use crate::config::Config;
use crate::error::{ReportError, Result};
use chrono::Utc;
use inspection_report_common::{EquipmentPanelRecord, FieldValue, PanelItem, PanelKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// 真偽値として扱う入力
const TRUTHY: &[&str] = &["on", "true", "1", "yes", "y"];

/// 未加工の設備点検入力: パネル名 → 箇所ごとの項目
///
/// パネル名はフォームキー（`equipment`, `drain_check` 等）と
/// 保存キー（`thermalCamera`, `drainInspection` 等）のどちらも受け付ける。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPanels(pub BTreeMap<String, Vec<BTreeMap<String, Value>>>);

impl RawPanels {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn insert(&mut self, panel: &str, items: Vec<BTreeMap<String, Value>>) {
        self.0.insert(panel.to_string(), items);
    }
}

/// チェックボックス項目の変換規則
#[derive(Debug, Clone)]
pub struct FieldTransforms {
    checkbox_fields: BTreeSet<String>,
}

impl Default for FieldTransforms {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CHECKBOX_FIELDS.iter().copied())
    }
}

impl FieldTransforms {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            checkbox_fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.checkbox_fields.iter().cloned())
    }

    pub fn is_checkbox(&self, field: &str) -> bool {
        self.checkbox_fields.contains(field)
    }

    /// 1項目を変換（チェックボックス以外はそのまま）
    pub fn transform(&self, field: &str, value: &Value) -> FieldValue {
        if self.is_checkbox(field) {
            return FieldValue::Flag(is_truthy(value));
        }
        match value {
            Value::Bool(b) => FieldValue::Flag(*b),
            Value::String(s) => FieldValue::Text(s.clone()),
            Value::Null => FieldValue::Text(String::new()),
            other => FieldValue::Text(other.to_string()),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => TRUTHY.contains(&s.trim().to_lowercase().as_str()),
        _ => false,
    }
}

/// 1パネル分を固定箇所リストに対応付ける
///
/// 固定リストより長い入力は切り詰める。入力側の `location` は無視する。
pub fn encode_panel(
    kind: PanelKind,
    items: &[BTreeMap<String, Value>],
    transforms: &FieldTransforms,
) -> Vec<PanelItem> {
    let locations = kind.locations();
    if items.len() > locations.len() {
        tracing::warn!(
            panel = %kind,
            submitted = items.len(),
            limit = locations.len(),
            "設備点検の入力が固定箇所数を超えたため切り詰めます"
        );
    }

    items
        .iter()
        .zip(locations.iter())
        .map(|(item, location)| PanelItem {
            location: location.to_string(),
            fields: item
                .iter()
                .filter(|(key, _)| key.as_str() != "location")
                .map(|(key, value)| (key.clone(), transforms.transform(key, value)))
                .collect(),
        })
        .collect()
}

/// 全パネルを正規化
///
/// 未知のパネル名、同じパネルをフォームキーと保存キーの両方で送った入力は入力エラー。
pub fn encode(raw: &RawPanels, transforms: &FieldTransforms) -> Result<EquipmentPanelRecord> {
    let mut record = EquipmentPanelRecord::empty();
    let mut seen: BTreeMap<PanelKind, &str> = BTreeMap::new();

    for (name, items) in &raw.0 {
        let kind = PanelKind::from_key(name)?;
        if let Some(first) = seen.insert(kind, name.as_str()) {
            return Err(ReportError::Validation(format!(
                "点検パネル {} が重複しています: {} / {}",
                kind, first, name
            )));
        }
        *record.panel_mut(kind) = encode_panel(kind, items, transforms);
    }

    record.created_at = Utc::now();
    Ok(record)
}
