//! 設備点検パネル定義
//!
//! 6種類の点検パネルと、それぞれの固定測定箇所リスト。
//! 箇所リストは報告書ごとに変わらない。

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// 設備点検パネルの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PanelKind {
    Radon,
    Formaldehyde,
    ThermalCamera,
    PipeInspection,
    FloorLevel,
    DrainInspection,
}

const RADON_LOCATIONS: &[&str] = &["Kitchen/Living", "Family bathroom", "Bedroom 1 (master)"];
const FORMALDEHYDE_LOCATIONS: &[&str] = &["Kitchen/Living", "Family bathroom", "Bedroom 1 (master)"];
const THERMAL_CAMERA_LOCATIONS: &[&str] = &[
    "Kitchen",
    "Living room",
    "Bedroom 1 (master)",
    "Bedroom 2",
    "Bedroom 3",
    "Dressing room",
];
const PIPE_LOCATIONS: &[&str] = &["Family bathroom", "Master bathroom", "Balcony", "Utility room"];
const FLOOR_LOCATIONS: &[&str] = &["Living room", "Bedroom 1", "Bedroom 2", "Bedroom 3"];
const DRAIN_LOCATIONS: &[&str] = &["Family bathroom", "Master bathroom", "Balcony", "Utility room"];

impl PanelKind {
    /// 表示・エンコード順
    pub const ALL: [PanelKind; 6] = [
        PanelKind::Radon,
        PanelKind::Formaldehyde,
        PanelKind::ThermalCamera,
        PanelKind::PipeInspection,
        PanelKind::FloorLevel,
        PanelKind::DrainInspection,
    ];

    /// 固定測定箇所リスト
    pub fn locations(&self) -> &'static [&'static str] {
        match self {
            PanelKind::Radon => RADON_LOCATIONS,
            PanelKind::Formaldehyde => FORMALDEHYDE_LOCATIONS,
            PanelKind::ThermalCamera => THERMAL_CAMERA_LOCATIONS,
            PanelKind::PipeInspection => PIPE_LOCATIONS,
            PanelKind::FloorLevel => FLOOR_LOCATIONS,
            PanelKind::DrainInspection => DRAIN_LOCATIONS,
        }
    }

    /// フォーム送信時のキー
    pub fn form_key(&self) -> &'static str {
        match self {
            PanelKind::Radon => "radon",
            PanelKind::Formaldehyde => "formaldehyde",
            PanelKind::ThermalCamera => "equipment",
            PanelKind::PipeInspection => "pipeInspection",
            PanelKind::FloorLevel => "floor_level",
            PanelKind::DrainInspection => "drain_check",
        }
    }

    /// 保存時のキー
    pub fn record_key(&self) -> &'static str {
        match self {
            PanelKind::Radon => "radon",
            PanelKind::Formaldehyde => "formaldehyde",
            PanelKind::ThermalCamera => "thermalCamera",
            PanelKind::PipeInspection => "pipeInspection",
            PanelKind::FloorLevel => "floorLevel",
            PanelKind::DrainInspection => "drainInspection",
        }
    }

    /// PDFの表タイトル
    pub fn title(&self) -> &'static str {
        match self {
            PanelKind::Radon => "Radon",
            PanelKind::Formaldehyde => "Formaldehyde",
            PanelKind::ThermalCamera => "Thermal camera",
            PanelKind::PipeInspection => "Pipe inspection",
            PanelKind::FloorLevel => "Floor level",
            PanelKind::DrainInspection => "Drain inspection",
        }
    }

    /// フォームキー・保存キーのどちらでも受け付ける
    pub fn from_key(key: &str) -> Result<Self> {
        let key = key.trim();
        PanelKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.form_key() == key || kind.record_key() == key)
            .ok_or_else(|| Error::UnknownPanel(key.to_string()))
    }
}

impl std::fmt::Display for PanelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.record_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_counts() {
        assert_eq!(PanelKind::Radon.locations().len(), 3);
        assert_eq!(PanelKind::Formaldehyde.locations().len(), 3);
        assert_eq!(PanelKind::ThermalCamera.locations().len(), 6);
        assert_eq!(PanelKind::PipeInspection.locations().len(), 4);
        assert_eq!(PanelKind::FloorLevel.locations().len(), 4);
        assert_eq!(PanelKind::DrainInspection.locations().len(), 4);
    }

    #[test]
    fn test_from_key_accepts_both_spellings() {
        assert_eq!(PanelKind::from_key("equipment").unwrap(), PanelKind::ThermalCamera);
        assert_eq!(PanelKind::from_key("thermalCamera").unwrap(), PanelKind::ThermalCamera);
        assert_eq!(PanelKind::from_key("drain_check").unwrap(), PanelKind::DrainInspection);
        assert_eq!(PanelKind::from_key(" floorLevel ").unwrap(), PanelKind::FloorLevel);
    }

    #[test]
    fn test_from_key_unknown() {
        let err = PanelKind::from_key("ozone").unwrap_err();
        assert!(matches!(err, Error::UnknownPanel(ref k) if k == "ozone"));
    }
}
