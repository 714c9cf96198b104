//! Inspection Report Common Library
//!
//! サービス・CLI・エクスポートで共有される型とレイアウト定義

pub mod types;
pub mod layout;
pub mod panels;
pub mod error;

pub use types::{
    AfterReportState, CustomerPatch, DefectEdit, DefectEntry, DefectId, DraftDefect,
    EquipmentPanelRecord, FieldValue, NewReport, PanelItem, Report, ReportId, ReportKind,
};
pub use panels::PanelKind;
pub use error::{Error, Result};
