//! 欠陥台帳（目視点検の欠陥記録の並び）
//!
//! 追加順を保持し、削除で残りの順序が変わることはない。
//! 記録IDは作成時に一度だけ割り当て、削除後も再利用しない。

use crate::error::{ReportError, Result};
use chrono::Utc;
use inspection_report_common::{DefectEdit, DefectEntry, DefectId, DraftDefect};
use std::collections::HashSet;

/// 1記録あたりの写真枚数
pub const IMAGES_PER_ENTRY: usize = 2;

/// 追加結果
#[derive(Debug, Clone, Default)]
pub struct Appended {
    pub entries: Vec<DefectEntry>,
    /// 採用された記録に割り当てられなかった画像（呼び出し側で削除する）
    pub unclaimed_images: Vec<String>,
}

fn trimmed(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

/// 下書きから欠陥記録を作る
///
/// 必須項目が欠けた下書きは黙って捨てる。画像は採用された記録k番目に
/// `images[2k..2k+2]` を割り当てる（送信順）。
pub fn build_entries(drafts: &[DraftDefect], images: &[String]) -> Appended {
    let now = Utc::now();
    let mut entries = Vec::new();
    let mut dropped = 0usize;

    for draft in drafts {
        if !draft.is_complete() {
            dropped += 1;
            continue;
        }
        let k = entries.len();
        let start = (k * IMAGES_PER_ENTRY).min(images.len());
        let end = ((k + 1) * IMAGES_PER_ENTRY).min(images.len());

        entries.push(DefectEntry {
            id: DefectId::new(),
            location: trimmed(&draft.location),
            sector: trimmed(&draft.sector),
            specific: trimmed(&draft.specific),
            content: trimmed(&draft.content),
            extra: trimmed(&draft.extra),
            images: images[start..end].to_vec(),
            created_at: now,
        });
    }

    if dropped > 0 {
        tracing::warn!(dropped, "必須項目が不足した欠陥行をスキップ");
    }

    let claimed = (entries.len() * IMAGES_PER_ENTRY).min(images.len());
    let unclaimed_images = images[claimed..].to_vec();
    if !unclaimed_images.is_empty() {
        tracing::warn!(count = unclaimed_images.len(), "割り当てられない画像があります");
    }

    Appended {
        entries,
        unclaimed_images,
    }
}

/// 下書きを台帳の末尾に追加
pub fn append(ledger: &mut Vec<DefectEntry>, drafts: &[DraftDefect], images: &[String]) -> Appended {
    let appended = build_entries(drafts, images);
    ledger.extend(appended.entries.iter().cloned());
    appended
}

/// ID集合に含まれる記録を取り除き、取り除いた記録を返す（未知のIDは無視）
pub fn remove(ledger: &mut Vec<DefectEntry>, ids: &HashSet<DefectId>) -> Vec<DefectEntry> {
    let (removed, kept): (Vec<_>, Vec<_>) =
        std::mem::take(ledger).into_iter().partition(|e| ids.contains(&e.id));
    *ledger = kept;
    removed
}

/// 記録の内容を編集（IDと画像は変更しない）
pub fn edit(ledger: &mut [DefectEntry], id: DefectId, change: &DefectEdit) -> Result<()> {
    let entry = ledger
        .iter_mut()
        .find(|e| e.id == id)
        .ok_or_else(|| ReportError::NotFound(format!("欠陥記録: {}", id)))?;
    apply_edit(entry, change)
}

/// 編集内容を1記録に適用
///
/// 必須項目を空にする編集は拒否する。
pub fn apply_edit(entry: &mut DefectEntry, change: &DefectEdit) -> Result<()> {
    let required = [
        ("location", &change.location),
        ("sector", &change.sector),
        ("specific", &change.specific),
        ("content", &change.content),
    ];
    for (name, value) in required {
        if matches!(value.as_deref(), Some(v) if v.trim().is_empty()) {
            return Err(ReportError::Validation(format!("{} は空にできません", name)));
        }
    }

    if let Some(v) = &change.location {
        entry.location = v.trim().to_string();
    }
    if let Some(v) = &change.sector {
        entry.sector = v.trim().to_string();
    }
    if let Some(v) = &change.specific {
        entry.specific = v.trim().to_string();
    }
    if let Some(v) = &change.content {
        entry.content = v.trim().to_string();
    }
    if let Some(v) = &change.extra {
        entry.extra = v.trim().to_string();
    }
    Ok(())
}

/// 内容の同一性判定キー
pub fn fingerprint(entry: &DefectEntry) -> [String; 5] {
    [
        entry.location.trim().to_lowercase(),
        entry.sector.trim().to_lowercase(),
        entry.specific.trim().to_lowercase(),
        entry.content.trim().to_lowercase(),
        entry.extra.trim().to_lowercase(),
    ]
}

/// 既存の記録と同じIDまたは同じ内容の記録を除いて末尾に追加し、追加しなかった記録を返す
///
/// 内容の比較対象は追加前の台帳のみ。同じ送信内の同一内容の行はすべて追加する。
pub fn merge(ledger: &mut Vec<DefectEntry>, incoming: Vec<DefectEntry>) -> Vec<DefectEntry> {
    let mut ids: HashSet<DefectId> = ledger.iter().map(|e| e.id).collect();
    let prints: HashSet<[String; 5]> = ledger.iter().map(fingerprint).collect();
    let mut skipped = Vec::new();

    for entry in incoming {
        if ids.contains(&entry.id) || prints.contains(&fingerprint(&entry)) {
            skipped.push(entry);
            continue;
        }
        ids.insert(entry.id);
        ledger.push(entry);
    }
    skipped
}
