//! レイアウト設定モジュール
//!
//! mm基準のレイアウト定義（Source of Truth）
//! 点検報告書PDFの固定印刷レイアウト

// ============================================
// mm基準レイアウト（Source of Truth）
// ============================================

/// A4サイズ（mm）
pub const A4_WIDTH_MM: f32 = 210.0;
pub const A4_HEIGHT_MM: f32 = 297.0;

/// 余白設定（mm）
pub const MARGIN_MM: f32 = 15.0;

/// 利用可能領域（mm）
pub const USABLE_WIDTH_MM: f32 = A4_WIDTH_MM - MARGIN_MM * 2.0;   // 180mm
pub const USABLE_HEIGHT_MM: f32 = A4_HEIGHT_MM - MARGIN_MM * 2.0; // 267mm

/// 表の1行の高さ（mm）
pub const ROW_HEIGHT_MM: f32 = 7.0;

/// セクション見出しの高さ（mm）
pub const HEADING_HEIGHT_MM: f32 = 12.0;

/// 欠陥ブロック: 見出し帯 + 写真2枚 + 情報表
pub const BLOCK_HEADER_MM: f32 = 7.0;
pub const PHOTO_GAP_MM: f32 = 4.0;
pub const PHOTO_WIDTH_MM: f32 = (USABLE_WIDTH_MM - PHOTO_GAP_MM) / 2.0; // 88mm
pub const PHOTO_HEIGHT_MM: f32 = 66.0;
pub const BLOCK_GAP_MM: f32 = 6.0;

/// 情報表のラベル列幅（mm）
pub const LABEL_WIDTH_MM: f32 = 36.0;

/// 設備点検表のタイトル行・表間ギャップ（mm）
pub const TABLE_TITLE_MM: f32 = 8.0;
pub const TABLE_GAP_MM: f32 = 6.0;

// ============================================
// 変換係数
// ============================================

/// mm → pt変換 (1mm = 72/25.4 pt ≈ 2.835pt)
pub const MM_TO_PT: f32 = 72.0 / 25.4;

/// 1インチ = 25.4mm
pub const MM_PER_INCH: f32 = 25.4;

// ============================================
// フィールド定義
// ============================================

/// 情報表に表示するフィールド
#[derive(Debug, Clone, Copy)]
pub struct FieldDefinition {
    pub key: &'static str,
    pub label: &'static str,
    pub row_span: u8,
}

/// 欠陥ブロックの情報表
pub const DEFECT_FIELDS: &[FieldDefinition] = &[
    FieldDefinition { key: "location", label: "Location", row_span: 1 },
    FieldDefinition { key: "sector", label: "Sector", row_span: 1 },
    FieldDefinition { key: "specific", label: "Item", row_span: 1 },
    FieldDefinition { key: "content", label: "Description", row_span: 2 },
    FieldDefinition { key: "extra", label: "Note", row_span: 1 },
];

/// 表紙の顧客・物件表
pub const COVER_FIELDS: &[FieldDefinition] = &[
    FieldDefinition { key: "customerName", label: "Customer", row_span: 1 },
    FieldDefinition { key: "phone", label: "Phone", row_span: 1 },
    FieldDefinition { key: "apartmentName", label: "Complex", row_span: 1 },
    FieldDefinition { key: "dong", label: "Building", row_span: 1 },
    FieldDefinition { key: "home", label: "Unit", row_span: 1 },
    FieldDefinition { key: "date", label: "Inspection date", row_span: 1 },
];

/// 情報表の行数
pub fn info_rows(fields: &[FieldDefinition]) -> u32 {
    fields.iter().map(|f| f.row_span as u32).sum()
}

/// 欠陥ブロック全体の高さ（mm、ブロック間ギャップ含まず）
///
/// `info_rows` は折り返し後の情報表の行数
pub fn defect_block_height_mm(info_rows: usize) -> f32 {
    BLOCK_HEADER_MM + PHOTO_HEIGHT_MM + PHOTO_GAP_MM + info_rows as f32 * ROW_HEIGHT_MM
}

/// 1ページに収まる欠陥ブロック情報表の最大行数
pub fn max_defect_info_rows() -> usize {
    ((USABLE_HEIGHT_MM - BLOCK_HEADER_MM - PHOTO_HEIGHT_MM - PHOTO_GAP_MM) / ROW_HEIGHT_MM).floor() as usize
}

/// 設備点検表の高さ（mm、表間ギャップ含まず）
///
/// タイトル行 + 見出し行 + 固定箇所数分の行
pub fn equipment_table_height_mm(location_rows: usize) -> f32 {
    TABLE_TITLE_MM + ROW_HEIGHT_MM * (location_rows as f32 + 1.0)
}

// ============================================
// ヘルパー関数
// ============================================

/// mm → pt 変換
#[inline]
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * MM_TO_PT
}

/// pt → mm 変換
#[inline]
pub fn pt_to_mm(pt: f32) -> f32 {
    pt / MM_TO_PT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions() {
        assert!((USABLE_WIDTH_MM - 180.0).abs() < 0.01);
        assert!((USABLE_HEIGHT_MM - 267.0).abs() < 0.01);
        assert!((PHOTO_WIDTH_MM - 88.0).abs() < 0.01);
    }

    #[test]
    fn test_block_fits_on_page() {
        // 1ページに最低1ブロック、通常2ブロック入る
        let block = defect_block_height_mm(info_rows(DEFECT_FIELDS) as usize) + BLOCK_GAP_MM;
        assert!(block * 2.0 <= USABLE_HEIGHT_MM - HEADING_HEIGHT_MM);
    }

    #[test]
    fn test_tallest_block_fits_on_page() {
        let rows = max_defect_info_rows();
        assert!(rows > info_rows(DEFECT_FIELDS) as usize);
        assert!(defect_block_height_mm(rows) <= USABLE_HEIGHT_MM);
        assert!(defect_block_height_mm(rows + 1) > USABLE_HEIGHT_MM);
    }

    #[test]
    fn test_largest_table_fits_on_page() {
        assert!(equipment_table_height_mm(6) < USABLE_HEIGHT_MM);
    }

    #[test]
    fn test_conversion() {
        assert!((MM_TO_PT - 2.835).abs() < 0.01);
        assert!((mm_to_pt(10.0) - 28.35).abs() < 0.1);
        assert!((pt_to_mm(mm_to_pt(42.0)) - 42.0).abs() < 0.001);
    }
}
