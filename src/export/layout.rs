//! ページ割付
//!
//! 報告書をA4ページ上の要素配置に変換する（描画はしない）。
//! - 表紙: タイトル + 顧客・物件表
//! - 目視点検: 新しいページから開始、欠陥ブロックはページをまたがない
//! - 設備点検: 記録がある場合のみ、必ず新しいページから開始、表はページをまたがない
//!
//! 情報表の値はここで折り返し、行数に合わせてブロックの高さを決める。
//! 座標はページ上端からのmm。

use inspection_report_common::layout::{
    defect_block_height_mm, equipment_table_height_mm, max_defect_info_rows, pt_to_mm,
    FieldDefinition, A4_HEIGHT_MM, BLOCK_GAP_MM, COVER_FIELDS, DEFECT_FIELDS, HEADING_HEIGHT_MM,
    LABEL_WIDTH_MM, MARGIN_MM, ROW_HEIGHT_MM, TABLE_GAP_MM, USABLE_HEIGHT_MM, USABLE_WIDTH_MM,
};
use inspection_report_common::{DefectEntry, PanelKind, Report};

pub const DEFECTS_HEADING: &str = "Visual Inspection";
pub const EQUIPMENT_HEADING: &str = "Equipment Inspection";
pub const NO_DEFECTS_NOTE: &str = "No defects recorded.";

const COVER_TITLE_HEIGHT_MM: f32 = 20.0;
const COVER_TABLE_OFFSET_MM: f32 = 40.0;

/// 本文のフォントサイズ(pt)
pub const BODY_PT: f32 = 9.0;
/// Helvetica の平均文字幅（フォントサイズ比）
const AVG_CHAR_WIDTH: f32 = 0.5;
/// 値セル左右の余白(mm)
const VALUE_PADDING_MM: f32 = 4.0;
const ELLIPSIS: &str = "...";

/// 列幅に収まる文字数
pub fn chars_for_width(width_mm: f32) -> usize {
    (width_mm / (pt_to_mm(BODY_PT) * AVG_CHAR_WIDTH)).floor().max(1.0) as usize
}

/// 情報表の1項目（折り返し済み）
#[derive(Debug, Clone, PartialEq)]
pub struct InfoRow {
    pub label: &'static str,
    pub lines: Vec<String>,
    /// 占有する行数（最低でも定義上の行数）
    pub rows: usize,
}

impl InfoRow {
    fn new(field: &FieldDefinition, value: &str) -> Self {
        let value_chars = chars_for_width(USABLE_WIDTH_MM - LABEL_WIDTH_MM - VALUE_PADDING_MM);
        let lines = wrap_text(value, value_chars);
        let rows = lines.len().max(field.row_span as usize).max(1);
        Self {
            label: field.label,
            lines,
            rows,
        }
    }
}

fn total_rows(rows: &[InfoRow]) -> usize {
    rows.iter().map(|r| r.rows).sum()
}

/// 行数が上限を超える場合、最も長い項目から末尾の行を落として収める
fn fit_rows(mut rows: Vec<InfoRow>, max_rows: usize) -> Vec<InfoRow> {
    let before = total_rows(&rows);
    if before <= max_rows {
        return rows;
    }

    let mut shortened = vec![false; rows.len()];
    while total_rows(&rows) > max_rows {
        let Some((i, _)) = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.lines.len() > 1)
            .max_by_key(|(_, r)| r.lines.len())
        else {
            break;
        };
        rows[i].lines.pop();
        rows[i].rows = rows[i].lines.len().max(1);
        shortened[i] = true;
    }
    for (row, cut) in rows.iter_mut().zip(shortened) {
        if let (true, Some(last)) = (cut, row.lines.last_mut()) {
            last.push_str(ELLIPSIS);
        }
    }

    tracing::warn!(rows = before, limit = max_rows, "情報表が1ページに収まらないため値を省略");
    rows
}

/// 欠陥ブロックの情報表
pub fn defect_info(entry: &DefectEntry) -> Vec<InfoRow> {
    let rows = DEFECT_FIELDS
        .iter()
        .map(|f| {
            let value = match f.key {
                "location" => entry.location.as_str(),
                "sector" => entry.sector.as_str(),
                "specific" => entry.specific.as_str(),
                "content" => entry.content.as_str(),
                "extra" if entry.extra.is_empty() => "-",
                "extra" => entry.extra.as_str(),
                _ => "",
            };
            InfoRow::new(f, value)
        })
        .collect();
    fit_rows(rows, max_defect_info_rows())
}

/// 表紙の顧客・物件表
pub fn cover_info(report: &Report) -> Vec<InfoRow> {
    let rows = COVER_FIELDS
        .iter()
        .map(|f| {
            let value = match f.key {
                "customerName" => report.customer_name.clone(),
                "phone" => report.phone.clone(),
                "apartmentName" => report.apartment_name.clone(),
                "dong" => report.dong.clone(),
                "home" => report.home.clone(),
                "date" => report.date.format("%Y-%m-%d").to_string(),
                _ => String::new(),
            };
            InfoRow::new(f, &value)
        })
        .collect();
    let max_rows = ((USABLE_HEIGHT_MM - COVER_TABLE_OFFSET_MM) / ROW_HEIGHT_MM).floor() as usize;
    fit_rows(rows, max_rows)
}

/// ページ上の要素
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// 表紙タイトル
    Title { text: String },
    /// 表紙の顧客・物件表
    CoverTable { info: Vec<InfoRow> },
    /// セクション見出し
    Heading { text: String },
    /// 記録がないことの注記
    Note { text: String },
    /// 欠陥ブロック（`entry` は台帳内の位置、`number` は1始まりの表示番号）
    DefectBlock {
        entry: usize,
        number: usize,
        info: Vec<InfoRow>,
    },
    /// 設備点検表
    EquipmentTable { panel: PanelKind },
}

impl Element {
    pub fn height_mm(&self) -> f32 {
        match self {
            Element::Title { .. } => COVER_TITLE_HEIGHT_MM,
            Element::CoverTable { info } => total_rows(info) as f32 * ROW_HEIGHT_MM,
            Element::Heading { .. } => HEADING_HEIGHT_MM,
            Element::Note { .. } => ROW_HEIGHT_MM,
            Element::DefectBlock { info, .. } => defect_block_height_mm(total_rows(info)),
            Element::EquipmentTable { panel } => equipment_table_height_mm(panel.locations().len()),
        }
    }
}

/// 配置済み要素
#[derive(Debug, Clone, PartialEq)]
pub struct Placed {
    pub element: Element,
    /// 要素上端（ページ上端からのmm）
    pub top_mm: f32,
}

impl Placed {
    pub fn bottom_mm(&self) -> f32 {
        self.top_mm + self.element.height_mm()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagePlan {
    pub elements: Vec<Placed>,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentPlan {
    pub pages: Vec<PagePlan>,
}

impl DocumentPlan {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// 設備点検セクションの開始ページ
    pub fn equipment_start_page(&self) -> Option<usize> {
        self.pages.iter().position(|p| {
            p.elements
                .iter()
                .any(|e| matches!(e.element, Element::EquipmentTable { .. }))
        })
    }

    pub fn defect_blocks(&self) -> impl Iterator<Item = (usize, &Placed)> {
        self.pages.iter().enumerate().flat_map(|(i, p)| {
            p.elements
                .iter()
                .filter(|e| matches!(e.element, Element::DefectBlock { .. }))
                .map(move |e| (i, e))
        })
    }
}

/// 上から順に要素を積み、入らなければ改ページする
struct Flow {
    pages: Vec<PagePlan>,
    cursor_mm: f32,
}

impl Flow {
    const BOTTOM_MM: f32 = A4_HEIGHT_MM - MARGIN_MM;

    fn new() -> Self {
        Self {
            pages: vec![PagePlan::default()],
            cursor_mm: MARGIN_MM,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(PagePlan::default());
        self.cursor_mm = MARGIN_MM;
    }

    fn current_page_is_empty(&self) -> bool {
        self.pages.last().map(|p| p.elements.is_empty()).unwrap_or(true)
    }

    /// 要素を配置（分割不可。入らなければ次のページへ）
    fn place(&mut self, element: Element, gap_after_mm: f32) {
        let height = element.height_mm();
        if self.cursor_mm + height > Self::BOTTOM_MM && !self.current_page_is_empty() {
            self.new_page();
        }
        let top_mm = self.cursor_mm;
        if let Some(page) = self.pages.last_mut() {
            page.elements.push(Placed { element, top_mm });
        }
        self.cursor_mm = top_mm + height + gap_after_mm;
    }

    /// 見出しは直後の要素と同じページに置く
    fn place_heading_with(&mut self, heading: Element, first: Option<&Element>) {
        let needed = heading.height_mm() + first.map(|e| e.height_mm()).unwrap_or(0.0);
        if self.cursor_mm + needed > Self::BOTTOM_MM && !self.current_page_is_empty() {
            self.new_page();
        }
        self.place(heading, 0.0);
    }
}

/// 報告書のページ割付を計算
pub fn plan(report: &Report) -> DocumentPlan {
    let mut flow = Flow::new();

    // 表紙
    flow.place(
        Element::Title {
            text: report.kind().title().to_string(),
        },
        COVER_TABLE_OFFSET_MM - COVER_TITLE_HEIGHT_MM,
    );
    flow.place(
        Element::CoverTable {
            info: cover_info(report),
        },
        0.0,
    );

    // 目視点検
    flow.new_page();
    let blocks: Vec<Element> = report
        .visual_inspection
        .iter()
        .enumerate()
        .map(|(entry, defect)| Element::DefectBlock {
            entry,
            number: entry + 1,
            info: defect_info(defect),
        })
        .collect();
    flow.place_heading_with(
        Element::Heading {
            text: DEFECTS_HEADING.to_string(),
        },
        blocks.first(),
    );
    if blocks.is_empty() {
        flow.place(
            Element::Note {
                text: NO_DEFECTS_NOTE.to_string(),
            },
            0.0,
        );
    }
    for block in blocks {
        flow.place(block, BLOCK_GAP_MM);
    }

    // 設備点検
    if report.equipment_inspection.is_some() {
        flow.new_page();
        let tables: Vec<Element> = PanelKind::ALL
            .iter()
            .map(|&panel| Element::EquipmentTable { panel })
            .collect();
        flow.place_heading_with(
            Element::Heading {
                text: EQUIPMENT_HEADING.to_string(),
            },
            tables.first(),
        );
        for table in tables {
            flow.place(table, TABLE_GAP_MM);
        }
    }

    DocumentPlan { pages: flow.pages }
}

/// 1行に収まる文字数で折り返す（単語単位、長い単語は強制分割）
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                lines.push(word.drain(..max_chars).collect());
            }
            let word: String = word.into_iter().collect();
            if word.is_empty() {
                continue;
            }

            let needed = if line.is_empty() {
                word.chars().count()
            } else {
                line.chars().count() + 1 + word.chars().count()
            };
            if needed > max_chars {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&word);
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}
