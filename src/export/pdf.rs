//! PDF描画
//!
//! `layout::plan` の割付結果をそのままprintpdfで描画する。
//! 写真は保存済みJPEGを枠内に縦横比を保って中央配置する。

use super::layout::{chars_for_width, DocumentPlan, Element, InfoRow, Placed, BODY_PT};
use crate::error::{ReportError, Result};
use inspection_report_common::layout::{
    A4_HEIGHT_MM, A4_WIDTH_MM, BLOCK_HEADER_MM, LABEL_WIDTH_MM, MARGIN_MM, MM_PER_INCH,
    PHOTO_GAP_MM, PHOTO_HEIGHT_MM, PHOTO_WIDTH_MM, ROW_HEIGHT_MM, TABLE_TITLE_MM,
    USABLE_WIDTH_MM,
};
use inspection_report_common::{DefectEntry, FieldValue, PanelItem, PanelKind, Report};
use printpdf::image_crate::codecs::jpeg::JpegDecoder;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Rgb,
};
use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::Path;

const TITLE_PT: f32 = 20.0;
const HEADING_PT: f32 = 14.0;
const IMAGE_DPI: f32 = 300.0;
const LINE_THICKNESS_PT: f32 = 0.5;

/// 本文・見出し用フォント
struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference, font_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = font_path {
            let file = std::fs::File::open(path).map_err(|e| {
                ReportError::Render(format!("フォントを開けません: {}: {}", path.display(), e))
            })?;
            let font = doc
                .add_external_font(file)
                .map_err(|e| ReportError::Render(format!("フォント追加エラー: {:?}", e)))?;
            return Ok(Self {
                regular: font.clone(),
                bold: font,
            });
        }

        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ReportError::Render(format!("フォント追加エラー: {:?}", e)))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ReportError::Render(format!("フォント追加エラー: {:?}", e)))?;
        Ok(Self { regular, bold })
    }
}

/// 描画に必要な入力
pub struct PdfRenderer<'a> {
    report: &'a Report,
    upload_dir: &'a Path,
    font_path: Option<&'a Path>,
}

impl<'a> PdfRenderer<'a> {
    pub fn new(report: &'a Report, upload_dir: &'a Path, font_path: Option<&'a Path>) -> Self {
        Self {
            report,
            upload_dir,
            font_path,
        }
    }

    /// 全ページを描画してPDFのバイト列を返す
    pub fn render(&self, plan: &DocumentPlan) -> Result<Vec<u8>> {
        let title = self.report.kind().title();
        let (doc, first_page, first_layer) =
            PdfDocument::new(title, Mm(A4_WIDTH_MM), Mm(A4_HEIGHT_MM), "Layer 1");
        let fonts = Fonts::load(&doc, self.font_path)?;

        for (i, page) in plan.pages.iter().enumerate() {
            let layer = if i == 0 {
                doc.get_page(first_page).get_layer(first_layer)
            } else {
                let (p, l) = doc.add_page(Mm(A4_WIDTH_MM), Mm(A4_HEIGHT_MM), "Layer 1");
                doc.get_page(p).get_layer(l)
            };
            layer.set_outline_thickness(LINE_THICKNESS_PT);
            layer.set_outline_color(Color::Rgb(Rgb::new(0.3, 0.3, 0.3, None)));
            layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));

            for placed in &page.elements {
                self.draw(&layer, &fonts, placed)?;
            }
        }

        doc.save_to_bytes()
            .map_err(|e| ReportError::Render(format!("PDF保存エラー: {:?}", e)))
    }

    fn draw(&self, layer: &PdfLayerReference, fonts: &Fonts, placed: &Placed) -> Result<()> {
        let top = placed.top_mm;
        match &placed.element {
            Element::Title { text } => {
                text_at(layer, &fonts.bold, text, TITLE_PT, MARGIN_MM, top + 10.0);
            }
            Element::CoverTable { info } => info_table(layer, fonts, top, info),
            Element::Heading { text } => {
                text_at(layer, &fonts.bold, text, HEADING_PT, MARGIN_MM, top + 8.0);
                hline(layer, MARGIN_MM, MARGIN_MM + USABLE_WIDTH_MM, top + 10.5);
            }
            Element::Note { text } => {
                text_at(layer, &fonts.regular, text, BODY_PT, MARGIN_MM, top + 5.0);
            }
            Element::DefectBlock { entry, number, info } => {
                let entry = self.report.visual_inspection.get(*entry).ok_or_else(|| {
                    ReportError::Render(format!("欠陥記録 {} が見つかりません", number))
                })?;
                self.defect_block(layer, fonts, top, *number, entry)?;
                info_table(layer, fonts, top + BLOCK_HEADER_MM + PHOTO_HEIGHT_MM + PHOTO_GAP_MM, info);
            }
            Element::EquipmentTable { panel } => {
                let items = self
                    .report
                    .equipment_inspection
                    .as_ref()
                    .map(|r| r.panel(*panel))
                    .unwrap_or(&[]);
                equipment_table(layer, fonts, top, *panel, items);
            }
        }
        Ok(())
    }

    fn defect_block(
        &self,
        layer: &PdfLayerReference,
        fonts: &Fonts,
        top: f32,
        number: usize,
        entry: &DefectEntry,
    ) -> Result<()> {
        // 見出し帯
        rect(layer, MARGIN_MM, top, USABLE_WIDTH_MM, BLOCK_HEADER_MM);
        text_at(
            layer,
            &fonts.bold,
            &format!("No. {}", number),
            BODY_PT,
            MARGIN_MM + 2.0,
            top + 5.0,
        );

        // 写真2枠
        let photo_top = top + BLOCK_HEADER_MM;
        for slot in 0..2 {
            let x = MARGIN_MM + slot as f32 * (PHOTO_WIDTH_MM + PHOTO_GAP_MM);
            rect(layer, x, photo_top, PHOTO_WIDTH_MM, PHOTO_HEIGHT_MM);
            match entry.images.get(slot) {
                Some(name) => {
                    let path = self.upload_dir.join(name);
                    place_photo(layer, &path, x, photo_top, PHOTO_WIDTH_MM, PHOTO_HEIGHT_MM)?;
                }
                None => text_at(
                    layer,
                    &fonts.regular,
                    "No photo",
                    BODY_PT,
                    x + PHOTO_WIDTH_MM / 2.0 - 7.0,
                    photo_top + PHOTO_HEIGHT_MM / 2.0,
                ),
            }
        }

        Ok(())
    }
}

/// 報告書全体を描画
pub fn render_pdf(
    report: &Report,
    plan: &DocumentPlan,
    upload_dir: &Path,
    font_path: Option<&Path>,
) -> Result<Vec<u8>> {
    PdfRenderer::new(report, upload_dir, font_path).render(plan)
}

/// ページ上端からのmmをPDF座標（下端基準）へ
fn y_from_top(top_mm: f32) -> Mm {
    Mm(A4_HEIGHT_MM - top_mm)
}

fn text_at(layer: &PdfLayerReference, font: &IndirectFontRef, text: &str, size: f32, x: f32, baseline_from_top: f32) {
    layer.use_text(text, size, Mm(x), y_from_top(baseline_from_top), font);
}

fn hline(layer: &PdfLayerReference, x1: f32, x2: f32, top: f32) {
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x1), y_from_top(top)), false),
            (Point::new(Mm(x2), y_from_top(top)), false),
        ],
        is_closed: false,
    });
}

fn rect(layer: &PdfLayerReference, x: f32, top: f32, width: f32, height: f32) {
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x), y_from_top(top)), false),
            (Point::new(Mm(x + width), y_from_top(top)), false),
            (Point::new(Mm(x + width), y_from_top(top + height)), false),
            (Point::new(Mm(x), y_from_top(top + height)), false),
        ],
        is_closed: true,
    });
}

/// ラベル列 + 値列の表（行の高さは割付時に決めた行数）
fn info_table(layer: &PdfLayerReference, fonts: &Fonts, top: f32, rows: &[InfoRow]) {
    let value_width = USABLE_WIDTH_MM - LABEL_WIDTH_MM;
    let mut y = top;

    for row in rows {
        let height = ROW_HEIGHT_MM * row.rows as f32;
        rect(layer, MARGIN_MM, y, LABEL_WIDTH_MM, height);
        rect(layer, MARGIN_MM + LABEL_WIDTH_MM, y, value_width, height);
        text_at(layer, &fonts.bold, row.label, BODY_PT, MARGIN_MM + 2.0, y + 5.0);

        for (i, line) in row.lines.iter().enumerate() {
            text_at(
                layer,
                &fonts.regular,
                line,
                BODY_PT,
                MARGIN_MM + LABEL_WIDTH_MM + 2.0,
                y + 5.0 + i as f32 * ROW_HEIGHT_MM,
            );
        }
        y += height;
    }
}

/// 箇所 × 項目の表。行は固定箇所リスト順
fn equipment_table(layer: &PdfLayerReference, fonts: &Fonts, top: f32, panel: PanelKind, items: &[PanelItem]) {
    text_at(layer, &fonts.bold, panel.title(), BODY_PT + 1.0, MARGIN_MM, top + 6.0);

    let columns: Vec<String> = items
        .iter()
        .flat_map(|item| item.fields.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let column_count = columns.len().max(1);
    let column_width = (USABLE_WIDTH_MM - LABEL_WIDTH_MM) / column_count as f32;
    let max_chars = chars_for_width(column_width - 2.0);

    let header_top = top + TABLE_TITLE_MM;
    rect(layer, MARGIN_MM, header_top, LABEL_WIDTH_MM, ROW_HEIGHT_MM);
    text_at(layer, &fonts.bold, "Location", BODY_PT, MARGIN_MM + 2.0, header_top + 5.0);
    for i in 0..column_count {
        let x = MARGIN_MM + LABEL_WIDTH_MM + i as f32 * column_width;
        rect(layer, x, header_top, column_width, ROW_HEIGHT_MM);
        let label = columns.get(i).map(String::as_str).unwrap_or("Result");
        text_at(layer, &fonts.bold, &truncate(label, max_chars), BODY_PT, x + 1.0, header_top + 5.0);
    }

    for (row, location) in panel.locations().iter().enumerate() {
        let y = header_top + ROW_HEIGHT_MM * (row as f32 + 1.0);
        rect(layer, MARGIN_MM, y, LABEL_WIDTH_MM, ROW_HEIGHT_MM);
        text_at(layer, &fonts.regular, location, BODY_PT, MARGIN_MM + 2.0, y + 5.0);

        let item = items.iter().find(|i| i.location == *location);
        for i in 0..column_count {
            let x = MARGIN_MM + LABEL_WIDTH_MM + i as f32 * column_width;
            rect(layer, x, y, column_width, ROW_HEIGHT_MM);
            let value = columns
                .get(i)
                .and_then(|key| item.and_then(|it| it.fields.get(key)))
                .map(FieldValue::to_string)
                .unwrap_or_else(|| "-".to_string());
            text_at(layer, &fonts.regular, &truncate(&value, max_chars), BODY_PT, x + 1.0, y + 5.0);
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// 写真を枠内に縦横比を保って中央配置
fn place_photo(layer: &PdfLayerReference, path: &Path, x: f32, top: f32, width: f32, height: f32) -> Result<()> {
    let render_err = |e: &dyn std::fmt::Display| ReportError::Render(format!("{}: {}", path.display(), e));

    let bytes = std::fs::read(path).map_err(|e| render_err(&e))?;
    let (px_w, px_h) = image::image_dimensions(path).map_err(|e| render_err(&e))?;
    if px_w == 0 || px_h == 0 {
        return Err(render_err(&"画像サイズが0です"));
    }
    let decoder = JpegDecoder::new(Cursor::new(bytes)).map_err(|e| render_err(&e))?;
    let image = Image::try_from(decoder).map_err(|e| render_err(&e))?;

    let natural_w = px_w as f32 * MM_PER_INCH / IMAGE_DPI;
    let natural_h = px_h as f32 * MM_PER_INCH / IMAGE_DPI;
    let scale = (width / natural_w).min(height / natural_h);
    let drawn_w = natural_w * scale;
    let drawn_h = natural_h * scale;

    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x + (width - drawn_w) / 2.0)),
            translate_y: Some(y_from_top(top + height - (height - drawn_h) / 2.0)),
            scale_x: Some(scale),
            scale_y: Some(scale),
            dpi: Some(IMAGE_DPI),
            ..Default::default()
        },
    );
    Ok(())
}
