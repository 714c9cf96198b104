//! 7セグメント数字の描画（フォントファイル不要）

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

const SEG_A: u8 = 1 << 0; // 上
const SEG_B: u8 = 1 << 1; // 右上
const SEG_C: u8 = 1 << 2; // 右下
const SEG_D: u8 = 1 << 3; // 下
const SEG_E: u8 = 1 << 4; // 左下
const SEG_F: u8 = 1 << 5; // 左上
const SEG_G: u8 = 1 << 6; // 中央

const DIGITS: [u8; 10] = [
    SEG_A | SEG_B | SEG_C | SEG_D | SEG_E | SEG_F,
    SEG_B | SEG_C,
    SEG_A | SEG_B | SEG_G | SEG_E | SEG_D,
    SEG_A | SEG_B | SEG_G | SEG_C | SEG_D,
    SEG_F | SEG_G | SEG_B | SEG_C,
    SEG_A | SEG_F | SEG_G | SEG_C | SEG_D,
    SEG_A | SEG_F | SEG_G | SEG_E | SEG_D | SEG_C,
    SEG_A | SEG_B | SEG_C,
    SEG_A | SEG_B | SEG_C | SEG_D | SEG_E | SEG_F | SEG_G,
    SEG_A | SEG_B | SEG_C | SEG_D | SEG_F | SEG_G,
];

/// 数字1文字の寸法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct GlyphMetrics {
    pub width: u32,
    pub height: u32,
    pub stroke: u32,
    pub spacing: u32,
}

impl GlyphMetrics {
    /// 文字高さから幅・線幅・字間を決める
    pub fn for_height(height: u32) -> Self {
        let height = height.max(5);
        Self {
            width: ((height as f32) * 0.55).round().max(3.0) as u32,
            height,
            stroke: (height / 8).max(1),
            spacing: (height / 6).max(1),
        }
    }

    /// 文字列全体の幅
    pub fn text_width(&self, chars: usize) -> u32 {
        if chars == 0 {
            return 0;
        }
        self.width * chars as u32 + self.spacing * (chars as u32 - 1)
    }
}

/// 数字列を透明キャンバスに描いて返す（数字以外は無視）
pub(super) fn render_digits(text: &str, metrics: GlyphMetrics, color: Rgba<u8>) -> RgbaImage {
    let digits: Vec<u8> = text
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| DIGITS[d as usize])
        .collect();

    let width = metrics.text_width(digits.len()).max(1);
    let mut canvas = RgbaImage::from_pixel(width, metrics.height, Rgba([0, 0, 0, 0]));

    for (i, segments) in digits.iter().enumerate() {
        let x = (i as u32 * (metrics.width + metrics.spacing)) as i32;
        draw_glyph(&mut canvas, x, *segments, metrics, color);
    }
    canvas
}

fn draw_glyph(canvas: &mut RgbaImage, x: i32, segments: u8, m: GlyphMetrics, color: Rgba<u8>) {
    let w = m.width;
    let h = m.height;
    let t = m.stroke;
    let half = h / 2;
    let mid_y = half.saturating_sub(t / 2) as i32;
    let right = x + (w - t) as i32;

    let rects = [
        (SEG_A, Rect::at(x, 0).of_size(w, t)),
        (SEG_B, Rect::at(right, 0).of_size(t, half.max(1))),
        (SEG_C, Rect::at(right, half as i32).of_size(t, (h - half).max(1))),
        (SEG_D, Rect::at(x, (h - t) as i32).of_size(w, t)),
        (SEG_E, Rect::at(x, half as i32).of_size(t, (h - half).max(1))),
        (SEG_F, Rect::at(x, 0).of_size(t, half.max(1))),
        (SEG_G, Rect::at(x, mid_y).of_size(w, t)),
    ];

    for (bit, rect) in rects {
        if segments & bit != 0 {
            draw_filled_rect_mut(canvas, rect, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 153]);

    fn painted(img: &RgbaImage) -> usize {
        img.pixels().filter(|p| p[3] > 0).count()
    }

    #[test]
    fn test_metrics_scale_with_height() {
        let m = GlyphMetrics::for_height(120);
        assert_eq!(m.height, 120);
        assert_eq!(m.width, 66);
        assert_eq!(m.stroke, 15);
        assert_eq!(m.text_width(2), 66 * 2 + 20);
    }

    #[test]
    fn test_eight_paints_more_than_one() {
        let m = GlyphMetrics::for_height(80);
        let one = render_digits("1", m, WHITE);
        let eight = render_digits("8", m, WHITE);
        assert!(painted(&eight) > painted(&one));
        assert!(painted(&one) > 0);
    }

    #[test]
    fn test_canvas_width_follows_digit_count() {
        let m = GlyphMetrics::for_height(60);
        let img = render_digits("123", m, WHITE);
        assert_eq!(img.width(), m.text_width(3));
        assert_eq!(img.height(), 60);
    }

    #[test]
    fn test_non_digits_ignored() {
        let m = GlyphMetrics::for_height(60);
        let img = render_digits("a-b", m, WHITE);
        assert_eq!(painted(&img), 0);
    }
}
