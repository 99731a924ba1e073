use font8x8::{BASIC_FONTS, UnicodeFonts};
use glam::Vec3;

use super::Frame;
use crate::scene::TextLabel;

const GLYPH_SIZE: i64 = 8;
/// Glyph rows plus two rows of leading.
const LINE_HEIGHT: i64 = 10;

fn glyph(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

/// Integer pixel scale of the 8x8 bitmap font for a font size in points.
pub(super) fn glyph_scale(font_size: f32) -> i64 {
    ((font_size / GLYPH_SIZE as f32).round() as i64).max(1)
}

/// Draws a label with the bottom-left of its text block at the label's
/// normalized position. Extra lines stack upward from the anchor.
pub(super) fn draw_label(frame: &mut Frame, label: &TextLabel, resolution: f32) {
    let scale = glyph_scale(label.font_size as f32 * resolution);
    let lines: Vec<&str> = label.text.lines().collect();
    let (x, y) = label.position;
    let left = (x * frame.width() as f32).round() as i64;
    let bottom = ((1.0 - y) * frame.height() as f32).round() as i64;
    let top = bottom - lines.len() as i64 * LINE_HEIGHT * scale;
    let color = Vec3::from(label.color);

    for (row, line) in lines.iter().enumerate() {
        let baseline_top = top + (row as i64 * LINE_HEIGHT + (LINE_HEIGHT - GLYPH_SIZE)) * scale;
        for (column, ch) in line.chars().enumerate() {
            let origin = (left + column as i64 * GLYPH_SIZE * scale, baseline_top);
            draw_glyph(frame, glyph(ch), origin, scale, color, label.bold);
        }
    }
}

fn draw_glyph(
    frame: &mut Frame,
    bitmap: [u8; 8],
    (x, y): (i64, i64),
    scale: i64,
    color: Vec3,
    bold: bool,
) {
    let weight = if bold { scale + 1 } else { scale };
    for (row, bits) in bitmap.iter().enumerate() {
        for bit in 0..8 {
            if bits & (1 << bit) == 0 {
                continue;
            }
            let px = x + bit as i64 * scale;
            let py = y + row as i64 * scale;
            for dy in 0..scale {
                for dx in 0..weight {
                    frame.blend(px + dx, py + dy, color, 1.0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::make_label;

    fn lit_rows(frame: &Frame) -> Vec<u32> {
        (0..frame.height())
            .filter(|&y| (0..frame.width()).any(|x| frame.pixel(x, y) != Vec3::ZERO))
            .collect()
    }

    #[test]
    fn scale_follows_font_size() {
        assert_eq!(glyph_scale(4.0), 1);
        assert_eq!(glyph_scale(14.0), 2);
        assert_eq!(glyph_scale(20.0), 3);
    }

    #[test]
    fn unknown_characters_fall_back() {
        assert_eq!(glyph('\u{2603}'), glyph('?'));
        assert_eq!(glyph(' '), [0; 8]);
    }

    #[test]
    fn label_sits_above_anchor() {
        let mut frame = Frame::new(200, 100, [0.0; 3]);
        draw_label(&mut frame, &make_label("Hi", 0.1, 0.2, 8), 1.0);
        let rows = lit_rows(&frame);
        assert!(!rows.is_empty());
        // anchor row is 80; a single 8 px glyph fits between 70 and 80
        assert!(rows.iter().all(|&y| (70..80).contains(&y)), "{rows:?}");
        let first_x = (0..frame.width())
            .find(|&x| (0..frame.height()).any(|y| frame.pixel(x, y) != Vec3::ZERO));
        assert!(first_x.is_some_and(|x| x >= 20));
    }

    #[test]
    fn extra_lines_stack_upward() {
        let mut one = Frame::new(200, 100, [0.0; 3]);
        let mut two = Frame::new(200, 100, [0.0; 3]);
        draw_label(&mut one, &make_label("A", 0.0, 0.2, 8), 1.0);
        draw_label(&mut two, &make_label("A\nA", 0.0, 0.2, 8), 1.0);
        let (rows_one, rows_two) = (lit_rows(&one), lit_rows(&two));
        assert_eq!(rows_one.last(), rows_two.last());
        assert!(rows_two.first() < rows_one.first());
    }

    #[test]
    fn labels_clip_at_frame_edges() {
        let mut frame = Frame::new(20, 20, [0.0; 3]);
        draw_label(&mut frame, &make_label("clipped text", 0.9, 0.99, 20), 1.0);
        assert_eq!(frame.width(), 20);
    }
}
