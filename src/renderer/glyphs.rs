//! 内置 5x7 点阵字体 (未配置字体文件时使用)

use image::{Rgb, RgbImage};

pub const GLYPH_WIDTH: u32 = 5;
pub const GLYPH_HEIGHT: u32 = 7;
/// 字间距 (点阵单位)
const GLYPH_SPACING: u32 = 1;
/// 放大倍数上限
const MAX_SCALE: u32 = 64;

/// 字号 (像素) → 点阵放大倍数, 限制在 [1, MAX_SCALE]
pub fn scale_for_px(px: f32) -> u32 {
    ((px / 10.0).round() as u32).clamp(1, MAX_SCALE)
}

/// 文本尺寸 (宽, 高)
pub fn text_size(text: &str, scale: u32) -> (u32, u32) {
    let chars = text.chars().count() as u32;
    if chars == 0 {
        return (0, 0);
    }
    let width = chars
        .saturating_mul(GLYPH_WIDTH + GLYPH_SPACING)
        .saturating_sub(GLYPH_SPACING)
        .saturating_mul(scale);
    (width, GLYPH_HEIGHT.saturating_mul(scale))
}

/// 在 (x, y) 处绘制文本, (x, y) 为左上角; 超出画面的部分裁掉
pub fn draw_text(img: &mut RgbImage, text: &str, x: i32, y: i32, scale: u32, color: Rgb<u8>) {
    let scale = scale.clamp(1, MAX_SCALE) as i32;
    let step = (GLYPH_WIDTH + GLYPH_SPACING) as i32 * scale;
    for (i, ch) in text.chars().enumerate() {
        let char_x = x.saturating_add((i as i32).saturating_mul(step));
        if char_x >= img.width() as i32 {
            break;
        }
        let pattern = glyph(ch.to_ascii_uppercase());
        for (row, &bits) in pattern.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 1 {
                    fill_block(
                        img,
                        char_x + col as i32 * scale,
                        y.saturating_add(row as i32 * scale),
                        scale,
                        color,
                    );
                }
            }
        }
    }
}

/// 填充 size x size 方块, 只遍历画面内的部分
fn fill_block(img: &mut RgbImage, x: i32, y: i32, size: i32, color: Rgb<u8>) {
    let (w, h) = (img.width() as i64, img.height() as i64);
    let (x, y, size) = (x as i64, y as i64, size as i64);
    for py in y.max(0)..(y + size).min(h) {
        for px in x.max(0)..(x + size).min(w) {
            img.put_pixel(px as u32, py as u32, color);
        }
    }
}

#[rustfmt::skip]
fn glyph(ch: char) -> [u8; 7] {
    match ch {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b11011, 0b10001],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        ':' => [0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        '_' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b11111],
        '#' => [0b01010, 0b01010, 0b11111, 0b01010, 0b11111, 0b01010, 0b01010],
        ' ' => [0; 7],
        _ => [0b11111, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11111],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_size() {
        assert_eq!(text_size("", 2), (0, 0));
        assert_eq!(text_size("ID:7", 1), (23, 7));
        assert_eq!(text_size("ID:7", 2), (46, 14));
    }

    #[test]
    fn test_scale_for_px() {
        assert_eq!(scale_for_px(18.0), 2);
        assert_eq!(scale_for_px(30.0), 3);
        assert_eq!(scale_for_px(2.0), 1);
        assert_eq!(scale_for_px(1e12), MAX_SCALE);
        assert_eq!(scale_for_px(f32::NAN), 1);
    }

    #[test]
    fn test_draw_clips_at_border() {
        let mut img = RgbImage::new(6, 6);
        draw_text(&mut img, "8", -2, -3, 1, Rgb([255, 0, 0]));
        draw_text(&mut img, "8", 4, 4, 3, Rgb([255, 0, 0]));
        assert!(img.pixels().any(|p| p.0 == [255, 0, 0]));
    }

    #[test]
    fn test_oversized_scale_is_clamped() {
        let mut img = RgbImage::new(16, 16);
        draw_text(&mut img, "PERSONS: 12", 2, 2, u32::MAX, Rgb([255, 0, 0]));
        assert!(img.pixels().any(|p| p.0 == [255, 0, 0]));
        assert_eq!(text_size("AB", u32::MAX).1, u32::MAX);
    }

    #[test]
    fn test_space_draws_nothing() {
        let mut img = RgbImage::new(10, 10);
        draw_text(&mut img, " ", 0, 0, 1, Rgb([255, 255, 255]));
        assert!(img.pixels().all(|p| p.0 == [0, 0, 0]));
    }
}
