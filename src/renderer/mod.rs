//! 标注绘制 (Annotator)
//!
//! 按 FrameSummary 在 RGB 帧上画框和文字。
//! 文字原点是基线左端 (与 OpenCV putText 相同), 绘制时换算为左上角。

pub mod glyphs;

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use anyhow::{anyhow, Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::config::{AnnotationStyle, PipelineConfig, PixelPoint};
use crate::pipeline::aggregator::{FrameSummary, PixelRect};

pub struct Annotator {
    style: AnnotationStyle,
    font: Option<FontVec>,
}

impl Annotator {
    /// 使用内置点阵字体
    pub fn new(style: AnnotationStyle) -> Self {
        Self { style, font: None }
    }

    /// 加载 TrueType/OpenType 字体
    pub fn with_font_file(style: AnnotationStyle, path: &Path) -> Result<Self> {
        let data =
            std::fs::read(path).with_context(|| format!("无法读取字体 {}", path.display()))?;
        let font = FontVec::try_from_vec(data)
            .map_err(|e| anyhow!("字体解析失败 {}: {}", path.display(), e))?;
        log::info!("✅ 字体加载成功: {}", path.display());
        Ok(Self {
            style,
            font: Some(font),
        })
    }

    pub fn from_config(cfg: &PipelineConfig) -> Result<Self> {
        match &cfg.font_path {
            Some(path) => Self::with_font_file(cfg.style.clone(), path),
            None => Ok(Self::new(cfg.style.clone())),
        }
    }

    /// 绘制一帧的全部标注
    pub fn draw(&self, img: &mut RgbImage, summary: &FrameSummary) {
        for a in &summary.annotations {
            self.draw_box(img, &a.rect);
            self.draw_label(
                img,
                &a.label,
                a.label_origin,
                self.style.label_px,
                self.style.label_color,
            );
        }

        let count = &summary.count_label;
        self.draw_label(
            img,
            &count.text,
            count.anchor,
            self.style.summary_px,
            self.style.summary_color,
        );
    }

    /// 粗线框: 向外逐像素扩展
    fn draw_box(&self, img: &mut RgbImage, rect: &PixelRect) {
        let color = Rgb(self.style.box_color);
        // 先裁到画面附近, 避免超大坐标在 Rect 内部溢出
        let (img_w, img_h) = img.dimensions();
        let x1 = rect.x1.min(img_w);
        let y1 = rect.y1.min(img_h);
        let x = x1 as i32;
        let y = y1 as i32;
        let w = rect.x2.min(img_w) - x1 + 1;
        let h = rect.y2.min(img_h) - y1 + 1;
        for offset in 0..self.style.thickness {
            let r = Rect::at(x - offset as i32, y - offset as i32)
                .of_size(w + offset * 2, h + offset * 2);
            draw_hollow_rect_mut(img, r, color);
        }
    }

    fn draw_label(
        &self,
        img: &mut RgbImage,
        text: &str,
        origin: PixelPoint,
        px: f32,
        color: [u8; 3],
    ) {
        let color = Rgb(color);
        let origin = PixelPoint::new(origin.x.min(img.width()), origin.y.min(img.height()));
        match &self.font {
            Some(font) => {
                let scale = PxScale::from(px);
                let (_, h) = text_size(scale, font, text);
                let top = (origin.y as i32 - h as i32).max(0);
                draw_text_mut(img, color, origin.x as i32, top, scale, font, text);
            }
            None => {
                let scale = glyphs::scale_for_px(px);
                let (_, h) = glyphs::text_size(text, scale);
                let top = (origin.y as i32 - h as i32).max(0);
                glyphs::draw_text(img, text, origin.x as i32, top, scale, color);
            }
        }
    }
}
