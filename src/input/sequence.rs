//! 图片序列输入 (Image sequence input)

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::RgbImage;

use super::{FrameSource, VideoInfo};

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// 图片序列: 目录中的 PNG/JPEG 按文件名排序
pub struct ImageSequenceSource {
    frames: Vec<PathBuf>,
    next: usize,
    info: VideoInfo,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path, fps: f64) -> Result<Self> {
        let frames = list_frames(dir)?;
        let first = frames
            .first()
            .ok_or_else(|| anyhow!("目录中没有图片帧: {}", dir.display()))?;
        let (width, height) = image::image_dimensions(first)
            .with_context(|| format!("无法读取帧尺寸 {}", first.display()))?;

        log::info!(
            "📂 图片序列: {} ({}帧, {}x{}, {:.2}fps)",
            dir.display(),
            frames.len(),
            width,
            height,
            fps
        );

        Ok(Self {
            info: VideoInfo {
                width,
                height,
                fps,
                total_frames: Some(frames.len() as u64),
            },
            frames,
            next: 0,
        })
    }
}

impl FrameSource for ImageSequenceSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(path) = self.frames.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;

        let frame = image::open(path)
            .with_context(|| format!("无法解码帧 {}", path.display()))?
            .into_rgb8();
        if frame.dimensions() != (self.info.width, self.info.height) {
            return Err(anyhow!(
                "帧尺寸不一致 {}: {}x{} (期望 {})",
                path.display(),
                frame.width(),
                frame.height(),
                self.info.resolution()
            ));
        }
        Ok(Some(frame))
    }
}

/// 目录中可作为帧的文件 (按文件名排序)
pub fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("无法读取目录 {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && has_frame_extension(&path) {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}

fn has_frame_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// 空白帧来源 (测试/试运行)
pub struct SyntheticSource {
    remaining: u64,
    info: VideoInfo,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, frames: u64, fps: f64) -> Self {
        Self {
            remaining: frames,
            info: VideoInfo {
                width,
                height,
                fps,
                total_frames: Some(frames),
            },
        }
    }
}

impl FrameSource for SyntheticSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        Ok(Some(RgbImage::new(self.info.width, self.info.height)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_order_and_size() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.png", "c.jpg"] {
            RgbImage::new(8, 6).save(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "skip").unwrap();

        let mut src = ImageSequenceSource::open(dir.path(), 10.0).unwrap();
        assert_eq!(src.info().total_frames, Some(3));
        assert_eq!(src.info().resolution(), "8x6");

        let mut count = 0;
        while let Some(frame) = src.next_frame().unwrap() {
            assert_eq!(frame.dimensions(), (8, 6));
            count += 1;
        }
        assert_eq!(count, 3);
        assert!(src.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_sequence_rejects_mismatched_frame() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::new(8, 6).save(dir.path().join("0.png")).unwrap();
        RgbImage::new(4, 4).save(dir.path().join("1.png")).unwrap();

        let mut src = ImageSequenceSource::open(dir.path(), 30.0).unwrap();
        assert!(src.next_frame().unwrap().is_some());
        assert!(src.next_frame().is_err());
    }

    #[test]
    fn test_empty_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageSequenceSource::open(dir.path(), 30.0).is_err());
    }

    #[test]
    fn test_synthetic_source() {
        let mut src = SyntheticSource::new(4, 2, 2, 30.0);
        assert!(src.next_frame().unwrap().is_some());
        assert!(src.next_frame().unwrap().is_some());
        assert!(src.next_frame().unwrap().is_none());
    }
}
