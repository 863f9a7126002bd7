/// 输出系统 (Frame sinks)
///
/// - ImageSequenceSink: 逐帧写出 PNG
/// - NullSink:          丢弃 (只要统计)
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::RgbImage;

/// 帧输出 Trait
pub trait FrameSink: Send {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// 写出剩余数据
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// 逐帧写出 `frame_000000.png`
pub struct ImageSequenceSink {
    dir: PathBuf,
    written: u64,
}

impl ImageSequenceSink {
    pub fn create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("无法创建输出目录 {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: 0,
        })
    }
}

impl FrameSink for ImageSequenceSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let path = self.dir.join(format!("frame_{:06}.png", self.written));
        frame
            .save(&path)
            .with_context(|| format!("写帧失败 {}", path.display()))?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        log::info!("💾 已写出 {} 帧到 {}", self.written, self.dir.display());
        Ok(())
    }
}

#[derive(Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn write_frame(&mut self, _frame: &RgbImage) -> Result<()> {
        Ok(())
    }
}

/// 批处理输出名: `tracked_<输入文件名>`
pub fn tracked_name(input: &Path) -> String {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    format!("tracked_{}", name)
}
