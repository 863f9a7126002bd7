/// 视频输入系统 (Video Input System)
///
/// - ImageSequenceSource: 图片序列目录 (PNG/JPEG)
/// - SyntheticSource:     空白帧 (测试/试运行)
/// - yuv:                 YUV420P 平面与 RGB 互转
/// - decoder:             视频文件解码 + 标注 + 编码 (ffmpeg 特性)
pub mod sequence;
pub mod yuv;

#[cfg(feature = "ffmpeg")]
pub mod decode_filter;
#[cfg(feature = "ffmpeg")]
pub mod decoder;

pub use sequence::{ImageSequenceSource, SyntheticSource};

use anyhow::Result;
use image::RgbImage;
use serde::Serialize;

/// 视频元数据
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// 总帧数 (未知时为空)
    pub total_frames: Option<u64>,
}

impl VideoInfo {
    /// 时长 (秒) = 总帧数 / 帧率
    pub fn duration_secs(&self) -> Option<f64> {
        match self.total_frames {
            Some(total) if self.fps > 0.0 => Some(total as f64 / self.fps),
            _ => None,
        }
    }

    /// "1280x720"
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// 帧来源 Trait
pub trait FrameSource: Send {
    fn info(&self) -> &VideoInfo;

    /// 读取下一帧, 结束时返回 `None`
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}
