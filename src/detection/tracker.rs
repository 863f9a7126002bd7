//! 跟踪会话 (Tracker session)
//!
//! 检测与多目标关联由外部模型完成; 这里只定义每帧取结果的接口。
//! 调用方为每个视频持有一个会话, 保证跟踪ID跨帧稳定。

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use image::RgbImage;

use super::types::{Detection, FrameDetections};

// ========== 跟踪器统一接口 ==========

/// 检测器+跟踪器会话 Trait
pub trait TrackerSession: Send {
    /// 会话名称 (日志用)
    fn name(&self) -> &str;

    /// 获取一帧的检测结果
    ///
    /// # 参数
    /// - `frame_index`: 帧序号 (从0开始)
    /// - `frame`: 当前帧像素 (RGB)
    fn track(&mut self, frame_index: u64, frame: &RgbImage) -> Result<Vec<Detection>>;
}

// ========== 回放会话 ==========

/// 回放外部跟踪器导出的 JSON Lines 结果
///
/// 每行一个 [`FrameDetections`]。空行跳过, 重复帧号的检测合并,
/// 文件中不存在的帧返回空列表。
pub struct ReplaySession {
    name: String,
    frames: BTreeMap<u64, Vec<Detection>>,
}

impl ReplaySession {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("无法打开检测文件 {}", path.display()))?;
        let mut session = Self::from_reader(BufReader::new(file))
            .with_context(|| format!("检测文件解析失败 {}", path.display()))?;
        session.name = format!("replay:{}", path.display());
        Ok(session)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut frames: BTreeMap<u64, Vec<Detection>> = BTreeMap::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("第{}行读取失败", line_no + 1))?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: FrameDetections = serde_json::from_str(&line)
                .with_context(|| format!("第{}行格式错误", line_no + 1))?;
            frames
                .entry(entry.frame)
                .or_default()
                .extend(entry.detections);
        }
        Ok(Self {
            name: "replay".to_string(),
            frames,
        })
    }

    /// 文件中出现过的帧数
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl TrackerSession for ReplaySession {
    fn name(&self) -> &str {
        &self.name
    }

    fn track(&mut self, frame_index: u64, _frame: &RgbImage) -> Result<Vec<Detection>> {
        Ok(self.frames.get(&frame_index).cloned().unwrap_or_default())
    }
}

/// 空会话: 每帧都没有检测 (只绘制计数)
#[derive(Default)]
pub struct EmptySession;

impl TrackerSession for EmptySession {
    fn name(&self) -> &str {
        "empty"
    }

    fn track(&mut self, _frame_index: u64, _frame: &RgbImage) -> Result<Vec<Detection>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::types::BBox;

    const LINES: &str = r#"{"frame":0,"detections":[{"class_id":0,"bbox":[10,10,50,50],"track_id":7}]}

{"frame":2,"detections":[{"class_id":0,"bbox":[1,1,2,2]},{"class_id":2,"bbox":[0,0,5,5],"track_id":3}]}
{"frame":2,"detections":[{"class_id":0,"bbox":[20,20,40,40],"track_id":9}]}
"#;

    #[test]
    fn test_replay_returns_frame_detections() {
        let mut session = ReplaySession::from_reader(LINES.as_bytes()).unwrap();
        let frame = RgbImage::new(4, 4);
        assert_eq!(session.frame_count(), 2);

        let f0 = session.track(0, &frame).unwrap();
        assert_eq!(f0.len(), 1);
        assert_eq!(f0[0].track_id, Some(7));
        assert_eq!(f0[0].bbox, BBox::new(10.0, 10.0, 50.0, 50.0));

        assert!(session.track(1, &frame).unwrap().is_empty());

        let f2 = session.track(2, &frame).unwrap();
        assert_eq!(f2.len(), 3);
        assert_eq!(f2[2].track_id, Some(9));

        assert!(session.track(99, &frame).unwrap().is_empty());
    }

    #[test]
    fn test_replay_reports_bad_line() {
        let err = ReplaySession::from_reader("{\"frame\":0}\nnot json\n".as_bytes())
            .err()
            .unwrap();
        assert!(format!("{:#}", err).contains("第2行"));
    }

    #[test]
    fn test_empty_session() {
        let mut session = EmptySession;
        assert!(session.track(0, &RgbImage::new(1, 1)).unwrap().is_empty());
        assert_eq!(session.name(), "empty");
    }
}
