/// 检测系统数据结构定义
/// Data structures shared by the tracker session and the aggregator
use serde::{Deserialize, Serialize};

// ========== 公共常量 ==========

/// COCO 类别: 0=person
pub const PERSON_CLASS_ID: u32 = 0;

// ========== 数据结构 ==========

/// 检测框 (x1,y1 左上 / x2,y2 右下, 像素坐标)
///
/// 序列化为 `[x1, y1, x2, y2]`。外部跟踪器给出的框可能是反的,
/// 使用前调用 [`BBox::normalized`]。
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// 交换坐标使 x1≤x2, y1≤y2 (已规范的框保持不变)
    pub fn normalized(&self) -> Self {
        Self {
            x1: self.x1.min(self.x2),
            y1: self.y1.min(self.y2),
            x2: self.x1.max(self.x2),
            y2: self.y1.max(self.y2),
        }
    }
}

impl From<[f32; 4]> for BBox {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [f32; 4] {
    fn from(b: BBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// 单帧中的一个目标 (检测器+跟踪器输出)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: u32,
    pub bbox: BBox,
    /// 置信度 [0,1], 部分跟踪器不输出
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// 跟踪ID, 跟踪器确认关联前为空
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<u64>,
}

impl Detection {
    pub fn new(class_id: u32, bbox: BBox) -> Self {
        Self {
            class_id,
            bbox,
            confidence: None,
            track_id: None,
        }
    }

    pub fn with_track_id(mut self, track_id: u64) -> Self {
        self.track_id = Some(track_id);
        self
    }
}

/// 一帧的跟踪结果 (JSON Lines 中的一行)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameDetections {
    pub frame: u64,
    #[serde(default)]
    pub detections: Vec<Detection>,
}
