/// 检测系统 (Detection System)
///
/// 目标检测和多目标关联由外部模型完成, 这里只消费其结果
/// - types:   检测框 / 单帧检测
/// - tracker: 跟踪会话接口与回放实现
pub mod tracker;
pub mod types;

pub use tracker::{EmptySession, ReplaySession, TrackerSession};
pub use types::{BBox, Detection, FrameDetections, PERSON_CLASS_ID};
