//! 帧聚合器 (Frame Aggregator)
//! 职责: 检测列表 → 类别过滤 → 绘制指令 + 计数 → 累计统计

use crate::config::{AggregatorConfig, PixelPoint};
use crate::detection::types::{BBox, Detection};

use super::stats::RunStatistics;

/// 像素矩形 (已规范化、取整、非负)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl PixelRect {
    /// 规范化 → 四舍五入 → 截断到 ≥0
    pub fn from_bbox(bbox: &BBox) -> Self {
        let b = bbox.normalized();
        Self {
            x1: to_pixel(b.x1),
            y1: to_pixel(b.y1),
            x2: to_pixel(b.x2),
            y2: to_pixel(b.y2),
        }
    }
}

/// f32 坐标 → 像素
///
/// `round` 远离零取整, 每帧方向一致; NaN 和负数落到 0, 过大值饱和。
fn to_pixel(v: f32) -> u32 {
    v.round().max(0.0) as u32
}

/// 单个目标的绘制指令
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Annotation {
    pub track_id: u64,
    pub rect: PixelRect,
    /// "ID:<track_id>"
    pub label: String,
    /// 标签文字基线左端
    pub label_origin: PixelPoint,
}

/// 固定位置的计数标签
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountLabel {
    /// "<entity_label>: <matched_count>"
    pub text: String,
    pub anchor: PixelPoint,
}

/// 单帧聚合结果
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameSummary {
    pub frame_index: u64,
    pub matched_count: usize,
    pub annotations: Vec<Annotation>,
    pub count_label: CountLabel,
}

/// 帧聚合器: 无状态, 只持有配置
#[derive(Clone, Debug, Default)]
pub struct Aggregator {
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// 聚合一帧检测结果并更新统计
    ///
    /// 只统计目标类别且已有跟踪ID的检测; 未确认的检测不计数也不绘制。
    /// 无论是否有匹配, `stats` 都记录这一帧。
    pub fn aggregate(
        &self,
        detections: &[Detection],
        frame_index: u64,
        stats: &mut RunStatistics,
    ) -> FrameSummary {
        let annotations: Vec<Annotation> = detections
            .iter()
            .filter(|d| d.class_id == self.config.target_class_id)
            .filter_map(|d| d.track_id.map(|id| self.annotate(id, &d.bbox)))
            .collect();

        let matched_count = annotations.len();
        stats.record(matched_count);

        FrameSummary {
            frame_index,
            matched_count,
            annotations,
            count_label: CountLabel {
                text: format!("{}: {}", self.config.entity_label, matched_count),
                anchor: self.config.summary_anchor,
            },
        }
    }

    fn annotate(&self, track_id: u64, bbox: &BBox) -> Annotation {
        let rect = PixelRect::from_bbox(bbox);
        Annotation {
            track_id,
            rect,
            label: format!("ID:{}", track_id),
            label_origin: PixelPoint::new(
                rect.x1,
                rect.y1.saturating_sub(self.config.label_offset),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(x1: f32, y1: f32, x2: f32, y2: f32, id: Option<u64>) -> Detection {
        let d = Detection::new(0, BBox::new(x1, y1, x2, y2));
        match id {
            Some(id) => d.with_track_id(id),
            None => d,
        }
    }

    #[test]
    fn test_single_tracked_person() {
        let agg = Aggregator::default();
        let mut stats = RunStatistics::default();
        let s = agg.aggregate(&[person(10.0, 10.0, 50.0, 50.0, Some(7))], 0, &mut stats);

        assert_eq!(s.matched_count, 1);
        assert_eq!(s.annotations.len(), 1);
        let a = &s.annotations[0];
        assert_eq!(a.label, "ID:7");
        assert_eq!(a.rect, PixelRect { x1: 10, y1: 10, x2: 50, y2: 50 });
        assert_eq!(a.label_origin, PixelPoint::new(10, 0));
        assert_eq!(s.count_label.text, "Persons: 1");
        assert_eq!(s.count_label.anchor, PixelPoint::new(30, 30));
    }

    #[test]
    fn test_label_sits_offset_above_box() {
        let agg = Aggregator::default();
        let mut stats = RunStatistics::default();
        let s = agg.aggregate(&[person(12.0, 64.0, 40.0, 90.0, Some(1))], 0, &mut stats);
        assert_eq!(s.annotations[0].label_origin, PixelPoint::new(12, 54));
    }

    #[test]
    fn test_class_mismatch_excluded() {
        let agg = Aggregator::default();
        let mut stats = RunStatistics::default();
        let d = Detection::new(2, BBox::new(0.0, 0.0, 5.0, 5.0)).with_track_id(3);
        let s = agg.aggregate(&[d], 0, &mut stats);
        assert_eq!(s.matched_count, 0);
        assert!(s.annotations.is_empty());
        assert_eq!(s.count_label.text, "Persons: 0");
    }

    #[test]
    fn test_untracked_detection_excluded() {
        let agg = Aggregator::default();
        let mut stats = RunStatistics::default();
        let d = Detection {
            confidence: Some(0.99),
            ..person(20.0, 20.0, 40.0, 40.0, None)
        };
        let s = agg.aggregate(&[d], 0, &mut stats);
        assert_eq!(s.matched_count, 0);
        assert!(s.annotations.is_empty());
        assert_eq!(stats.frames_processed, 1);
    }

    #[test]
    fn test_count_matches_filtered_tracked_detections() {
        let agg = Aggregator::new(AggregatorConfig {
            target_class_id: 2,
            entity_label: "Cars".into(),
            ..Default::default()
        });
        let detections = vec![
            Detection::new(2, BBox::new(0.0, 0.0, 1.0, 1.0)).with_track_id(1),
            Detection::new(2, BBox::new(0.0, 0.0, 1.0, 1.0)),
            Detection::new(0, BBox::new(0.0, 0.0, 1.0, 1.0)).with_track_id(2),
            Detection::new(2, BBox::new(5.0, 5.0, 9.0, 9.0)).with_track_id(4),
            Detection::new(7, BBox::new(0.0, 0.0, 1.0, 1.0)),
        ];
        let expected = detections
            .iter()
            .filter(|d| d.class_id == 2 && d.track_id.is_some())
            .count();
        let mut stats = RunStatistics::default();
        let s = agg.aggregate(&detections, 3, &mut stats);
        assert_eq!(s.matched_count, expected);
        assert_eq!(s.annotations.len(), s.matched_count);
        assert_eq!(s.frame_index, 3);
        assert_eq!(s.count_label.text, "Cars: 2");
        let ids: Vec<u64> = s.annotations.iter().map(|a| a.track_id).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn test_inverted_box_normalized() {
        let agg = Aggregator::default();
        let mut stats = RunStatistics::default();
        let s = agg.aggregate(&[person(50.0, 10.0, 10.0, 40.0, Some(5))], 0, &mut stats);
        assert_eq!(s.annotations[0].rect, PixelRect { x1: 10, y1: 10, x2: 50, y2: 40 });
        assert_eq!(s.annotations[0].label_origin, PixelPoint::new(10, 0));
    }

    #[test]
    fn test_rounding_and_clamping() {
        let agg = Aggregator::default();
        let mut stats = RunStatistics::default();
        let s = agg.aggregate(
            &[person(-3.2, 10.5, 20.49, f32::NAN, Some(1))],
            0,
            &mut stats,
        );
        let r = s.annotations[0].rect;
        assert_eq!(r.x1, 0);
        assert_eq!(r.x2, 20);
        // NaN 参与 min/max 时取另一侧的值
        assert_eq!(r.y1, 11);
        assert_eq!(r.y2, 11);
    }

    #[test]
    fn test_empty_frame_still_counted() {
        let agg = Aggregator::default();
        let mut stats = RunStatistics::default();
        let s = agg.aggregate(&[], 0, &mut stats);
        assert_eq!(s.matched_count, 0);
        assert!(s.annotations.is_empty());
        assert_eq!(stats.frames_processed, 1);
        assert_eq!(stats.max_matched_count, 0);
    }

    #[test]
    fn test_duplicate_track_ids_not_deduplicated() {
        let agg = Aggregator::default();
        let mut stats = RunStatistics::default();
        let s = agg.aggregate(
            &[
                person(0.0, 0.0, 5.0, 5.0, Some(1)),
                person(9.0, 9.0, 15.0, 15.0, Some(1)),
            ],
            0,
            &mut stats,
        );
        assert_eq!(s.matched_count, 2);
    }
}
