//! 运行统计 (Run statistics)

use serde::Serialize;

use crate::input::VideoInfo;

/// 跨帧累计统计, 单一写入者
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunStatistics {
    pub frames_processed: u64,
    pub max_matched_count: usize,
    pub sum_matched_count: u64,
}

impl RunStatistics {
    /// 记录一帧 (每帧恰好调用一次)
    pub fn record(&mut self, matched_count: usize) {
        self.frames_processed += 1;
        self.sum_matched_count += matched_count as u64;
        self.max_matched_count = self.max_matched_count.max(matched_count);
    }

    /// 平均计数; 没有帧时为 0
    pub fn average_matched_count(&self) -> f64 {
        if self.frames_processed == 0 {
            return 0.0;
        }
        self.sum_matched_count as f64 / self.frames_processed as f64
    }

    pub fn report(&self, entity_label: &str) -> RunReport {
        RunReport {
            entity_label: entity_label.to_string(),
            total_frames: self.frames_processed,
            max_count: self.max_matched_count,
            avg_count: self.average_matched_count(),
        }
    }
}

/// 结束时的统计报告
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunReport {
    pub entity_label: String,
    pub total_frames: u64,
    pub max_count: usize,
    pub avg_count: f64,
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Total Frames: {} | Max {}: {} | Avg {}: {:.2}",
            self.total_frames, self.entity_label, self.max_count, self.entity_label, self.avg_count
        )
    }
}

/// 演示程序的处理报告
#[derive(Clone, Debug, Serialize)]
pub struct ProcessingReport {
    pub source: String,
    pub video: VideoInfo,
    pub stats: RunReport,
    pub processing_secs: f64,
    /// 处理完成时间 (RFC 3339)
    pub generated_at: String,
    /// 运行是否完整结束 (取消或出错时为 false)
    pub completed: bool,
}

impl ProcessingReport {
    pub fn new(
        source: impl Into<String>,
        video: VideoInfo,
        stats: RunReport,
        processing_secs: f64,
        completed: bool,
    ) -> Self {
        Self {
            source: source.into(),
            video,
            stats,
            processing_secs,
            generated_at: chrono::Local::now().to_rfc3339(),
            completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_frame_run() {
        let mut stats = RunStatistics::default();
        for n in [2, 5, 3] {
            stats.record(n);
        }
        assert_eq!(stats.frames_processed, 3);
        assert_eq!(stats.max_matched_count, 5);
        assert_eq!(stats.sum_matched_count, 10);
        assert!((stats.average_matched_count() - 10.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_frames_average_is_zero() {
        let stats = RunStatistics::default();
        assert_eq!(stats.average_matched_count(), 0.0);
        let report = stats.report("Persons");
        assert_eq!(report.total_frames, 0);
        assert_eq!(report.avg_count, 0.0);
    }

    #[test]
    fn test_zero_count_frames_still_recorded() {
        let mut stats = RunStatistics::default();
        stats.record(0);
        stats.record(0);
        assert_eq!(stats.frames_processed, 2);
        assert_eq!(stats.max_matched_count, 0);
    }

    #[test]
    fn test_report_display() {
        let mut stats = RunStatistics::default();
        for n in [2, 5, 3] {
            stats.record(n);
        }
        assert_eq!(
            stats.report("Persons").to_string(),
            "Total Frames: 3 | Max Persons: 5 | Avg Persons: 3.33"
        );
    }
}
