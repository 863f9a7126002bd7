// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 运行配置
pub mod detection; // 检测结果与跟踪会话
pub mod input; // 视频输入系统
pub mod output; // 帧输出
pub mod pipeline; // 帧聚合与运行循环
pub mod renderer; // 标注绘制

use std::path::{Path, PathBuf};

use anyhow::Result;

pub use crate::config::{AggregatorConfig, AnnotationStyle, CommonArgs, PipelineConfig};
pub use crate::detection::{BBox, Detection, EmptySession, ReplaySession, TrackerSession};
pub use crate::input::{FrameSource, ImageSequenceSource, SyntheticSource, VideoInfo};
pub use crate::output::{FrameSink, ImageSequenceSink, NullSink};
pub use crate::pipeline::{
    run, run_pipelined, run_with, Aggregator, CancelFlag, FrameProcessor, FrameSummary, RunEnd,
    RunStatistics,
};
pub use crate::renderer::Annotator;

/// 检测文件默认后缀: `<视频名>.tracks.jsonl`
pub const DETECTIONS_SUFFIX: &str = "tracks.jsonl";

/// 输入旁边的默认检测文件 (`videos/crowd3.mp4` → `videos/crowd3.tracks.jsonl`)
pub fn default_detections_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}.{}", stem, DETECTIONS_SUFFIX))
}

/// 打开跟踪会话: 有检测文件时回放, 否则空会话
pub fn open_session(detections: Option<&Path>) -> Result<Box<dyn TrackerSession>> {
    match detections {
        Some(path) => {
            let session = ReplaySession::from_path(path)?;
            log::info!(
                "🎯 跟踪结果: {} ({}帧有检测)",
                path.display(),
                session.frame_count()
            );
            Ok(Box::new(session))
        }
        None => {
            log::warn!("⚠️ 未提供检测文件, 只绘制计数");
            Ok(Box::new(EmptySession))
        }
    }
}

/// 日志初始化 (默认 info, 可用 RUST_LOG 覆盖)
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

pub fn gen_time_string(delimiter: &str) -> String {
    let fmt = format!(
        "%Y{}%m{}%d{}%H{}%M{}%S",
        delimiter, delimiter, delimiter, delimiter, delimiter
    );
    chrono::Local::now().format(&fmt).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_detections_path() {
        assert_eq!(
            default_detections_path(Path::new("videos/crowd3.mp4")),
            PathBuf::from("videos/crowd3.tracks.jsonl")
        );
        assert_eq!(
            default_detections_path(Path::new("videos/lobby")),
            PathBuf::from("videos/lobby.tracks.jsonl")
        );
    }

    #[test]
    fn test_time_string_shape() {
        let s = gen_time_string("-");
        assert_eq!(s.split('-').count(), 6);
    }
}
