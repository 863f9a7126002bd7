/// 视频文件解码 → 标注 → 编码
/// Video file decode, annotate and re-encode (software decoding only)
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::stream_info::{find_video_stream_info, StreamInfo};
use ez_ffmpeg::{AVMediaType, FfmpegContext, Input, Output};

use super::decode_filter::AnnotateFilter;
use super::VideoInfo;
use crate::pipeline::{log_end, CancelFlag, FrameProcessor, RunEnd};

/// 输出编码器 (与 mp4v 容器兼容)
const OUTPUT_CODEC: &str = "mpeg4";

/// 读取视频流元数据
pub fn read_video_info(path: &Path) -> Result<VideoInfo> {
    let url = path.to_string_lossy().into_owned();
    let info = find_video_stream_info(url.as_str())
        .map_err(|e| anyhow!("无法读取视频信息 {}: {}", path.display(), e))?;

    match info {
        Some(StreamInfo::Video {
            width,
            height,
            fps,
            nb_frames,
            ..
        }) => Ok(VideoInfo {
            width: width.max(0) as u32,
            height: height.max(0) as u32,
            fps: fps as f64,
            total_frames: u64::try_from(nb_frames).ok().filter(|&n| n > 0),
        }),
        _ => bail!("没有视频流: {}", path.display()),
    }
}

/// 处理整个视频文件, 输出与输入同分辨率同帧率
///
/// 处理器由调用方持有, 结束后可读取统计。
pub fn annotate_video(
    input: &Path,
    output: &Path,
    processor: Arc<Mutex<FrameProcessor>>,
    cancel: &CancelFlag,
) -> RunEnd {
    let end = match decode_annotate_encode(input, output, Arc::clone(&processor), cancel) {
        Ok(end) => end,
        Err(e) => RunEnd::Failed(e),
    };
    if let Ok(p) = processor.lock() {
        log_end(&end, &p);
    }
    end
}

fn decode_annotate_encode(
    input: &Path,
    output: &Path,
    processor: Arc<Mutex<FrameProcessor>>,
    cancel: &CancelFlag,
) -> Result<RunEnd> {
    let info = read_video_info(input)?;
    log::info!(
        "🎬 解码: {} | {} @ {:.2}fps",
        input.display(),
        info.resolution(),
        info.fps
    );

    let filter = AnnotateFilter::new(processor, cancel.clone(), info.total_frames);
    let errors = filter.error_slot();

    let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
    let pipe = pipe.filter("annotate", Box::new(filter));

    let out_url = output.to_string_lossy().into_owned();
    let out = Output::from(out_url.as_str())
        .set_video_codec(OUTPUT_CODEC)
        .add_frame_pipeline(pipe);

    let in_url = input.to_string_lossy().into_owned();
    let ctx = FfmpegContext::builder()
        .input(Input::new(in_url.as_str()))
        .filter_descs(["format=yuv420p"].into())
        .output(out)
        .build()
        .map_err(|e| anyhow!("构建失败: {}", e))?;

    let sch = ctx.start().map_err(|e| anyhow!("启动失败: {}", e))?;
    let waited = sch.wait();

    if let Some(e) = errors.lock().ok().and_then(|mut slot| slot.take()) {
        return Ok(RunEnd::Failed(e));
    }
    if cancel.is_cancelled() {
        return Ok(RunEnd::Cancelled);
    }
    match waited {
        Ok(_) => {
            log::info!("✅ 已写出: {}", output.display());
            Ok(RunEnd::Exhausted)
        }
        Err(e) => Ok(RunEnd::Failed(anyhow!("FFmpeg 处理失败: {}", e))),
    }
}
