use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use crowdtrack_rs::output::tracked_name;
use crowdtrack_rs::{
    default_detections_path, init_logging, open_session, run_with, CancelFlag, CommonArgs,
    FrameProcessor, ImageSequenceSink, ImageSequenceSource, PipelineConfig, RunEnd,
};

/// 人群计数: 批量处理目录下所有视频
///
/// 直接运行: cargo run --bin track_batch -- --videos videos --results results
#[derive(Parser, Debug)]
#[command(author, version, about = "人群计数 - 批量处理", long_about = None)]
struct Args {
    /// 输入目录: 每个子目录是一段图片序列 (ffmpeg 特性下还包括 *.mp4)
    #[arg(long, default_value = "videos")]
    videos: PathBuf,

    /// 输出目录, 每个输入写到 tracked_<名称>
    #[arg(long, default_value = "results")]
    results: PathBuf,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    match batch(&args) {
        Ok(failed) if failed == 0 => ExitCode::SUCCESS,
        Ok(failed) => {
            log::warn!("⚠️ {} 个视频处理失败", failed);
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// 返回失败的视频数
fn batch(args: &Args) -> Result<usize> {
    let cfg = args.common.resolve()?;
    let inputs = discover_inputs(&args.videos)?;
    if inputs.is_empty() {
        log::warn!("⚠️ {} 下没有可处理的视频", args.videos.display());
    }

    std::fs::create_dir_all(&args.results)
        .with_context(|| format!("无法创建输出目录 {}", args.results.display()))?;

    let cancel = CancelFlag::new();
    cancel.install_ctrlc()?;

    let mut failed = 0;
    for input in &inputs {
        if cancel.is_cancelled() {
            log::warn!("⚠️ 已取消, 跳过剩余视频");
            break;
        }
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::info!("🎬 Processing {}...", name);

        let output = args.results.join(tracked_name(input));
        match process_one(input, &output, &cfg, args.common.pipelined, &cancel) {
            Ok(RunEnd::Failed(e)) | Err(e) => {
                log::error!("❌ {} 处理失败: {:#}", name, e);
                failed += 1;
            }
            Ok(_) => {}
        }
    }

    log::info!("✅ 处理完成! ({}个视频)", inputs.len());
    Ok(failed)
}

/// 每个输入都有独立的会话和统计
fn process_one(
    input: &Path,
    output: &Path,
    cfg: &PipelineConfig,
    pipelined: bool,
    cancel: &CancelFlag,
) -> Result<RunEnd> {
    let detections = Some(default_detections_path(input)).filter(|p| p.exists());
    let session = open_session(detections.as_deref())?;
    let mut processor = FrameProcessor::from_config(session, cfg)?;

    if input.is_file() {
        if pipelined {
            log::warn!("⚠️ 视频输入由 FFmpeg 自带线程处理, 忽略 --pipelined");
        }
        return process_video(input, output, processor, cancel);
    }

    let mut source = ImageSequenceSource::open(input, cfg.sequence_fps)?;
    let mut sink = ImageSequenceSink::create(output)?;
    Ok(run_with(
        &mut source,
        &mut processor,
        &mut sink,
        cancel,
        pipelined,
        cfg.queue_depth,
    ))
}

#[cfg(feature = "ffmpeg")]
fn process_video(
    input: &Path,
    output: &Path,
    processor: FrameProcessor,
    cancel: &CancelFlag,
) -> Result<RunEnd> {
    use std::sync::{Arc, Mutex};
    let processor = Arc::new(Mutex::new(processor));
    Ok(crowdtrack_rs::input::decoder::annotate_video(
        input, output, processor, cancel,
    ))
}

#[cfg(not(feature = "ffmpeg"))]
fn process_video(
    input: &Path,
    _output: &Path,
    _processor: FrameProcessor,
    _cancel: &CancelFlag,
) -> Result<RunEnd> {
    anyhow::bail!("{} 是视频文件, 需要启用 ffmpeg 特性", input.display())
}

/// 输入目录下的图片序列子目录 (和视频文件), 按名称排序
fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("无法读取输入目录 {}", dir.display()))?;

    let mut inputs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() || (cfg!(feature = "ffmpeg") && is_video_file(&path)) {
            inputs.push(path);
        }
    }
    inputs.sort();
    Ok(inputs)
}

fn is_video_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("mp4"))
            .unwrap_or(false)
}
