use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use crowdtrack_rs::pipeline::{ProcessingReport, RunReport};
use crowdtrack_rs::{
    default_detections_path, gen_time_string, init_logging, open_session, run_with, CancelFlag,
    CommonArgs, FrameProcessor, FrameSource, ImageSequenceSink, ImageSequenceSource, RunEnd,
    VideoInfo,
};

/// 👥 Crowd Management Demo
///
/// 读入一段视频, 显示视频信息, 处理到临时目录, 汇报统计并导出结果。
#[derive(Parser, Debug)]
#[command(author, version, about = "👥 Crowd Management Demo", long_about = None)]
struct Args {
    /// 输入: 图片序列目录 (ffmpeg 特性下也可以是视频文件)
    #[arg(short, long)]
    input: PathBuf,

    /// 跟踪结果 JSONL (默认: <输入名>.tracks.jsonl)
    #[arg(short, long)]
    detections: Option<PathBuf>,

    /// 导出处理结果 (默认: processed_video[.mp4])
    #[arg(long)]
    download: Option<PathBuf>,

    /// 处理报告 JSON (默认: crowd_report_<时间>.json)
    #[arg(long)]
    report: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    match demo(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// 返回运行是否完整结束
fn demo(args: &Args) -> Result<bool> {
    let cfg = args.common.resolve()?;
    let is_video = args.input.is_file();

    let info = video_info(&args.input, cfg.sequence_fps)?;
    print_video_info(&info);

    let detections = args
        .detections
        .clone()
        .or_else(|| Some(default_detections_path(&args.input)).filter(|p| p.exists()));
    let session = open_session(detections.as_deref())?;
    let mut processor = FrameProcessor::from_config(session, &cfg)?;

    let cancel = CancelFlag::new();
    cancel.install_ctrlc()?;

    // 临时目录在函数结束时删除
    let work = tempfile::tempdir().context("无法创建临时目录")?;
    let processed = work.path().join(if is_video {
        "output_video.mp4"
    } else {
        "output_video"
    });

    println!("Processing video...");
    let started = Instant::now();
    let (end, stats) = if is_video {
        if args.common.pipelined {
            log::warn!("⚠️ 视频输入由 FFmpeg 自带线程处理, 忽略 --pipelined");
        }
        process_video(&args.input, &processed, processor, &cancel)?
    } else {
        let mut source = ImageSequenceSource::open(&args.input, cfg.sequence_fps)?;
        let mut sink = ImageSequenceSink::create(&processed)?;
        let end = run_with(
            &mut source,
            &mut processor,
            &mut sink,
            &cancel,
            args.common.pipelined,
            cfg.queue_depth,
        );
        (end, processor.report())
    };
    let elapsed = started.elapsed().as_secs_f64();

    let completed = end.is_complete();
    match &end {
        RunEnd::Exhausted => println!("Processing completed in {:.2} seconds!", elapsed),
        RunEnd::Cancelled => println!("Processing cancelled after {:.2} seconds", elapsed),
        RunEnd::Failed(e) => println!("Processing failed after {:.2} seconds: {:#}", elapsed, e),
    }

    println!("Processing Statistics");
    println!("  Total Frames: {}", stats.total_frames);
    println!("  Max {}: {}", stats.entity_label, stats.max_count);
    println!("  Avg {}: {:.2}", stats.entity_label, stats.avg_count);

    if completed {
        let download = args.download.clone().unwrap_or_else(|| {
            PathBuf::from(if is_video {
                "processed_video.mp4"
            } else {
                "processed_video"
            })
        });
        persist(&processed, &download)?;
        println!("Download: {}", download.display());
    }

    let report_path = args
        .report
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("crowd_report_{}.json", gen_time_string(""))));
    let report = ProcessingReport::new(
        args.input.display().to_string(),
        info,
        stats,
        elapsed,
        completed,
    );
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&report_path, json)
        .with_context(|| format!("无法写入报告 {}", report_path.display()))?;
    log::info!("📄 报告: {}", report_path.display());

    Ok(completed)
}

fn print_video_info(info: &VideoInfo) {
    println!("Video Information");
    println!("  Resolution: {}", info.resolution());
    println!("  FPS: {:.2}", info.fps);
    match info.duration_secs() {
        Some(secs) => println!("  Duration: {} seconds", secs as u64),
        None => println!("  Duration: unknown"),
    }
}

/// 临时结果 → 导出位置 (文件或目录)
fn persist(from: &Path, to: &Path) -> Result<()> {
    if from.is_dir() {
        std::fs::create_dir_all(to)
            .with_context(|| format!("无法创建目录 {}", to.display()))?;
        for entry in std::fs::read_dir(from)? {
            let path = entry?.path();
            if let Some(name) = path.file_name() {
                std::fs::copy(&path, to.join(name))
                    .with_context(|| format!("复制失败 {}", path.display()))?;
            }
        }
    } else {
        std::fs::copy(from, to).with_context(|| format!("复制失败 {}", from.display()))?;
    }
    Ok(())
}

#[cfg(feature = "ffmpeg")]
fn video_info(input: &Path, sequence_fps: f64) -> Result<VideoInfo> {
    if input.is_file() {
        crowdtrack_rs::input::decoder::read_video_info(input)
    } else {
        Ok(ImageSequenceSource::open(input, sequence_fps)?.info().clone())
    }
}

#[cfg(not(feature = "ffmpeg"))]
fn video_info(input: &Path, sequence_fps: f64) -> Result<VideoInfo> {
    if input.is_file() {
        anyhow::bail!("{} 是视频文件, 需要启用 ffmpeg 特性", input.display());
    }
    Ok(ImageSequenceSource::open(input, sequence_fps)?.info().clone())
}

#[cfg(feature = "ffmpeg")]
fn process_video(
    input: &Path,
    output: &Path,
    processor: FrameProcessor,
    cancel: &CancelFlag,
) -> Result<(RunEnd, RunReport)> {
    use std::sync::{Arc, Mutex};

    let shared = Arc::new(Mutex::new(processor));
    let end = crowdtrack_rs::input::decoder::annotate_video(
        input,
        output,
        Arc::clone(&shared),
        cancel,
    );
    let report = shared
        .lock()
        .map_err(|_| anyhow::anyhow!("帧处理器锁已损坏"))?
        .report();
    Ok((end, report))
}

#[cfg(not(feature = "ffmpeg"))]
fn process_video(
    input: &Path,
    _output: &Path,
    _processor: FrameProcessor,
    _cancel: &CancelFlag,
) -> Result<(RunEnd, RunReport)> {
    anyhow::bail!("{} 是视频文件, 需要启用 ffmpeg 特性", input.display())
}
