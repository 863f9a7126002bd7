use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::Parser;
use crowdtrack_rs::{
    default_detections_path, init_logging, open_session, run_with, CancelFlag, CommonArgs,
    FrameProcessor, FrameSink, ImageSequenceSink, ImageSequenceSource, NullSink, RunEnd,
};

/// 人群计数: 单个视频
///
/// 直接运行: cargo run --bin track -- --source videos/crowd3
#[derive(Parser, Debug)]
#[command(author, version, about = "人群计数 - 单个视频标注", long_about = None)]
struct Args {
    /// 输入: 图片序列目录 (启用 ffmpeg 特性时也可以是视频文件)
    #[arg(short, long)]
    source: PathBuf,

    /// 跟踪结果 JSONL (默认: <输入名>.tracks.jsonl)
    #[arg(short, long)]
    detections: Option<PathBuf>,

    /// 输出: 目录或视频文件; 不指定时只统计
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    match track(&args) {
        Ok(RunEnd::Failed(e)) => {
            log::error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn track(args: &Args) -> Result<RunEnd> {
    let cfg = args.common.resolve()?;

    let detections = args
        .detections
        .clone()
        .or_else(|| Some(default_detections_path(&args.source)).filter(|p| p.exists()));
    let session = open_session(detections.as_deref())?;

    let mut processor = FrameProcessor::from_config(session, &cfg)?;
    let cancel = CancelFlag::new();
    cancel.install_ctrlc()?;

    if args.source.is_file() {
        if args.common.pipelined {
            log::warn!("⚠️ 视频输入由 FFmpeg 自带线程处理, 忽略 --pipelined");
        }
        return track_video(args, processor, &cancel);
    }

    let mut source = ImageSequenceSource::open(&args.source, cfg.sequence_fps)?;
    let mut sink: Box<dyn FrameSink> = match &args.output {
        Some(dir) => Box::new(ImageSequenceSink::create(dir)?),
        None => Box::new(NullSink),
    };
    let end = run_with(
        &mut source,
        &mut processor,
        sink.as_mut(),
        &cancel,
        args.common.pipelined,
        cfg.queue_depth,
    );

    println!("{}", processor.report());
    Ok(end)
}

#[cfg(feature = "ffmpeg")]
fn track_video(args: &Args, processor: FrameProcessor, cancel: &CancelFlag) -> Result<RunEnd> {
    use crowdtrack_rs::input::decoder::annotate_video;
    use std::sync::{Arc, Mutex};

    let Some(output) = &args.output else {
        bail!("视频输入需要 --output <文件>");
    };
    let processor = Arc::new(Mutex::new(processor));
    let end = annotate_video(&args.source, output, Arc::clone(&processor), cancel);
    if let Ok(p) = processor.lock() {
        println!("{}", p.report());
    }
    Ok(end)
}

#[cfg(not(feature = "ffmpeg"))]
fn track_video(args: &Args, _processor: FrameProcessor, _cancel: &CancelFlag) -> Result<RunEnd> {
    bail!(
        "{} 是视频文件, 需要启用 ffmpeg 特性 (cargo run --features ffmpeg)",
        args.source.display()
    )
}
