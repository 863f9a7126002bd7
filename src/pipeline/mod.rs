/// 视频处理流水线 (Video Processing Pipeline)
///
/// 帧来源 → 跟踪会话 → 帧聚合器 → 标注 → 帧输出, 每帧一次。
/// - `run`:           单线程同步拉取
/// - `run_pipelined`: 读帧/写帧各一个线程, 聚合仍在调用线程 (统计单一写入者)
pub mod aggregator;
pub mod stats;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use image::RgbImage;

use crate::config::PipelineConfig;
use crate::detection::TrackerSession;
use crate::input::FrameSource;
use crate::output::FrameSink;
use crate::renderer::Annotator;

pub use aggregator::{Aggregator, Annotation, CountLabel, FrameSummary, PixelRect};
pub use stats::{ProcessingReport, RunReport, RunStatistics};

/// 进度日志间隔 (帧)
const PROGRESS_EVERY: u64 = 30;

// ========== 单帧处理 ==========

/// 单帧处理器: 会话 + 聚合器 + 标注 + 统计
pub struct FrameProcessor {
    session: Box<dyn TrackerSession>,
    aggregator: Aggregator,
    annotator: Annotator,
    stats: RunStatistics,
    next_index: u64,
}

impl FrameProcessor {
    pub fn new(
        session: Box<dyn TrackerSession>,
        aggregator: Aggregator,
        annotator: Annotator,
    ) -> Self {
        Self {
            session,
            aggregator,
            annotator,
            stats: RunStatistics::default(),
            next_index: 0,
        }
    }

    pub fn from_config(session: Box<dyn TrackerSession>, cfg: &PipelineConfig) -> Result<Self> {
        Ok(Self::new(
            session,
            Aggregator::new(cfg.aggregator.clone()),
            Annotator::from_config(cfg)?,
        ))
    }

    /// 处理一帧: 取检测 → 聚合 → 原地绘制
    ///
    /// 会话出错时这一帧不计入统计。
    pub fn process(&mut self, frame: &mut RgbImage) -> Result<FrameSummary> {
        let frame_index = self.next_index;
        let detections = self.session.track(frame_index, frame)?;
        let summary = self
            .aggregator
            .aggregate(&detections, frame_index, &mut self.stats);
        self.next_index += 1;
        self.annotator.draw(frame, &summary);
        Ok(summary)
    }

    pub fn stats(&self) -> &RunStatistics {
        &self.stats
    }

    pub fn report(&self) -> RunReport {
        self.stats.report(&self.aggregator.config().entity_label)
    }

    pub fn session_name(&self) -> &str {
        self.session.name()
    }

    pub fn entity_label(&self) -> &str {
        &self.aggregator.config().entity_label
    }
}

// ========== 取消与结束状态 ==========

/// 取消标志 (Ctrl-C 或调用方设置)
#[derive(Clone, Default, Debug)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// 注册 Ctrl-C 处理 (每个进程只能一次)
    pub fn install_ctrlc(&self) -> Result<()> {
        let flag = self.clone();
        ctrlc::set_handler(move || {
            log::warn!("⚠️ 收到中断信号, 处理完当前帧后停止");
            flag.cancel();
        })
        .map_err(|e| anyhow!("无法注册 Ctrl-C 处理: {}", e))
    }
}

/// 运行结束原因; 任何情况下统计都停在最后一致的值
#[derive(Debug)]
pub enum RunEnd {
    /// 帧来源读完
    Exhausted,
    /// 被取消
    Cancelled,
    /// 外部组件出错 (读帧/检测/写帧)
    Failed(anyhow::Error),
}

impl RunEnd {
    pub fn is_complete(&self) -> bool {
        matches!(self, RunEnd::Exhausted)
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            RunEnd::Failed(e) => Err(e),
            _ => Ok(()),
        }
    }
}

// ========== 运行循环 ==========

/// 同步运行直到来源读完、被取消或出错
pub fn run(
    source: &mut dyn FrameSource,
    processor: &mut FrameProcessor,
    sink: &mut dyn FrameSink,
    cancel: &CancelFlag,
) -> RunEnd {
    let total = source.info().total_frames;
    log::info!(
        "🚀 开始处理: {} | 会话: {}",
        source.info().resolution(),
        processor.session_name()
    );

    let end = loop {
        if cancel.is_cancelled() {
            break RunEnd::Cancelled;
        }
        let mut frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break RunEnd::Exhausted,
            Err(e) => break RunEnd::Failed(e.context("读取帧失败")),
        };
        let summary = match processor.process(&mut frame) {
            Ok(summary) => summary,
            Err(e) => break RunEnd::Failed(e.context("获取检测结果失败")),
        };
        if let Err(e) = sink.write_frame(&frame) {
            break RunEnd::Failed(e.context("写帧失败"));
        }
        log_progress(&summary, total, processor.entity_label());
    };

    finish(sink, end, processor)
}

/// 按 `--pipelined` 选择运行方式, 有无输出都一样
pub fn run_with(
    source: &mut dyn FrameSource,
    processor: &mut FrameProcessor,
    sink: &mut dyn FrameSink,
    cancel: &CancelFlag,
    pipelined: bool,
    queue_depth: usize,
) -> RunEnd {
    if pipelined {
        run_pipelined(source, processor, sink, cancel, queue_depth)
    } else {
        run(source, processor, sink, cancel)
    }
}

/// 流水线运行: 读帧线程 → 聚合(当前线程) → 写帧线程
pub fn run_pipelined(
    source: &mut dyn FrameSource,
    processor: &mut FrameProcessor,
    sink: &mut dyn FrameSink,
    cancel: &CancelFlag,
    queue_depth: usize,
) -> RunEnd {
    let total = source.info().total_frames;
    let queue_depth = queue_depth.max(1);
    log::info!(
        "🚀 开始处理 (流水线, 队列{}): {} | 会话: {}",
        queue_depth,
        source.info().resolution(),
        processor.session_name()
    );

    let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Result<RgbImage>>(queue_depth);
    let (out_tx, out_rx) = crossbeam_channel::bounded::<RgbImage>(queue_depth);

    let end = std::thread::scope(|s| {
        let reader_cancel = cancel.clone();
        s.spawn(move || {
            while !reader_cancel.is_cancelled() {
                match source.next_frame() {
                    Ok(Some(frame)) => {
                        if frame_tx.send(Ok(frame)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = frame_tx.send(Err(e));
                        break;
                    }
                }
            }
        });

        let writer = s.spawn(move || -> Result<()> {
            for frame in out_rx {
                sink.write_frame(&frame)?;
            }
            sink.finish()
        });

        let mut end = loop {
            if cancel.is_cancelled() {
                break RunEnd::Cancelled;
            }
            let mut frame = match frame_rx.recv() {
                Ok(Ok(frame)) => frame,
                Ok(Err(e)) => break RunEnd::Failed(e.context("读取帧失败")),
                // 读帧线程结束: 来源读完或已取消
                Err(_) if cancel.is_cancelled() => break RunEnd::Cancelled,
                Err(_) => break RunEnd::Exhausted,
            };
            let summary = match processor.process(&mut frame) {
                Ok(summary) => summary,
                Err(e) => break RunEnd::Failed(e.context("获取检测结果失败")),
            };
            // 写帧线程已退出, 错误在 join 时取回
            if out_tx.send(frame).is_err() {
                break RunEnd::Exhausted;
            }
            log_progress(&summary, total, processor.entity_label());
        };

        drop(out_tx);
        drop(frame_rx);

        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                if !matches!(end, RunEnd::Failed(_)) {
                    end = RunEnd::Failed(e.context("写帧失败"));
                }
            }
            Err(_) => end = RunEnd::Failed(anyhow!("写帧线程异常退出")),
        }
        end
    });

    log_end(&end, processor);
    end
}

fn finish(sink: &mut dyn FrameSink, end: RunEnd, processor: &FrameProcessor) -> RunEnd {
    let end = match (sink.finish(), end) {
        (Err(e), RunEnd::Exhausted | RunEnd::Cancelled) => RunEnd::Failed(e.context("写帧失败")),
        (_, end) => end,
    };
    log_end(&end, processor);
    end
}

pub(crate) fn log_progress(summary: &FrameSummary, total: Option<u64>, entity_label: &str) {
    let done = summary.frame_index + 1;
    if done % PROGRESS_EVERY != 0 {
        return;
    }
    match total {
        Some(total) if total > 0 => log::info!(
            "🎯 进度: {}/{} ({:.1}%) | {}: {}",
            done,
            total,
            done as f64 / total as f64 * 100.0,
            entity_label,
            summary.matched_count
        ),
        _ => log::info!(
            "🎯 进度: {}帧 | {}: {}",
            done,
            entity_label,
            summary.matched_count
        ),
    }
}

pub(crate) fn log_end(end: &RunEnd, processor: &FrameProcessor) {
    let report = processor.report();
    match end {
        RunEnd::Exhausted => log::info!("✅ 处理完成: {}", report),
        RunEnd::Cancelled => log::warn!("⚠️ 已取消, 部分统计: {}", report),
        RunEnd::Failed(e) => log::error!("❌ 处理中断: {:#} | 部分统计: {}", e, report),
    }
}
