/// FFmpeg标注过滤器模块
/// FFmpeg annotate filter module
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::{AVMediaType, Frame};

use super::yuv::Yuv420Planes;
use crate::pipeline::{log_progress, CancelFlag, FrameProcessor};

/// AVPixelFormat::AV_PIX_FMT_YUV420P
const AV_PIX_FMT_YUV420P: i32 = 0;

/// 取消时返回给 FFmpeg 的错误信息
pub const CANCELLED: &str = "cancelled";

/// 过滤器内部错误槽 (FFmpeg 只接受字符串错误)
pub type ErrorSlot = Arc<Mutex<Option<anyhow::Error>>>;

/// 解码帧 → 处理器 → 改动像素写回 → 编码
#[derive(Clone)]
pub struct AnnotateFilter {
    processor: Arc<Mutex<FrameProcessor>>,
    cancel: CancelFlag,
    total_frames: Option<u64>,
    error: ErrorSlot,
}

impl AnnotateFilter {
    pub fn new(
        processor: Arc<Mutex<FrameProcessor>>,
        cancel: CancelFlag,
        total_frames: Option<u64>,
    ) -> Self {
        Self {
            processor,
            cancel,
            total_frames,
            error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn error_slot(&self) -> ErrorSlot {
        Arc::clone(&self.error)
    }

    fn fail(&self, err: anyhow::Error) -> String {
        let msg = format!("{:#}", err);
        if let Ok(mut slot) = self.error.lock() {
            slot.get_or_insert(err);
        }
        msg
    }
}

impl FrameFilter for AnnotateFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> Result<(), String> {
        log::debug!("✅ 标注过滤器启动");
        Ok(())
    }

    fn filter_frame(
        &mut self,
        mut frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<Frame>, String> {
        if self.cancel.is_cancelled() {
            return Err(CANCELLED.to_string());
        }
        if unsafe { frame.as_ptr().is_null() || frame.is_empty() } {
            return Ok(Some(frame));
        }

        let mut planes = match writable_planes(&mut frame) {
            Ok(planes) => planes,
            Err(e) => return Err(self.fail(e)),
        };
        let before = planes.to_rgb();
        let mut after = before.clone();

        let mut processor = match self.processor.lock() {
            Ok(p) => p,
            Err(_) => return Err(self.fail(anyhow!("帧处理器锁已损坏"))),
        };
        let summary = match processor.process(&mut after) {
            Ok(summary) => summary,
            Err(e) => return Err(self.fail(e.context("获取检测结果失败"))),
        };
        log_progress(&summary, self.total_frames, processor.entity_label());
        drop(processor);

        planes.write_changed(&before, &after);
        Ok(Some(frame))
    }
}

// ========== 帧缓冲 ==========

/// 取得 yuv420p 帧的可写平面视图
///
/// 解码器的参考帧可能与本帧共享缓冲区, 先 `av_frame_make_writable` 取得独占副本,
/// 之后才读取数据指针 (复制后指针会变)。
fn writable_planes(frame: &mut Frame) -> anyhow::Result<Yuv420Planes<'_>> {
    unsafe {
        let ret = ffmpeg_sys_next::av_frame_make_writable(frame.as_mut_ptr());
        if ret < 0 {
            return Err(anyhow!("无法获得可写帧: {}", ret));
        }

        let raw = &*frame.as_ptr();
        if raw.format != AV_PIX_FMT_YUV420P {
            return Err(anyhow!("不支持的像素格式: {}", raw.format));
        }
        if raw.width <= 0 || raw.height <= 0 || raw.linesize[0] <= 0 || raw.linesize[1] <= 0 {
            return Err(anyhow!(
                "非法帧: {}x{} 步长 {}/{}",
                raw.width,
                raw.height,
                raw.linesize[0],
                raw.linesize[1]
            ));
        }
        if raw.data[0].is_null() || raw.data[1].is_null() || raw.data[2].is_null() {
            return Err(anyhow!("YUV指针为空"));
        }

        let width = raw.width as u32;
        let height = raw.height as u32;
        let y_stride = raw.linesize[0] as usize;
        let uv_stride = raw.linesize[1] as usize;
        let (y_len, uv_len) = Yuv420Planes::required_len(y_stride, uv_stride, height);

        let planes = Yuv420Planes {
            y: std::slice::from_raw_parts_mut(raw.data[0], y_len),
            u: std::slice::from_raw_parts_mut(raw.data[1], uv_len),
            v: std::slice::from_raw_parts_mut(raw.data[2], uv_len),
            y_stride,
            uv_stride,
            width,
            height,
        };
        if !planes.is_consistent() {
            return Err(anyhow!(
                "步长异常 y_stride={} uv_stride={}",
                y_stride,
                uv_stride
            ));
        }
        Ok(planes)
    }
}
