//! 运行配置 (Run configuration)
//!
//! 优先级: 内置默认值 → JSON 配置文件 → 环境变量 → 命令行参数

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::detection::types::PERSON_CLASS_ID;

const DEFAULT_ENTITY_LABEL: &str = "Persons";
const DEFAULT_LABEL_OFFSET: u32 = 10;
const DEFAULT_SUMMARY_ANCHOR: PixelPoint = PixelPoint { x: 30, y: 30 };
const DEFAULT_SEQUENCE_FPS: f64 = 30.0;
const DEFAULT_QUEUE_DEPTH: usize = 8;
/// 字号上限 (像素)
pub const MAX_FONT_PX: f32 = 512.0;

pub const CONFIG_ENV: &str = "CROWDTRACK_CONFIG";
pub const TARGET_CLASS_ENV: &str = "CROWDTRACK_TARGET_CLASS";
pub const ENTITY_LABEL_ENV: &str = "CROWDTRACK_ENTITY_LABEL";
pub const LABEL_OFFSET_ENV: &str = "CROWDTRACK_LABEL_OFFSET";

/// 像素坐标 (非负整数)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PixelPoint {
    pub x: u32,
    pub y: u32,
}

impl PixelPoint {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

// ========== 聚合器配置 ==========

/// 帧聚合器参数
#[derive(Clone, Debug, PartialEq)]
pub struct AggregatorConfig {
    /// 统计的目标类别
    pub target_class_id: u32,
    /// 计数标签的实体名称 ("Persons: 3")
    pub entity_label: String,
    /// ID标签在框上方的偏移 (像素)
    pub label_offset: u32,
    /// 计数标签位置
    pub summary_anchor: PixelPoint,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            target_class_id: PERSON_CLASS_ID,
            entity_label: DEFAULT_ENTITY_LABEL.to_string(),
            label_offset: DEFAULT_LABEL_OFFSET,
            summary_anchor: DEFAULT_SUMMARY_ANCHOR,
        }
    }
}

// ========== 绘制样式 ==========

/// 绘制样式 (RGB)
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationStyle {
    pub box_color: [u8; 3],
    pub label_color: [u8; 3],
    pub summary_color: [u8; 3],
    /// 线宽 (像素, ≥1)
    pub thickness: u32,
    /// ID标签字号 (像素)
    pub label_px: f32,
    /// 计数标签字号 (像素)
    pub summary_px: f32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            box_color: [0, 255, 0],     // 绿色框
            label_color: [0, 255, 0],   // 绿色ID
            summary_color: [255, 0, 0], // 红色计数
            thickness: 2,
            label_px: 18.0,
            summary_px: 30.0,
        }
    }
}

// ========== 总配置 ==========

#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub aggregator: AggregatorConfig,
    pub style: AnnotationStyle,
    /// 图片序列的帧率
    pub sequence_fps: f64,
    /// TrueType 字体 (为空时使用内置点阵字体)
    pub font_path: Option<PathBuf>,
    /// 流水线模式的队列深度
    pub queue_depth: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            aggregator: AggregatorConfig::default(),
            style: AnnotationStyle::default(),
            sequence_fps: DEFAULT_SEQUENCE_FPS,
            font_path: None,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PipelineConfigFile {
    target_class_id: Option<u32>,
    entity_label: Option<String>,
    label_offset: Option<u32>,
    summary_anchor: Option<[u32; 2]>,
    sequence_fps: Option<f64>,
    font_path: Option<PathBuf>,
    queue_depth: Option<usize>,
    style: Option<StyleConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct StyleConfigFile {
    box_color: Option<[u8; 3]>,
    label_color: Option<[u8; 3]>,
    summary_color: Option<[u8; 3]>,
    thickness: Option<u32>,
    label_px: Option<f32>,
    summary_px: Option<f32>,
}

impl PipelineConfig {
    /// 加载配置: `path` 优先, 其次 `CROWDTRACK_CONFIG`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_ENV)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let file_cfg = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => read_config_file(&path)?,
            None => PipelineConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: PipelineConfigFile) -> Self {
        let defaults = Self::default();
        let style_file = file.style.unwrap_or_default();
        let style = AnnotationStyle {
            box_color: style_file.box_color.unwrap_or(defaults.style.box_color),
            label_color: style_file.label_color.unwrap_or(defaults.style.label_color),
            summary_color: style_file
                .summary_color
                .unwrap_or(defaults.style.summary_color),
            thickness: style_file.thickness.unwrap_or(defaults.style.thickness),
            label_px: style_file.label_px.unwrap_or(defaults.style.label_px),
            summary_px: style_file.summary_px.unwrap_or(defaults.style.summary_px),
        };
        let aggregator = AggregatorConfig {
            target_class_id: file
                .target_class_id
                .unwrap_or(defaults.aggregator.target_class_id),
            entity_label: file
                .entity_label
                .unwrap_or(defaults.aggregator.entity_label),
            label_offset: file
                .label_offset
                .unwrap_or(defaults.aggregator.label_offset),
            summary_anchor: file
                .summary_anchor
                .map(|[x, y]| PixelPoint::new(x, y))
                .unwrap_or(defaults.aggregator.summary_anchor),
        };
        Self {
            aggregator,
            style,
            sequence_fps: file.sequence_fps.unwrap_or(defaults.sequence_fps),
            font_path: file.font_path,
            queue_depth: file.queue_depth.unwrap_or(defaults.queue_depth),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(class) = std::env::var(TARGET_CLASS_ENV) {
            if !class.trim().is_empty() {
                self.aggregator.target_class_id = class
                    .trim()
                    .parse()
                    .map_err(|_| anyhow!("{} must be a non-negative integer", TARGET_CLASS_ENV))?;
            }
        }
        if let Ok(label) = std::env::var(ENTITY_LABEL_ENV) {
            if !label.trim().is_empty() {
                self.aggregator.entity_label = label;
            }
        }
        if let Ok(offset) = std::env::var(LABEL_OFFSET_ENV) {
            if !offset.trim().is_empty() {
                self.aggregator.label_offset = offset
                    .trim()
                    .parse()
                    .map_err(|_| anyhow!("{} must be a non-negative integer", LABEL_OFFSET_ENV))?;
            }
        }
        Ok(())
    }

    /// 命令行参数覆盖
    pub fn apply_args(&mut self, args: &CommonArgs) -> Result<()> {
        if let Some(class) = args.target_class {
            self.aggregator.target_class_id = class;
        }
        if let Some(label) = &args.entity_label {
            self.aggregator.entity_label = label.clone();
        }
        if let Some(font) = &args.font {
            self.font_path = Some(font.clone());
        }
        if let Some(fps) = args.fps {
            self.sequence_fps = fps;
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.aggregator.entity_label.trim().is_empty() {
            return Err(anyhow!("entity_label must not be empty"));
        }
        if !(self.sequence_fps.is_finite() && self.sequence_fps > 0.0) {
            return Err(anyhow!("sequence_fps must be greater than zero"));
        }
        if self.queue_depth == 0 {
            return Err(anyhow!("queue_depth must be >= 1"));
        }
        if self.style.thickness == 0 {
            return Err(anyhow!("style.thickness must be >= 1"));
        }
        for (key, px) in [
            ("style.label_px", self.style.label_px),
            ("style.summary_px", self.style.summary_px),
        ] {
            if !(px.is_finite() && px > 0.0 && px <= MAX_FONT_PX) {
                return Err(anyhow!("{} must be in (0, {}]", key, MAX_FONT_PX));
            }
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<PipelineConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let cfg = serde_json::from_str(&raw)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    Ok(cfg)
}

// ========== 命令行参数 ==========

/// 各程序共用的参数
#[derive(clap::Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// JSON 配置文件
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// 统计的类别ID (COCO: 0=person)
    #[arg(long)]
    pub target_class: Option<u32>,

    /// 计数标签名称
    #[arg(long)]
    pub entity_label: Option<String>,

    /// TrueType 字体文件
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// 图片序列帧率
    #[arg(long)]
    pub fps: Option<f64>,

    /// 解码/编码放到独立线程
    #[arg(long, default_value_t = false)]
    pub pipelined: bool,
}

impl CommonArgs {
    /// 加载配置并应用命令行覆盖
    pub fn resolve(&self) -> Result<PipelineConfig> {
        let mut cfg = PipelineConfig::load(self.config.as_deref())?;
        cfg.apply_args(self)?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_overlay() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.aggregator.target_class_id, 0);
        assert_eq!(cfg.aggregator.entity_label, "Persons");
        assert_eq!(cfg.aggregator.label_offset, 10);
        assert_eq!(cfg.aggregator.summary_anchor, PixelPoint::new(30, 30));
        assert_eq!(cfg.style.thickness, 2);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file: PipelineConfigFile = serde_json::from_str(
            r#"{"entity_label":"Cars","target_class_id":2,"style":{"thickness":3}}"#,
        )
        .unwrap();
        let cfg = PipelineConfig::from_file(file);
        assert_eq!(cfg.aggregator.entity_label, "Cars");
        assert_eq!(cfg.aggregator.target_class_id, 2);
        assert_eq!(cfg.aggregator.label_offset, 10);
        assert_eq!(cfg.style.thickness, 3);
        assert_eq!(cfg.style.box_color, [0, 255, 0]);
    }

    #[test]
    fn test_font_size_bounds() {
        let oversized: PipelineConfigFile =
            serde_json::from_str(r#"{"style":{"summary_px":1e12}}"#).unwrap();
        assert!(PipelineConfig::from_file(oversized).validate().is_err());

        let mut cfg = PipelineConfig::default();
        cfg.style.label_px = f32::INFINITY;
        assert!(cfg.validate().is_err());

        cfg.style.label_px = MAX_FONT_PX;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(serde_json::from_str::<PipelineConfigFile>(r#"{"target_class":1}"#).is_err());
    }

    #[test]
    fn test_args_override_and_validate() {
        let mut cfg = PipelineConfig::default();
        let args = CommonArgs {
            target_class: Some(2),
            entity_label: Some("Cars".into()),
            fps: Some(25.0),
            ..Default::default()
        };
        cfg.apply_args(&args).unwrap();
        assert_eq!(cfg.aggregator.target_class_id, 2);
        assert_eq!(cfg.aggregator.entity_label, "Cars");
        assert_eq!(cfg.sequence_fps, 25.0);

        let bad = CommonArgs {
            fps: Some(0.0),
            ..Default::default()
        };
        assert!(cfg.apply_args(&bad).is_err());
    }
}
