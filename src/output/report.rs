// 该文件是 Jinxiang （金相） 项目的一部分。
// src/output/report.rs - 文本与 JSON 报告
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::{
  analysis::{AnalysisResult, BatchSummary},
  frame::ImageFrame,
  output::Render,
};

const WIDE_RULE: usize = 60;
const NARROW_RULE: usize = 40;

#[derive(Error, Debug)]
pub enum ReportError {
  #[error("无法写入报告 {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("JSON 序列化错误: {0}")]
  Json(#[from] serde_json::Error),
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), ReportError> {
  let io_error = |source| ReportError::Io {
    path: path.to_path_buf(),
    source,
  };
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent).map_err(io_error)?;
  }
  std::fs::write(path, contents).map_err(io_error)
}

fn banner(lines: &mut Vec<String>, title: &str) {
  lines.push("=".repeat(WIDE_RULE));
  lines.push(title.to_string());
  lines.push("=".repeat(WIDE_RULE));
  lines.push(String::new());
}

pub fn format_report(result: &AnalysisResult) -> String {
  let mut lines = Vec::new();
  banner(&mut lines, "Metallographic Phase Analysis Report");

  let (width, height) = result.dimensions();
  lines.push(format!("Image: {}", result.image_name()));
  lines.push(format!(
    "Date: {}",
    result.created_at().format("%Y-%m-%d %H:%M:%S")
  ));
  lines.push(format!("Image size: {}x{}", width, height));
  lines.push(String::new());

  let stats = result.statistics();
  lines.push(format!("Total detections: {}", stats.total_detections()));
  lines.push(format!(
    "Average confidence: {:.2}%",
    stats.average_confidence() * 100.0
  ));
  lines.push(String::new());

  if !stats.phase_counts().is_empty() {
    lines.push("Phase distribution:".to_string());
    lines.push("-".repeat(NARROW_RULE));
    for (phase, count) in stats.phase_counts() {
      let area = stats.phase_areas().get(phase).copied().unwrap_or(0.0);
      lines.push(format!("{}:", phase));
      lines.push(format!("  Detections: {}", count));
      lines.push(format!("  Total area: {:.2} px²", area));
      lines.push(String::new());
    }
  }

  lines.push("Detections:".to_string());
  lines.push("-".repeat(NARROW_RULE));
  for (i, detection) in result.detections().iter().enumerate() {
    let b = detection.bbox();
    lines.push(format!("{}. {}", i + 1, detection.phase()));
    lines.push(format!(
      "   Confidence: {:.2}%",
      detection.confidence() as f64 * 100.0
    ));
    lines.push(format!("   Area: {:.2} px²", detection.area()));
    lines.push(format!(
      "   Box: [{:.1}, {:.1}, {:.1}, {:.1}]",
      b.x1(),
      b.y1(),
      b.x2(),
      b.y2()
    ));
    lines.push(String::new());
  }

  lines.join("\n")
}

pub fn format_batch_summary(summary: &BatchSummary, generated_at: &DateTime<Local>) -> String {
  let mut lines = Vec::new();
  banner(&mut lines, "Metallographic Phase Analysis - Batch Summary");

  lines.push(format!("Date: {}", generated_at.format("%Y-%m-%d %H:%M:%S")));
  lines.push(format!("Images processed: {}", summary.processed()));
  lines.push(format!("Images failed: {}", summary.failures().len()));
  lines.push(String::new());
  lines.push(format!("Total detections: {}", summary.total_detections()));
  lines.push(format!(
    "Average confidence: {:.2}%",
    summary.average_confidence() * 100.0
  ));
  lines.push(String::new());

  lines.push("Per-image results:".to_string());
  lines.push("-".repeat(WIDE_RULE));
  for (i, result) in summary.results().iter().enumerate() {
    let stats = result.statistics();
    lines.push(String::new());
    lines.push(format!("{}. {}", i + 1, result.image_name()));
    lines.push(format!("   Detections: {}", stats.total_detections()));
    if !stats.phase_counts().is_empty() {
      lines.push("   Phase distribution:".to_string());
      for (phase, count) in stats.phase_counts() {
        lines.push(format!("      - {}: {}", phase, count));
      }
    }
  }

  if !summary.failures().is_empty() {
    lines.push(String::new());
    lines.push("Failed images:".to_string());
    lines.push("-".repeat(WIDE_RULE));
    for (i, failure) in summary.failures().iter().enumerate() {
      let name = failure
        .image_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| failure.image_path.display().to_string());
      lines.push(format!("{}. {}: {}", i + 1, name, failure.cause));
    }
  }

  lines.push(String::new());
  lines.join("\n")
}

pub fn write_report(result: &AnalysisResult, path: &Path) -> Result<(), ReportError> {
  write_file(path, format_report(result).as_bytes())?;
  info!("报告已保存: {}", path.display());
  Ok(())
}

pub fn write_batch_summary(summary: &BatchSummary, path: &Path) -> Result<(), ReportError> {
  write_file(
    path,
    format_batch_summary(summary, &Local::now()).as_bytes(),
  )?;
  info!("批处理汇总已保存: {}", path.display());
  Ok(())
}

pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), ReportError> {
  let json = serde_json::to_vec_pretty(value)?;
  write_file(path, &json)?;
  info!("JSON 已保存: {}", path.display());
  Ok(())
}

/// 单张图像的文本报告，可选附带同名 `.json`
pub struct TextReportOutput {
  path: PathBuf,
  json: bool,
}

impl TextReportOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      json: false,
    }
  }

  pub fn with_json(mut self, json: bool) -> Self {
    self.json = json;
    self
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Render<ImageFrame, AnalysisResult> for TextReportOutput {
  type Error = ReportError;

  fn render_result(&self, _frame: &ImageFrame, result: &AnalysisResult) -> Result<(), Self::Error> {
    write_report(result, &self.path)?;
    if self.json {
      write_json(result, &self.path.with_extension("json"))?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::analysis::{Aggregator, BatchFailure};
  use crate::model::{DetectItem, DetectResult};

  fn sample() -> AnalysisResult {
    Aggregator::default()
      .aggregate(
        Path::new("samples/steel_01.png"),
        (640, 480),
        &vec![
          DetectItem {
            class_id: 0,
            score: 0.9,
            bbox: [0.0, 0.0, 10.0, 10.0],
          },
          DetectItem {
            class_id: 1,
            score: 0.8,
            bbox: [0.0, 0.0, 4.0, 5.0],
          },
        ]
        .into(),
      )
      .unwrap()
  }

  #[test]
  fn report_lists_statistics_and_detections() {
    let text = format_report(&sample());

    assert!(text.contains("Image: steel_01.png"));
    assert!(text.contains("Image size: 640x480"));
    assert!(text.contains("Total detections: 2"));
    assert!(text.contains("Average confidence: 85.00%"));
    assert!(text.contains("Ferrit:\n  Detections: 1\n  Total area: 100.00 px²"));
    assert!(text.contains("Perlit:\n  Detections: 1\n  Total area: 20.00 px²"));
    assert!(text.contains("1. Ferrit\n   Confidence: 90.00%"));
    assert!(text.contains("2. Perlit\n   Confidence: 80.00%\n   Area: 20.00 px²"));
    assert!(text.contains("Box: [0.0, 0.0, 4.0, 5.0]"));
  }

  #[test]
  fn empty_result_has_no_phase_section() {
    let result = Aggregator::default()
      .aggregate(Path::new("empty.png"), (1, 1), &DetectResult::default())
      .unwrap();
    let text = format_report(&result);
    assert!(text.contains("Total detections: 0"));
    assert!(text.contains("Average confidence: 0.00%"));
    assert!(!text.contains("Phase distribution:"));
  }

  #[test]
  fn batch_summary_lists_images_and_failures() {
    let summary = BatchSummary::new(
      vec![sample()],
      vec![BatchFailure {
        image_path: "samples/broken.jpg".into(),
        cause: "decode failed".to_string(),
      }],
    );
    let text = format_batch_summary(&summary, &Local::now());

    assert!(text.contains("Images processed: 1"));
    assert!(text.contains("Images failed: 1"));
    assert!(text.contains("Total detections: 2"));
    assert!(text.contains("1. steel_01.png\n   Detections: 2\n   Phase distribution:"));
    assert!(text.contains("      - Ferrit: 1\n      - Perlit: 1"));
    assert!(text.contains("1. broken.jpg: decode failed"));
  }

  #[test]
  fn text_report_output_writes_optional_json() {
    let dir = tempfile::tempdir().unwrap();
    let frame = ImageFrame::new("steel_01.png", image::RgbImage::new(1, 1));
    let output = TextReportOutput::new(dir.path().join("report.txt")).with_json(true);
    output.render_result(&frame, &sample()).unwrap();

    let text = std::fs::read_to_string(dir.path().join("report.txt")).unwrap();
    assert!(text.starts_with(&"=".repeat(60)));

    let json: serde_json::Value =
      serde_json::from_slice(&std::fs::read(dir.path().join("report.json")).unwrap()).unwrap();
    assert_eq!(json["statistics"]["total_detections"], 2);
    assert_eq!(json["statistics"]["phase_counts"]["Perlit"], 1);
    assert_eq!(json["detections"][0]["phase"], "Ferrit");
  }
}
