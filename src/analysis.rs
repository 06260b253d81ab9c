// 该文件是 Jinxiang （金相） 项目的一部分。
// src/analysis.rs - 检测结果聚合与统计
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

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use thiserror::Error;

use crate::model::{DetectItem, DetectResult, PhaseTable};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
  #[error("第 {index} 个检测框无效: {bbox:?}")]
  InvalidBox { index: usize, bbox: [f32; 4] },
  #[error("第 {index} 个检测置信度无效: {score}")]
  InvalidConfidence { index: usize, score: f32 },
}

/// 像素坐标下的边界框，保证 `x1 <= x2`、`y1 <= y2`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
  x1: f32,
  y1: f32,
  x2: f32,
  y2: f32,
}

impl BoundingBox {
  /// 坐标非有限值或面积为负时返回 `None`
  pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Option<Self> {
    let finite = [x1, y1, x2, y2].iter().all(|v| v.is_finite());
    if !finite || x2 < x1 || y2 < y1 {
      return None;
    }
    Some(Self { x1, y1, x2, y2 })
  }

  pub fn x1(&self) -> f32 {
    self.x1
  }

  pub fn y1(&self) -> f32 {
    self.y1
  }

  pub fn x2(&self) -> f32 {
    self.x2
  }

  pub fn y2(&self) -> f32 {
    self.y2
  }

  pub fn width(&self) -> f32 {
    self.x2 - self.x1
  }

  pub fn height(&self) -> f32 {
    self.y2 - self.y1
  }

  pub fn area(&self) -> f64 {
    self.width() as f64 * self.height() as f64
  }

  pub fn to_array(&self) -> [f32; 4] {
    [self.x1, self.y1, self.x2, self.y2]
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
  bbox: BoundingBox,
  confidence: f32,
  class_id: u32,
  phase: String,
  area: f64,
}

impl Detection {
  pub fn new(bbox: BoundingBox, confidence: f32, class_id: u32, phase: &str) -> Self {
    Self {
      bbox,
      confidence,
      class_id,
      phase: phase.to_string(),
      area: bbox.area(),
    }
  }

  pub fn bbox(&self) -> &BoundingBox {
    &self.bbox
  }

  pub fn confidence(&self) -> f32 {
    self.confidence
  }

  pub fn class_id(&self) -> u32 {
    self.class_id
  }

  pub fn phase(&self) -> &str {
    &self.phase
  }

  pub fn area(&self) -> f64 {
    self.area
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhaseStatistics {
  total_detections: usize,
  phase_counts: BTreeMap<String, usize>,
  phase_areas: BTreeMap<String, f64>,
  average_confidence: f64,
}

impl PhaseStatistics {
  pub fn from_detections(detections: &[Detection]) -> Self {
    let mut stats = Self {
      total_detections: detections.len(),
      ..Self::default()
    };

    let mut confidence_sum = 0f64;
    for detection in detections {
      *stats
        .phase_counts
        .entry(detection.phase.clone())
        .or_insert(0) += 1;
      *stats
        .phase_areas
        .entry(detection.phase.clone())
        .or_insert(0.0) += detection.area;
      confidence_sum += detection.confidence as f64;
    }

    if !detections.is_empty() {
      stats.average_confidence = confidence_sum / detections.len() as f64;
    }

    stats
  }

  pub fn total_detections(&self) -> usize {
    self.total_detections
  }

  pub fn phase_counts(&self) -> &BTreeMap<String, usize> {
    &self.phase_counts
  }

  pub fn phase_areas(&self) -> &BTreeMap<String, f64> {
    &self.phase_areas
  }

  pub fn average_confidence(&self) -> f64 {
    self.average_confidence
  }
}

/// 单张图像的分析结果，构造后不再修改
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
  image_path: PathBuf,
  width: u32,
  height: u32,
  detections: Vec<Detection>,
  statistics: PhaseStatistics,
  created_at: DateTime<Local>,
}

impl AnalysisResult {
  pub fn new(
    image_path: impl Into<PathBuf>,
    (width, height): (u32, u32),
    detections: Vec<Detection>,
    created_at: DateTime<Local>,
  ) -> Self {
    let statistics = PhaseStatistics::from_detections(&detections);
    Self {
      image_path: image_path.into(),
      width,
      height,
      detections,
      statistics,
      created_at,
    }
  }

  pub fn image_path(&self) -> &Path {
    &self.image_path
  }

  pub fn image_name(&self) -> String {
    self
      .image_path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_else(|| self.image_path.display().to_string())
  }

  pub fn dimensions(&self) -> (u32, u32) {
    (self.width, self.height)
  }

  pub fn detections(&self) -> &[Detection] {
    &self.detections
  }

  pub fn statistics(&self) -> &PhaseStatistics {
    &self.statistics
  }

  pub fn created_at(&self) -> &DateTime<Local> {
    &self.created_at
  }
}

/// 将检测器原始输出转换为 [`AnalysisResult`]
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
  phases: PhaseTable,
}

impl Aggregator {
  pub fn new(phases: PhaseTable) -> Self {
    Self { phases }
  }

  pub fn phases(&self) -> &PhaseTable {
    &self.phases
  }

  pub fn detection(&self, index: usize, item: &DetectItem) -> Result<Detection, AnalysisError> {
    let [x1, y1, x2, y2] = item.bbox;
    let bbox = BoundingBox::new(x1, y1, x2, y2).ok_or(AnalysisError::InvalidBox {
      index,
      bbox: item.bbox,
    })?;
    if !(0.0..=1.0).contains(&item.score) {
      return Err(AnalysisError::InvalidConfidence {
        index,
        score: item.score,
      });
    }
    Ok(Detection::new(
      bbox,
      item.score,
      item.class_id,
      self.phases.name_of(item.class_id),
    ))
  }

  pub fn aggregate(
    &self,
    image_path: &Path,
    dimensions: (u32, u32),
    raw: &DetectResult,
  ) -> Result<AnalysisResult, AnalysisError> {
    let detections = raw
      .iter()
      .enumerate()
      .map(|(index, item)| self.detection(index, item))
      .collect::<Result<Vec<_>, _>>()?;

    Ok(AnalysisResult::new(
      image_path,
      dimensions,
      detections,
      Local::now(),
    ))
  }
}

/// 一次批处理的汇总
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
  results: Vec<AnalysisResult>,
  failures: Vec<BatchFailure>,
  total_detections: usize,
  average_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
  pub image_path: PathBuf,
  pub cause: String,
}

impl BatchSummary {
  pub fn new(results: Vec<AnalysisResult>, failures: Vec<BatchFailure>) -> Self {
    let total_detections = results
      .iter()
      .map(|r| r.statistics.total_detections)
      .sum();

    // 只统计有检测结果的图像
    let confidences: Vec<f64> = results
      .iter()
      .filter(|r| r.statistics.total_detections > 0)
      .map(|r| r.statistics.average_confidence)
      .collect();
    let average_confidence = if confidences.is_empty() {
      0.0
    } else {
      confidences.iter().sum::<f64>() / confidences.len() as f64
    };

    Self {
      results,
      failures,
      total_detections,
      average_confidence,
    }
  }

  pub fn results(&self) -> &[AnalysisResult] {
    &self.results
  }

  pub fn into_results(self) -> Vec<AnalysisResult> {
    self.results
  }

  pub fn failures(&self) -> &[BatchFailure] {
    &self.failures
  }

  pub fn processed(&self) -> usize {
    self.results.len()
  }

  pub fn total_detections(&self) -> usize {
    self.total_detections
  }

  pub fn average_confidence(&self) -> f64 {
    self.average_confidence
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(class_id: u32, score: f32, bbox: [f32; 4]) -> DetectItem {
    DetectItem {
      class_id,
      score,
      bbox,
    }
  }

  fn aggregate(items: Vec<DetectItem>) -> Result<AnalysisResult, AnalysisError> {
    Aggregator::default().aggregate(Path::new("sample.png"), (64, 48), &items.into())
  }

  #[test]
  fn two_phase_scenario() {
    let result = aggregate(vec![
      item(0, 0.9, [0.0, 0.0, 10.0, 10.0]),
      item(1, 0.8, [0.0, 0.0, 4.0, 5.0]),
    ])
    .unwrap();

    let stats = result.statistics();
    assert_eq!(stats.total_detections(), 2);
    assert_eq!(stats.phase_counts().get("Ferrit"), Some(&1));
    assert_eq!(stats.phase_counts().get("Perlit"), Some(&1));
    assert_eq!(stats.phase_counts().len(), 2);
    assert_eq!(stats.phase_areas().get("Ferrit"), Some(&100.0));
    assert_eq!(stats.phase_areas().get("Perlit"), Some(&20.0));
    assert!((stats.average_confidence() - 0.85).abs() < 1e-6);
    assert_eq!(result.dimensions(), (64, 48));
    assert_eq!(result.image_name(), "sample.png");
  }

  #[test]
  fn empty_detections_give_zero_average() {
    let result = aggregate(Vec::new()).unwrap();
    let stats = result.statistics();
    assert_eq!(stats.total_detections(), 0);
    assert_eq!(stats.average_confidence(), 0.0);
    assert!(stats.phase_counts().is_empty());
    assert!(stats.phase_areas().is_empty());
  }

  #[test]
  fn unknown_class_is_kept() {
    let result = aggregate(vec![
      item(0, 0.7, [1.0, 1.0, 2.0, 2.0]),
      item(99, 0.6, [1.0, 1.0, 3.0, 3.0]),
    ])
    .unwrap();

    let counts = result.statistics().phase_counts();
    assert_eq!(counts.get("Ferrit"), Some(&1));
    assert_eq!(counts.get("Unknown"), Some(&1));
    assert_eq!(result.detections()[1].class_id(), 99);
    assert_eq!(result.detections()[1].phase(), "Unknown");
  }

  #[test]
  fn counts_sum_to_total_and_areas_match_boxes() {
    let items: Vec<_> = (0..23u32)
      .map(|i| {
        let x = i as f32;
        item(i % 7, 0.5, [x, 2.0 * x, x + 1.5 + x, 2.0 * x + 0.5 * x])
      })
      .collect();
    let result = aggregate(items).unwrap();

    let stats = result.statistics();
    assert_eq!(stats.phase_counts().values().sum::<usize>(), stats.total_detections());
    assert_eq!(stats.total_detections(), 23);
    for detection in result.detections() {
      let b = detection.bbox();
      let expected = (b.x2() - b.x1()) as f64 * (b.y2() - b.y1()) as f64;
      assert_eq!(detection.area(), expected);
      assert!(detection.area() >= 0.0);
    }
  }

  #[test]
  fn detections_keep_detector_order() {
    let result = aggregate(vec![
      item(2, 0.9, [0.0, 0.0, 1.0, 1.0]),
      item(0, 0.8, [0.0, 0.0, 1.0, 1.0]),
      item(2, 0.7, [0.0, 0.0, 1.0, 1.0]),
    ])
    .unwrap();
    let phases: Vec<_> = result.detections().iter().map(|d| d.phase()).collect();
    assert_eq!(phases, ["Austenit", "Ferrit", "Austenit"]);
  }

  #[test]
  fn negative_area_box_is_rejected() {
    let err = aggregate(vec![
      item(0, 0.9, [0.0, 0.0, 10.0, 10.0]),
      item(1, 0.9, [10.0, 0.0, 5.0, 10.0]),
    ])
    .unwrap_err();
    assert_eq!(
      err,
      AnalysisError::InvalidBox {
        index: 1,
        bbox: [10.0, 0.0, 5.0, 10.0]
      }
    );

    let err = aggregate(vec![item(0, 0.9, [0.0, f32::NAN, 1.0, 1.0])]).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidBox { index: 0, .. }));
  }

  #[test]
  fn zero_area_box_is_accepted() {
    let result = aggregate(vec![item(3, 0.9, [5.0, 5.0, 5.0, 9.0])]).unwrap();
    assert_eq!(result.detections()[0].area(), 0.0);
  }

  #[test]
  fn out_of_range_confidence_is_rejected() {
    let err = aggregate(vec![item(0, 1.5, [0.0, 0.0, 1.0, 1.0])]).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidConfidence { index: 0, .. }));
  }

  #[test]
  fn custom_table_names_detections() {
    let phases = PhaseTable::from_json_str(
      r#"{"phases": [{"id": 0, "name": "Ledeburit", "color": [1, 2, 3]}]}"#,
    )
    .unwrap();
    let result = Aggregator::new(phases)
      .aggregate(
        Path::new("x.png"),
        (1, 1),
        &vec![item(0, 0.5, [0.0, 0.0, 1.0, 1.0])].into(),
      )
      .unwrap();
    assert_eq!(result.detections()[0].phase(), "Ledeburit");
  }

  #[test]
  fn batch_average_ignores_empty_images() {
    let now = Local::now();
    let bbox = BoundingBox::new(0.0, 0.0, 2.0, 2.0).unwrap();
    let with = |scores: &[f32]| {
      let detections = scores
        .iter()
        .map(|&s| Detection::new(bbox, s, 0, "Ferrit"))
        .collect();
      AnalysisResult::new("a.png", (2, 2), detections, now)
    };

    let summary = BatchSummary::new(
      vec![with(&[0.5, 0.7]), with(&[]), with(&[0.9])],
      vec![BatchFailure {
        image_path: "broken.png".into(),
        cause: "decode".to_string(),
      }],
    );

    assert_eq!(summary.processed(), 3);
    assert_eq!(summary.total_detections(), 3);
    assert!((summary.average_confidence() - 0.75).abs() < 1e-6);
    assert_eq!(summary.failures().len(), 1);
  }

  #[test]
  fn empty_batch_has_zero_average() {
    let summary = BatchSummary::new(Vec::new(), Vec::new());
    assert_eq!(summary.processed(), 0);
    assert_eq!(summary.average_confidence(), 0.0);
  }
}
