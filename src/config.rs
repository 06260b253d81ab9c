// 该文件是 Jinxiang （金相） 项目的一部分。
// src/config.rs - 分析参数配置
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

use thiserror::Error;

use crate::{
  analysis::Aggregator,
  model::{PhaseTable, PhaseTableError},
  output::draw::Draw,
};

pub const DEFAULT_CONFIDENCE: f32 = 0.5;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("置信度阈值必须在 0.0 - 1.0 之间: {0}")]
  ConfidenceOutOfRange(f32),
  #[error("类别表错误: {0}")]
  Phases(#[from] PhaseTableError),
}

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
  confidence: f32,
  phases: PhaseTable,
  font: Option<PathBuf>,
  export_json: bool,
}

impl Default for AnalyzerConfig {
  fn default() -> Self {
    Self {
      confidence: DEFAULT_CONFIDENCE,
      phases: PhaseTable::default(),
      font: None,
      export_json: false,
    }
  }
}

impl AnalyzerConfig {
  pub fn with_confidence(mut self, confidence: f32) -> Result<Self, ConfigError> {
    if !(0.0..=1.0).contains(&confidence) {
      return Err(ConfigError::ConfidenceOutOfRange(confidence));
    }
    self.confidence = confidence;
    Ok(self)
  }

  pub fn with_phases(mut self, phases: PhaseTable) -> Self {
    self.phases = phases;
    self
  }

  /// 未给出路径时保留默认类别表
  pub fn with_phases_file(self, path: Option<&Path>) -> Result<Self, ConfigError> {
    match path {
      Some(path) => Ok(self.with_phases(PhaseTable::from_json_file(path)?)),
      None => Ok(self),
    }
  }

  pub fn with_font(mut self, font: Option<PathBuf>) -> Self {
    self.font = font;
    self
  }

  pub fn with_json(mut self, export_json: bool) -> Self {
    self.export_json = export_json;
    self
  }

  pub fn confidence(&self) -> f32 {
    self.confidence
  }

  pub fn phases(&self) -> &PhaseTable {
    &self.phases
  }

  pub fn font(&self) -> Option<&Path> {
    self.font.as_deref()
  }

  pub fn export_json(&self) -> bool {
    self.export_json
  }

  pub fn aggregator(&self) -> Aggregator {
    Aggregator::new(self.phases.clone())
  }

  pub fn draw(&self) -> Draw {
    Draw::new(self.phases.clone()).with_font_path(self.font())
  }
}
