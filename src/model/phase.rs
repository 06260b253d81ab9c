// 该文件是 Jinxiang （金相） 项目的一部分。
// src/model/phase.rs - 金相组织类别表
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

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// 未知类别 id 统一归入的名称
pub const UNKNOWN_PHASE: &str = "Unknown";
/// 未知类别使用的中性灰
pub const UNKNOWN_COLOR: [u8; 3] = [128, 128, 128];

#[derive(Error, Debug)]
pub enum PhaseTableError {
  #[error("无法读取类别表 {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("类别表格式错误: {0}")]
  Json(#[from] serde_json::Error),
  #[error("类别 id 重复: {0}")]
  DuplicateId(u32),
  #[error("类别名称重复: {0}")]
  DuplicateName(String),
  #[error("类别名称无效: {0:?}")]
  InvalidName(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseLabel {
  pub id: u32,
  pub name: String,
  pub color: [u8; 3],
}

impl PhaseLabel {
  pub fn new(id: u32, name: &str, color: [u8; 3]) -> Self {
    Self {
      id,
      name: name.to_string(),
      color,
    }
  }
}

/// 类别 id → 名称、颜色的只读映射
///
/// 构造后不可修改；聚合与绘制都从同一张表取值。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseTable {
  phases: Vec<PhaseLabel>,
  unknown_color: [u8; 3],
}

#[derive(Deserialize)]
struct PhaseTableFile {
  phases: Vec<PhaseLabel>,
  #[serde(default)]
  unknown_color: Option<[u8; 3]>,
}

impl Default for PhaseTable {
  fn default() -> Self {
    Self {
      phases: vec![
        PhaseLabel::new(0, "Ferrit", [255, 0, 0]),
        PhaseLabel::new(1, "Perlit", [0, 255, 0]),
        PhaseLabel::new(2, "Austenit", [0, 0, 255]),
        PhaseLabel::new(3, "Martenzit", [255, 255, 0]),
        PhaseLabel::new(4, "Bainit", [255, 0, 255]),
      ],
      unknown_color: UNKNOWN_COLOR,
    }
  }
}

impl PhaseTable {
  pub fn new(phases: Vec<PhaseLabel>) -> Result<Self, PhaseTableError> {
    for (i, phase) in phases.iter().enumerate() {
      let name = phase.name.trim();
      if name.is_empty() || name != phase.name || name == UNKNOWN_PHASE {
        return Err(PhaseTableError::InvalidName(phase.name.clone()));
      }
      let earlier = &phases[..i];
      if earlier.iter().any(|p| p.id == phase.id) {
        return Err(PhaseTableError::DuplicateId(phase.id));
      }
      if earlier.iter().any(|p| p.name == phase.name) {
        return Err(PhaseTableError::DuplicateName(phase.name.clone()));
      }
    }

    Ok(Self {
      phases,
      unknown_color: UNKNOWN_COLOR,
    })
  }

  pub fn with_unknown_color(mut self, color: [u8; 3]) -> Self {
    self.unknown_color = color;
    self
  }

  /// 从 JSON 文件读取类别表，格式为
  /// `{"phases": [{"id": 0, "name": "Ferrit", "color": [255, 0, 0]}], "unknown_color": [128, 128, 128]}`
  pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PhaseTableError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| PhaseTableError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    let table = Self::from_json_str(&text)?;
    info!("从 {} 载入 {} 个类别", path.display(), table.len());
    Ok(table)
  }

  pub fn from_json_str(text: &str) -> Result<Self, PhaseTableError> {
    let file: PhaseTableFile = serde_json::from_str(text)?;
    let table = Self::new(file.phases)?;
    Ok(match file.unknown_color {
      Some(color) => table.with_unknown_color(color),
      None => table,
    })
  }

  pub fn phases(&self) -> &[PhaseLabel] {
    &self.phases
  }

  pub fn len(&self) -> usize {
    self.phases.len()
  }

  pub fn is_empty(&self) -> bool {
    self.phases.is_empty()
  }

  /// 未登记的 id 返回 [`UNKNOWN_PHASE`]
  pub fn name_of(&self, class_id: u32) -> &str {
    self
      .phases
      .iter()
      .find(|p| p.id == class_id)
      .map(|p| p.name.as_str())
      .unwrap_or(UNKNOWN_PHASE)
  }

  pub fn color_of(&self, name: &str) -> [u8; 3] {
    self
      .phases
      .iter()
      .find(|p| p.name == name)
      .map(|p| p.color)
      .unwrap_or(self.unknown_color)
  }

  pub fn unknown_color(&self) -> [u8; 3] {
    self.unknown_color
  }
}
