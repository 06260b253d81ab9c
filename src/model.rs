// 该文件是 Jinxiang （金相） 项目的一部分。
// src/model.rs - 检测模型接口
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

use crate::frame::ImageFrame;

/// 检测器给出的原始结果，坐标为像素坐标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectItem {
  pub class_id: u32,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]
}

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, DetectItem> {
    self.items.iter()
  }
}

impl From<Vec<DetectItem>> for DetectResult {
  fn from(items: Vec<DetectItem>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

/// 目标检测器
///
/// 模型本身不在本库内实现；任何能对一帧图像给出
/// `(bbox, score, class_id)` 列表的实现都可以接入。
/// 低于 `confidence` 的检测结果不应返回。
pub trait Detector {
  type Error: std::error::Error + Send + Sync + 'static;

  fn detect(&self, frame: &ImageFrame, confidence: f32) -> Result<DetectResult, Self::Error>;
}

impl<D: Detector + ?Sized> Detector for &D {
  type Error = D::Error;

  fn detect(&self, frame: &ImageFrame, confidence: f32) -> Result<DetectResult, Self::Error> {
    (**self).detect(frame, confidence)
  }
}

mod phase;
pub use self::phase::{PhaseLabel, PhaseTable, PhaseTableError, UNKNOWN_COLOR, UNKNOWN_PHASE};

mod record;
pub use self::record::{RecordDetector, RecordDetectorError};
