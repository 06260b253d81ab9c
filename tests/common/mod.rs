// 该文件是 Jinxiang （金相） 项目的一部分。
// tests/common/mod.rs - 测试辅助
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

use std::collections::HashMap;
use std::path::Path;

use image::{Rgb, RgbImage};
use jinxiang::{
  frame::ImageFrame,
  model::{DetectItem, DetectResult, Detector},
};

/// 按文件名返回固定检测结果的检测器
#[derive(Default)]
pub struct StubDetector {
  detections: HashMap<String, Vec<DetectItem>>,
  failing: Vec<String>,
}

impl StubDetector {
  pub fn with(mut self, stem: &str, items: Vec<DetectItem>) -> Self {
    self.detections.insert(stem.to_string(), items);
    self
  }

  pub fn failing_on(mut self, stem: &str) -> Self {
    self.failing.push(stem.to_string());
    self
  }
}

impl Detector for StubDetector {
  type Error = std::io::Error;

  fn detect(&self, frame: &ImageFrame, confidence: f32) -> Result<DetectResult, Self::Error> {
    if self.failing.iter().any(|s| s == frame.stem()) {
      return Err(std::io::Error::other("model exploded"));
    }
    let items = self
      .detections
      .get(frame.stem())
      .cloned()
      .unwrap_or_default()
      .into_iter()
      .filter(|item| item.score >= confidence)
      .collect::<Vec<_>>();
    Ok(items.into())
  }
}

pub fn item(class_id: u32, score: f32, bbox: [f32; 4]) -> DetectItem {
  DetectItem {
    class_id,
    score,
    bbox,
  }
}

pub fn write_image(path: &Path, width: u32, height: u32) {
  RgbImage::from_pixel(width, height, Rgb([200, 200, 200]))
    .save(path)
    .expect("failed to write test image");
}
