// 该文件是 Jinxiang （金相） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
  analysis::{AnalysisResult, Detection},
  model::PhaseTable,
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_TEXT_HEIGHT: i32 = 20;
const LABEL_CHAR_WIDTH: f32 = 9.0; // 无字体时按每字符宽度估算
const LABEL_TEXT_PADDING: i32 = 2;
const LABEL_TEXT_COLOR: [u8; 3] = [255, 255, 255]; // 白色文本
const BOX_THICKNESS: i32 = 2;

/// 未指定字体时依次尝试的系统字体
const SYSTEM_FONTS: [&str; 6] = [
  "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/TTF/DejaVuSans.ttf",
  "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
  "/System/Library/Fonts/Supplemental/Arial.ttf",
  "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("无法读取字体文件 {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("字体文件无效: {0}")]
  InvalidFont(PathBuf),
}

pub fn load_font(path: &Path) -> Result<FontVec, DrawError> {
  let data = std::fs::read(path).map_err(|source| DrawError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  FontVec::try_from_vec(data).map_err(|_| DrawError::InvalidFont(path.to_path_buf()))
}

fn locate_system_font() -> Option<FontVec> {
  SYSTEM_FONTS.iter().map(Path::new).find_map(|path| {
    if !path.is_file() {
      return None;
    }
    let font = load_font(path).ok()?;
    debug!("使用系统字体: {}", path.display());
    Some(font)
  })
}

/// 在图像上绘制检测框和 "类别: 置信度" 标签
///
/// 颜色取自 [`PhaseTable`]。没有可用字体时仍绘制标签底色，只是不写字。
pub struct Draw {
  font: Option<FontVec>,
  font_size: f32,
  thickness: i32,
  phases: PhaseTable,
}

impl Default for Draw {
  fn default() -> Self {
    Self::new(PhaseTable::default())
  }
}

impl Draw {
  pub fn new(phases: PhaseTable) -> Self {
    Self {
      font: None,
      font_size: LABEL_FONT_SIZE,
      thickness: BOX_THICKNESS,
      phases,
    }
  }

  pub fn with_font(mut self, font: FontVec) -> Self {
    self.font = Some(font);
    self
  }

  /// 优先使用给定字体，失败时退回系统字体
  pub fn with_font_path(self, path: Option<&Path>) -> Self {
    let preferred = path.and_then(|path| match load_font(path) {
      Ok(font) => Some(font),
      Err(e) => {
        warn!("{}，尝试系统字体", e);
        None
      }
    });
    let font = preferred.or_else(locate_system_font);
    if font.is_none() {
      warn!("未找到可用字体，标签将只绘制底色");
    }
    Self { font, ..self }
  }

  pub fn with_font_size(mut self, font_size: f32) -> Self {
    self.font_size = font_size;
    self
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  pub fn phases(&self) -> &PhaseTable {
    &self.phases
  }

  /// 在原图副本上绘制，原图不变
  pub fn render(&self, image: &RgbImage, result: &AnalysisResult) -> RgbImage {
    let mut canvas = image.clone();
    self.draw_detections_on_image(&mut canvas, result.detections());
    canvas
  }

  pub fn draw_detections_on_image(&self, image: &mut RgbImage, detections: &[Detection]) {
    for detection in detections {
      self.draw_bbox_with_label(image, detection);
    }
  }

  fn draw_bbox_with_label(&self, image: &mut RgbImage, detection: &Detection) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }

    let bbox = detection.bbox();
    let x_min = (bbox.x1().floor() as i32).clamp(0, w - 1);
    let y_min = (bbox.y1().floor() as i32).clamp(0, h - 1);
    let x_max = (bbox.x2().ceil() as i32).clamp(0, w - 1);
    let y_max = (bbox.y2().ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    let color = Rgb(self.phases.color_of(detection.phase()));

    // 边框向内加粗
    for t in 0..self.thickness {
      let (left, top, right, bottom) = (x_min + t, y_min + t, x_max - t, y_max - t);
      if left >= right || top >= bottom {
        break;
      }
      let rect = Rect::at(left, top).of_size((right - left + 1) as u32, (bottom - top + 1) as u32);
      draw_hollow_rect_mut(image, rect, color);
    }

    let label = format!("{}: {:.2}", detection.phase(), detection.confidence());
    let scale = PxScale::from(self.font_size);

    let (text_width, text_height) = match &self.font {
      Some(font) => {
        let (tw, th) = text_size(scale, font, &label);
        (
          tw as i32 + 2 * LABEL_TEXT_PADDING,
          th as i32 + 2 * LABEL_TEXT_PADDING,
        )
      }
      None => (
        (label.len() as f32 * LABEL_CHAR_WIDTH) as i32,
        LABEL_TEXT_HEIGHT,
      ),
    };

    // 标签放在边框上方，贴住图像上沿
    let label_x = x_min;
    let label_y = (y_min - text_height).max(0);
    let label_width = text_width.min(w - label_x);
    let label_height = text_height.min(h - label_y);

    if label_width > 0 && label_height > 0 {
      let rect = Rect::at(label_x, label_y).of_size(label_width as u32, label_height as u32);
      draw_filled_rect_mut(image, rect, color);

      if let Some(font) = &self.font {
        draw_text_mut(
          image,
          Rgb(LABEL_TEXT_COLOR),
          label_x + LABEL_TEXT_PADDING,
          label_y + LABEL_TEXT_PADDING,
          scale,
          font,
          &label,
        );
      }
    }
  }
}
