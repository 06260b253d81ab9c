// 该文件是 Jinxiang （金相） 项目的一部分。
// src/output/save_image_file.rs - 保存标注图像
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
use tracing::info;

use crate::{
  analysis::AnalysisResult,
  frame::ImageFrame,
  output::{Render, draw::Draw},
};

const RESULT_SUFFIX: &str = "_result.jpg";

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误 {path}: {source}")]
  IoError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("图像编码错误 {path}: {source}")]
  ImageError {
    path: PathBuf,
    #[source]
    source: image::ImageError,
  },
}

/// 将标注后的图像保存为 `<directory>/<stem>_result.jpg`
pub struct SaveImageFileOutput {
  directory: PathBuf,
  draw: Draw,
}

impl SaveImageFileOutput {
  pub fn new(directory: impl Into<PathBuf>, draw: Draw) -> Self {
    Self {
      directory: directory.into(),
      draw,
    }
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  pub fn output_path(&self, result: &AnalysisResult) -> PathBuf {
    let stem = result
      .image_path()
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_else(|| "image".to_string());
    self.directory.join(format!("{}{}", stem, RESULT_SUFFIX))
  }

  fn save_image(&self, image: image::RgbImage, path: &Path) -> Result<(), SaveImageFileError> {
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(|source| SaveImageFileError::IoError {
        path: parent.to_path_buf(),
        source,
      })?;
    }

    image
      .save(path)
      .map_err(|source| SaveImageFileError::ImageError {
        path: path.to_path_buf(),
        source,
      })?;

    info!("保存图像到文件: {}", path.display());

    Ok(())
  }
}

impl Render<ImageFrame, AnalysisResult> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &ImageFrame, result: &AnalysisResult) -> Result<(), Self::Error> {
    let image = self.draw.render(frame.image(), result);
    self.save_image(image, &self.output_path(result))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::analysis::Aggregator;
  use crate::model::DetectItem;

  #[test]
  fn writes_result_jpeg_named_after_source() {
    let dir = tempfile::tempdir().unwrap();
    let frame = ImageFrame::new("in/grain.png", image::RgbImage::new(32, 24));
    let result = Aggregator::default()
      .aggregate(
        frame.path(),
        (32, 24),
        &vec![DetectItem {
          class_id: 2,
          score: 0.75,
          bbox: [2.0, 2.0, 20.0, 20.0],
        }]
        .into(),
      )
      .unwrap();

    let output = SaveImageFileOutput::new(dir.path().join("images"), Draw::default());
    output.render_result(&frame, &result).unwrap();

    let path = dir.path().join("images").join("grain_result.jpg");
    assert_eq!(output.output_path(&result), path);
    let saved = image::open(&path).unwrap();
    assert_eq!((saved.width(), saved.height()), (32, 24));
  }
}
