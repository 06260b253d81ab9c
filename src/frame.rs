// 该文件是 Jinxiang （金相） 项目的一部分。
// src/frame.rs - 图像帧定义
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

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("无法打开图像文件 {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("无法解码图像文件 {path}: {source}")]
  Decode {
    path: PathBuf,
    #[source]
    source: image::ImageError,
  },
}

/// 已解码的 RGB 图像及其来源路径
#[derive(Debug, Clone)]
pub struct ImageFrame {
  path: PathBuf,
  image: RgbImage,
}

impl ImageFrame {
  pub fn new(path: impl Into<PathBuf>, image: RgbImage) -> Self {
    Self {
      path: path.into(),
      image,
    }
  }

  /// 读取并解码图像文件，格式按文件内容判断
  pub fn open(path: impl AsRef<Path>) -> Result<Self, FrameError> {
    let path = path.as_ref();
    let io_error = |source| FrameError::Io {
      path: path.to_path_buf(),
      source,
    };

    let image = ImageReader::open(path)
      .map_err(io_error)?
      .with_guessed_format()
      .map_err(io_error)?
      .decode()
      .map_err(|source| FrameError::Decode {
        path: path.to_path_buf(),
        source,
      })?
      .to_rgb8();

    debug!(
      "读取图像 {}: {}x{}",
      path.display(),
      image.width(),
      image.height()
    );

    Ok(Self::new(path, image))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn image(&self) -> &RgbImage {
    &self.image
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  /// 不含扩展名的文件名，用于生成输出文件名
  pub fn stem(&self) -> &str {
    self
      .path
      .file_stem()
      .and_then(|s| s.to_str())
      .unwrap_or("image")
  }
}
