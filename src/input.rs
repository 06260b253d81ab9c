// 该文件是 Jinxiang （金相） 项目的一部分。
// src/input.rs - 图像目录输入
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
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::frame::{FrameError, ImageFrame};

/// 支持的图像扩展名（不区分大小写）
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "tiff"];

#[derive(Error, Debug)]
pub enum InputError {
  #[error("输入目录不存在: {0}")]
  DirectoryNotFound(PathBuf),
  #[error("无法读取输入目录 {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("{0}")]
  Frame(#[from] FrameError),
  #[error("stem 重复: {path} 与 {first} 的输出文件同名")]
  DuplicateStem { path: PathBuf, first: PathBuf },
}

pub fn is_supported_image(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| {
      let ext = ext.to_ascii_lowercase();
      IMAGE_EXTENSIONS.contains(&ext.as_str())
    })
    .unwrap_or(false)
}

/// 目录中的图像文件列表（不递归子目录）
///
/// 同一 stem 只处理排序后的第一个文件，其余文件的输出会与之同名，
/// 迭代时以 [`InputError::DuplicateStem`] 返回。
#[derive(Debug, Clone)]
pub struct ImageDirectoryInput {
  directory: PathBuf,
  files: Vec<PathBuf>,
  duplicates: HashMap<PathBuf, PathBuf>,
}

impl ImageDirectoryInput {
  pub fn open(directory: impl AsRef<Path>) -> Result<Self, InputError> {
    let directory = directory.as_ref();
    if !directory.is_dir() {
      return Err(InputError::DirectoryNotFound(directory.to_path_buf()));
    }

    let io_error = |source| InputError::Io {
      path: directory.to_path_buf(),
      source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(directory).map_err(io_error)? {
      let path = entry.map_err(io_error)?.path();
      if path.is_file() && is_supported_image(&path) {
        files.push(path);
      } else {
        debug!("跳过非图像条目: {}", path.display());
      }
    }
    // 按文件名排序，使报告顺序稳定
    files.sort();

    let mut stems: HashMap<&std::ffi::OsStr, &PathBuf> = HashMap::new();
    let mut duplicates = HashMap::new();
    for path in &files {
      let Some(stem) = path.file_stem() else {
        continue;
      };
      match stems.get(stem) {
        Some(&first) => {
          warn!(
            "{} 与 {} 的 stem 相同，将被跳过",
            path.display(),
            first.display()
          );
          duplicates.insert(path.clone(), first.clone());
        }
        None => {
          stems.insert(stem, path);
        }
      }
    }

    info!("在 {} 中找到 {} 个图像", directory.display(), files.len());

    Ok(Self {
      directory: directory.to_path_buf(),
      files,
      duplicates,
    })
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  pub fn files(&self) -> &[PathBuf] {
    &self.files
  }

  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }

  /// 与先前文件 stem 重复的文件
  pub fn duplicates(&self) -> &HashMap<PathBuf, PathBuf> {
    &self.duplicates
  }

  /// 逐个解码图像；失败的条目以 `Err` 返回，不会中断迭代
  pub fn into_frames(self) -> ImageDirectoryFrames {
    ImageDirectoryFrames {
      files: self.files.into_iter(),
      duplicates: self.duplicates,
    }
  }
}

pub struct ImageDirectoryFrames {
  files: std::vec::IntoIter<PathBuf>,
  duplicates: HashMap<PathBuf, PathBuf>,
}

impl Iterator for ImageDirectoryFrames {
  type Item = (PathBuf, Result<ImageFrame, InputError>);

  fn next(&mut self) -> Option<Self::Item> {
    self.files.next().map(|path| {
      let frame = match self.duplicates.remove(&path) {
        Some(first) => Err(InputError::DuplicateStem {
          path: path.clone(),
          first,
        }),
        None => ImageFrame::open(&path).map_err(InputError::from),
      };
      (path, frame)
    })
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    self.files.size_hint()
  }
}
