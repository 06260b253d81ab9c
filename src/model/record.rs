// 该文件是 Jinxiang （金相） 项目的一部分。
// src/model/record.rs - 检测记录回放
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
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::ImageFrame,
  model::{DetectItem, DetectResult, Detector},
};

#[derive(Error, Debug)]
pub enum RecordDetectorError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{found}'")]
  SchemeMismatch { expected: String, found: String },
  #[error("URI 路径解码失败: {0}")]
  PathDecode(#[from] std::string::FromUtf8Error),
  #[error("记录目录不存在: {0}")]
  DirectoryNotFound(PathBuf),
  #[error("无法读取记录文件 {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("记录格式错误 (第 {line} 行): {reason}")]
  Malformed { line: usize, reason: String },
}

/// 回放外部模型已写好的检测记录
///
/// 对图像 `<stem>.<ext>`，读取记录目录下的 `<stem>.txt`，每行为
/// `class_id, score, x_min, y_min, x_max, y_max`（像素坐标）。
/// 空行和以 `#` 开头的行被忽略。
#[derive(Debug, Clone)]
pub struct RecordDetector {
  directory: PathBuf,
}

impl FromUrlWithScheme for RecordDetector {
  const SCHEME: &'static str = "record";
}

impl FromUrl for RecordDetector {
  type Error = RecordDetectorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(RecordDetectorError::SchemeMismatch {
        expected: Self::SCHEME.to_string(),
        found: url.scheme().to_string(),
      });
    }

    let path = urlencoding::decode(url.path())?;
    Self::new(&*path)
  }
}

impl RecordDetector {
  pub fn new(directory: impl AsRef<Path>) -> Result<Self, RecordDetectorError> {
    let directory = directory.as_ref();
    if !directory.is_dir() {
      return Err(RecordDetectorError::DirectoryNotFound(
        directory.to_path_buf(),
      ));
    }
    Ok(Self {
      directory: directory.to_path_buf(),
    })
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  pub fn record_path(&self, frame: &ImageFrame) -> PathBuf {
    self.directory.join(format!("{}.txt", frame.stem()))
  }

  pub fn parse_records(text: &str) -> Result<Vec<DetectItem>, RecordDetectorError> {
    let mut items = Vec::new();
    for (index, line) in text.lines().enumerate() {
      let line = line.trim();
      if line.is_empty() || line.starts_with('#') {
        continue;
      }
      items.push(parse_line(index + 1, line)?);
    }
    Ok(items)
  }
}

fn parse_line(line_no: usize, line: &str) -> Result<DetectItem, RecordDetectorError> {
  let malformed = |reason: String| RecordDetectorError::Malformed {
    line: line_no,
    reason,
  };

  let fields: Vec<&str> = line.split(',').map(str::trim).collect();
  if fields.len() != 6 {
    return Err(malformed(format!("期望 6 个字段, 实际 {} 个", fields.len())));
  }

  let class_id = fields[0]
    .parse::<u32>()
    .map_err(|e| malformed(format!("类别 id '{}': {}", fields[0], e)))?;

  let mut values = [0f32; 5];
  for (value, field) in values.iter_mut().zip(&fields[1..]) {
    *value = field
      .parse::<f32>()
      .map_err(|e| malformed(format!("数值 '{}': {}", field, e)))?;
  }

  Ok(DetectItem {
    class_id,
    score: values[0],
    bbox: [values[1], values[2], values[3], values[4]],
  })
}

impl Detector for RecordDetector {
  type Error = RecordDetectorError;

  fn detect(&self, frame: &ImageFrame, confidence: f32) -> Result<DetectResult, Self::Error> {
    let path = self.record_path(frame);
    let text = std::fs::read_to_string(&path).map_err(|source| RecordDetectorError::Io {
      path: path.clone(),
      source,
    })?;

    let items: Vec<DetectItem> = Self::parse_records(&text)?
      .into_iter()
      .filter(|item| item.score >= confidence)
      .collect();
    debug!(
      "{}: {} 条记录达到置信度阈值 {}",
      path.display(),
      items.len(),
      confidence
    );

    Ok(items.into())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn frame_named(name: &str) -> ImageFrame {
    ImageFrame::new(name, image::RgbImage::new(4, 4))
  }

  #[test]
  fn parses_lines_and_skips_comments() {
    let items = RecordDetector::parse_records(
      "# class, score, x1, y1, x2, y2\n\n0, 0.9, 0, 0, 10, 10\n 4 ,0.25,1.5,2,3,4.5\n",
    )
    .unwrap();

    assert_eq!(
      items,
      [
        DetectItem {
          class_id: 0,
          score: 0.9,
          bbox: [0.0, 0.0, 10.0, 10.0]
        },
        DetectItem {
          class_id: 4,
          score: 0.25,
          bbox: [1.5, 2.0, 3.0, 4.5]
        },
      ]
    );
  }

  #[test]
  fn reports_line_of_malformed_record() {
    let err = RecordDetector::parse_records("0, 0.9, 0, 0, 10, 10\n1, 0.8, 0, 0, 10\n").unwrap_err();
    assert!(matches!(err, RecordDetectorError::Malformed { line: 2, .. }));

    let err = RecordDetector::parse_records("ferrit, 0.9, 0, 0, 10, 10").unwrap_err();
    assert!(matches!(err, RecordDetectorError::Malformed { line: 1, .. }));
  }

  #[test]
  fn detect_filters_by_confidence() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
      dir.path().join("sample.txt"),
      "0, 0.9, 0, 0, 10, 10\n1, 0.3, 0, 0, 4, 5\n2, 0.5, 1, 1, 2, 2\n",
    )
    .unwrap();

    let detector = RecordDetector::new(dir.path()).unwrap();
    let result = detector.detect(&frame_named("imgs/sample.png"), 0.5).unwrap();
    let ids: Vec<_> = result.iter().map(|item| item.class_id).collect();
    assert_eq!(ids, [0, 2]);
  }

  #[test]
  fn missing_record_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let detector = RecordDetector::new(dir.path()).unwrap();
    let err = detector.detect(&frame_named("other.png"), 0.5).unwrap_err();
    assert!(matches!(err, RecordDetectorError::Io { .. }));
  }

  #[test]
  fn from_url_checks_scheme_and_directory() {
    let dir = tempfile::tempdir().unwrap();
    let url = Url::from_directory_path(dir.path()).unwrap();
    let err = RecordDetector::from_url(&url).unwrap_err();
    assert!(matches!(err, RecordDetectorError::SchemeMismatch { .. }));

    let url = Url::parse(&format!("record://{}", dir.path().display())).unwrap();
    let detector = RecordDetector::from_url(&url).unwrap();
    assert_eq!(detector.directory(), dir.path());

    let url = Url::parse("record:///no/such/records").unwrap();
    let err = RecordDetector::from_url(&url).unwrap_err();
    assert!(matches!(err, RecordDetectorError::DirectoryNotFound(_)));
  }
}
