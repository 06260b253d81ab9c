// 该文件是 Jinxiang （金相） 项目的一部分。
// src/task.rs - 单张与批量分析任务
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
use std::time::Instant;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
  analysis::{Aggregator, AnalysisError, AnalysisResult, BatchFailure, BatchSummary},
  config::AnalyzerConfig,
  frame::{FrameError, ImageFrame},
  input::{ImageDirectoryInput, InputError},
  model::Detector,
  output::{Render, ReportError, SaveImageFileOutput, TextReportOutput, write_batch_summary, write_json},
};

pub const IMAGES_DIR: &str = "images";
pub const SUMMARY_FILE: &str = "batch_summary.txt";
pub const SUMMARY_JSON_FILE: &str = "batch_summary.json";
pub const REPORT_FILE: &str = "report.txt";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum TaskError {
  #[error("{0}")]
  Frame(#[from] FrameError),
  #[error("{0}")]
  Input(#[from] InputError),
  #[error("检测失败: {0}")]
  Detect(#[source] BoxError),
  #[error("检测结果无效: {0}")]
  Analysis(#[from] AnalysisError),
  #[error("输出失败: {0}")]
  Render(#[source] BoxError),
  #[error("{0}")]
  Report(#[from] ReportError),
  #[error("无法创建输出目录 {path}: {source}")]
  OutputDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

/// 检测 + 聚合，不产生任何输出
pub fn analyze_frame<M: Detector>(
  model: &M,
  aggregator: &Aggregator,
  confidence: f32,
  frame: &ImageFrame,
) -> Result<AnalysisResult, TaskError> {
  let now = Instant::now();
  let raw = model
    .detect(frame, confidence)
    .map_err(|e| TaskError::Detect(Box::new(e)))?;
  let result = aggregator.aggregate(frame.path(), (frame.width(), frame.height()), &raw)?;
  info!(
    "{}: 检测到 {} 个目标，耗时 {:.2?}",
    frame.path().display(),
    result.statistics().total_detections(),
    now.elapsed()
  );
  Ok(result)
}

fn ensure_dir(path: &Path) -> Result<(), TaskError> {
  std::fs::create_dir_all(path).map_err(|source| TaskError::OutputDir {
    path: path.to_path_buf(),
    source,
  })
}

pub struct OneShotTask {
  aggregator: Aggregator,
  confidence: f32,
}

impl OneShotTask {
  pub fn new(config: &AnalyzerConfig) -> Self {
    Self {
      aggregator: config.aggregator(),
      confidence: config.confidence(),
    }
  }
}

impl<M, O, RE> Task<ImageFrame, M, O> for OneShotTask
where
  M: Detector,
  O: Render<ImageFrame, AnalysisResult, Error = RE>,
  RE: std::error::Error + Send + Sync + 'static,
{
  type Output = AnalysisResult;
  type Error = TaskError;

  fn run_task(self, frame: ImageFrame, model: M, output: O) -> Result<Self::Output, Self::Error> {
    info!("开始分析 {}", frame.path().display());
    let result = analyze_frame(&model, &self.aggregator, self.confidence, &frame)?;
    output
      .render_result(&frame, &result)
      .map_err(|e| TaskError::Render(Box::new(e)))?;
    Ok(result)
  }
}

/// 目录批处理：单张失败只记录并跳过，最后写出汇总
pub struct BatchTask {
  aggregator: Aggregator,
  confidence: f32,
  output_dir: PathBuf,
  export_json: bool,
}

impl BatchTask {
  pub fn new(config: &AnalyzerConfig, output_dir: impl Into<PathBuf>) -> Self {
    Self {
      aggregator: config.aggregator(),
      confidence: config.confidence(),
      output_dir: output_dir.into(),
      export_json: config.export_json(),
    }
  }

  pub fn output_dir(&self) -> &Path {
    &self.output_dir
  }

  pub fn images_dir(&self) -> PathBuf {
    self.output_dir.join(IMAGES_DIR)
  }

  pub fn summary_path(&self) -> PathBuf {
    self.output_dir.join(SUMMARY_FILE)
  }
}

impl<M, O, RE> Task<ImageDirectoryInput, M, O> for BatchTask
where
  M: Detector,
  O: Render<ImageFrame, AnalysisResult, Error = RE>,
  RE: std::error::Error + Send + Sync + 'static,
{
  type Output = BatchSummary;
  type Error = TaskError;

  fn run_task(
    self,
    input: ImageDirectoryInput,
    model: M,
    output: O,
  ) -> Result<Self::Output, Self::Error> {
    ensure_dir(&self.output_dir)?;
    ensure_dir(&self.images_dir())?;

    let total = input.len();
    info!("开始批处理: {} 个图像", total);
    if total == 0 {
      warn!("输入目录 {} 中没有可处理的图像", input.directory().display());
    }

    let now = Instant::now();
    let mut results = Vec::with_capacity(total);
    let mut failures = Vec::new();

    for (index, (path, frame)) in input.into_frames().enumerate() {
      info!("[{}/{}] 分析 {}", index + 1, total, path.display());
      let outcome = frame.map_err(TaskError::from).and_then(|frame| {
        let result = analyze_frame(&model, &self.aggregator, self.confidence, &frame)?;
        output
          .render_result(&frame, &result)
          .map_err(|e| TaskError::Render(Box::new(e)))?;
        Ok(result)
      });

      match outcome {
        Ok(result) => results.push(result),
        Err(e) => {
          error!("跳过 {}: {}", path.display(), e);
          failures.push(BatchFailure {
            image_path: path,
            cause: e.to_string(),
          });
        }
      }
    }

    let summary = BatchSummary::new(results, failures);
    info!(
      "批处理完成: 成功 {} 个, 失败 {} 个, 共 {} 个检测, 耗时 {:.2?}",
      summary.processed(),
      summary.failures().len(),
      summary.total_detections(),
      now.elapsed()
    );

    write_batch_summary(&summary, &self.summary_path())?;
    if self.export_json {
      write_json(&summary, &self.output_dir.join(SUMMARY_JSON_FILE))?;
    }

    Ok(summary)
  }
}

/// 分析单张图像，写出 `<output_dir>/<stem>_result.jpg` 与 `<output_dir>/report.txt`
pub fn analyze_image<M: Detector>(
  config: &AnalyzerConfig,
  model: M,
  image_path: &Path,
  output_dir: &Path,
) -> Result<AnalysisResult, TaskError> {
  let frame = ImageFrame::open(image_path)?;
  ensure_dir(output_dir)?;
  let output = (
    SaveImageFileOutput::new(output_dir, config.draw()),
    TextReportOutput::new(output_dir.join(REPORT_FILE)).with_json(config.export_json()),
  );
  OneShotTask::new(config).run_task(frame, model, output)
}

/// 分析目录下全部图像，标注图写入 `<output_dir>/images/`
pub fn run_batch<M: Detector>(
  config: &AnalyzerConfig,
  model: M,
  input_dir: &Path,
  output_dir: &Path,
) -> Result<BatchSummary, TaskError> {
  let input = ImageDirectoryInput::open(input_dir)?;
  let task = BatchTask::new(config, output_dir);
  let output = SaveImageFileOutput::new(task.images_dir(), config.draw());
  task.run_task(input, model, output)
}
