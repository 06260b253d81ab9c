// 该文件是 Jinxiang （金相） 项目的一部分。
// src/output.rs - 输出定义
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

use thiserror::Error;

pub trait Render<Frame, Output> {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

pub mod draw;

mod save_image_file;
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};

mod report;
pub use self::report::{
  ReportError, TextReportOutput, format_batch_summary, format_report, write_batch_summary,
  write_json, write_report,
};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("保存图像文件错误: {0}")]
  SaveImageFileError(#[from] SaveImageFileError),
  #[error("报告输出错误: {0}")]
  ReportError(#[from] ReportError),
}

/// 依次交给两个输出，前一个失败时不再执行后一个
impl<F, R, A, B> Render<F, R> for (A, B)
where
  A: Render<F, R>,
  B: Render<F, R>,
  OutputError: From<A::Error> + From<B::Error>,
{
  type Error = OutputError;

  fn render_result(&self, frame: &F, result: &R) -> Result<(), Self::Error> {
    self.0.render_result(frame, result)?;
    self.1.render_result(frame, result)?;
    Ok(())
  }
}
