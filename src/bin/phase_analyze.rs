// 该文件是 Jinxiang （金相） 项目的一部分。
// src/bin/phase_analyze.rs - 单张图像分析
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

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use jinxiang::{
  FromUrl,
  config::{AnalyzerConfig, DEFAULT_CONFIDENCE},
  model::RecordDetector,
  task::analyze_image,
};

/// 金相组织单张图像分析
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测器地址，例如 record:///path/to/records
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图像
  #[arg(long, value_name = "IMAGE")]
  pub input: PathBuf,
  /// 输出目录，写入标注图像与 report.txt
  #[arg(long, value_name = "DIR")]
  pub output: PathBuf,
  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_CONFIDENCE, value_name = "THRESHOLD")]
  pub confidence: f32,
  /// 类别表 JSON 文件
  #[arg(long, value_name = "FILE")]
  pub phases: Option<PathBuf>,
  /// 标签字体（TrueType）
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,
  /// 同时输出 JSON 结果
  #[arg(long)]
  pub json: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("检测器: {}", args.model);
  info!("输入图像: {}", args.input.display());
  info!("输出目录: {}", args.output.display());
  info!("置信度阈值: {}", args.confidence);

  let config = AnalyzerConfig::default()
    .with_confidence(args.confidence)?
    .with_phases_file(args.phases.as_deref())?
    .with_font(args.font)
    .with_json(args.json);
  let model = RecordDetector::from_url(&args.model)?;

  let result = analyze_image(&config, model, &args.input, &args.output)?;

  let stats = result.statistics();
  info!("总检测数: {}", stats.total_detections());
  info!("平均置信度: {:.2}%", stats.average_confidence() * 100.0);
  for (phase, count) in stats.phase_counts() {
    info!("  - {}: {}", phase, count);
  }

  Ok(())
}
