// 该文件是 Fengxiang （风向） 项目的一部分。
// src/bin/rune_oneshot.rs - 单张截图识别
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

use std::sync::atomic::Ordering;

use anyhow::Result;
use clap::Parser;
use image::RgbImage;
use tracing::info;
use url::Url;

use fengxiang::{
  FromUrl,
  input::{ImageFileInput, InputWrapper},
  model::RuneSsdBuilder,
  output::OutputWrapper,
  rune::{DetectionPolicy, RuneConfig, RuneSolver},
  task::{OneShotTask, Task},
};

/// 符文方向单次识别参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// RKNN 模型文件路径，例如 rknn:///opt/rune.rknn
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源，image:///path 或 folder:///path
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径，log://, image:///path 或 folder:///path
  #[arg(long, value_name = "OUTPUT", default_value = "log://")]
  pub output: Url,
  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub confidence: f32,
  /// 每次检测最多保留的结果数
  #[arg(long, default_value = "4", value_name = "COUNT")]
  pub max_detections: usize,
  /// 预热用截图，不指定时使用 1366x768 的黑图
  #[arg(long, value_name = "WARMUP")]
  pub warmup: Option<Url>,
  /// 启动时关闭识别，只预热检测器
  #[arg(long)]
  pub disabled: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let model = RuneSsdBuilder::from_url(&args.model)?.build::<455, 384>()?;
  let policy = DetectionPolicy::default()
    .with_threshold(args.confidence)
    .with_max_count(args.max_detections);
  let solver = RuneSolver::new(model).with_config(RuneConfig::default().with_policy(policy));

  let warmup = match &args.warmup {
    Some(url) => ImageFileInput::from_url(url)?.next(),
    None => None,
  };
  solver.warm_up(&warmup.unwrap_or_else(|| RgbImage::new(1366, 768)))?;
  if args.disabled {
    info!("符文识别已关闭");
    solver.toggle().store(false, Ordering::Relaxed);
  }

  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;

  OneShotTask.run_task(input, solver, output)?;

  Ok(())
}
