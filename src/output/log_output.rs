// 该文件是 Fengxiang （风向） 项目的一部分。
// src/output/log_output.rs - 日志输出
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

use std::sync::atomic::{AtomicUsize, Ordering};

use image::RgbImage;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, output::Render, rune::RuneReading};

#[derive(Error, Debug)]
pub enum LogOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// 只把识别结果写进日志
#[derive(Default)]
pub struct LogOutput {
  frame_counter: AtomicUsize,
}

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = LogOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LogOutputError::SchemeMismatch);
    }
    Ok(LogOutput::default())
  }
}

impl Render<RgbImage, RuneReading> for LogOutput {
  type Error = LogOutputError;

  fn render_result(&self, frame: &RgbImage, result: &RuneReading) -> Result<(), Self::Error> {
    let index = self.frame_counter.fetch_add(1, Ordering::Relaxed) + 1;
    if result.is_solved() {
      let arrows: Vec<&str> = result.arrows.iter().map(|a| a.as_str()).collect();
      info!("第 {} 帧: {}", index, arrows.join(" "));
    } else {
      warn!(
        "第 {} 帧 ({}x{}): 未能识别 ({})",
        index,
        frame.width(),
        frame.height(),
        result.outcome.as_str()
      );
    }
    Ok(())
  }
}
