// 该文件是 Fengxiang （风向） 项目的一部分。
// src/model/rune_ssd.rs - RKNN 上的符文箭头 SSD 检测模型
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

use image::imageops::{self, FilterType};
use rknpu::{Context, InitFlags, TensorFormat, TensorType};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbNhwcFrame,
  input::AsNhwcFrame,
  model::{Model, RawDetections},
};

const RUNE_SSD_NUM_INPUTS: u32 = 1;
const RUNE_SSD_NUM_OUTPUTS: u32 = 4;

// 输出张量顺序与导出脚本保持一致
const OUTPUT_BOXES: usize = 0;
const OUTPUT_CLASSES: usize = 1;
const OUTPUT_SCORES: usize = 2;
const OUTPUT_NUM_DETECTIONS: usize = 3;

/// 输入尺寸固定为 W x H 的 SSD 检测模型；输出框已归一化，缩放输入不影响结果
pub struct RuneSsd<const W: u32, const H: u32> {
  context: Context,
}

#[derive(Error, Debug)]
pub enum RuneSsdError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(std::io::Error),
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, rknpu::Error),
  #[error("RKNN 错误: {0}")]
  RknnError(rknpu::Error),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("输入图像为空")]
  EmptyInput,
  #[error("模型输出格式错误: {0}")]
  MalformedOutput(String),
}

impl From<std::io::Error> for RuneSsdError {
  fn from(err: std::io::Error) -> Self {
    RuneSsdError::ModelLoadError(err)
  }
}

impl From<rknpu::Error> for RuneSsdError {
  fn from(err: rknpu::Error) -> Self {
    RuneSsdError::RknnError(err)
  }
}

impl RuneSsdError {
  pub fn invalid(msg: &str, e: rknpu::Error) -> Self {
    RuneSsdError::ModelInvalid(msg.to_string(), e)
  }
}

pub struct RuneSsdBuilder {
  model_path: String,
  flags: InitFlags,
}

impl FromUrlWithScheme for RuneSsdBuilder {
  const SCHEME: &'static str = "rknn";
}

impl FromUrl for RuneSsdBuilder {
  type Error = RuneSsdError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(RuneSsdError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(RuneSsdBuilder {
      model_path: url.path().to_string(),
      flags: InitFlags::default(),
    })
  }
}

impl RuneSsdBuilder {
  pub fn flags(mut self, flags: InitFlags) -> Self {
    self.flags = flags;
    self
  }

  pub fn build<const W: u32, const H: u32>(self) -> Result<RuneSsd<W, H>, RuneSsdError> {
    info!("加载模型文件: {}", self.model_path);
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    info!("创建 RKNN 推理上下文");
    let context = Context::new(&model_data, self.flags)?;

    match context.sdk_version() {
      Ok(version) => {
        if let Ok(api_ver) = version.api_version() {
          debug!("模型 API 版本: {}", api_ver);
        }
        if let Ok(drv_ver) = version.driver_version() {
          debug!("模型驱动版本: {}", drv_ver);
        }
      }
      Err(e) => {
        error!("查询 SDK 版本失败: {}", e);
        return Err(RuneSsdError::invalid("无法查询 SDK 版本", e));
      }
    }

    let num_inputs = context
      .num_inputs()
      .map_err(|e| RuneSsdError::invalid("无法获取输入数量", e))?;
    let num_outputs = context
      .num_outputs()
      .map_err(|e| RuneSsdError::invalid("无法获取输出数量", e))?;

    if num_inputs != RUNE_SSD_NUM_INPUTS {
      let msg = format!(
        "预期模型输入数量为 {}, 实际为 {}",
        RUNE_SSD_NUM_INPUTS, num_inputs
      );
      error!("{}", msg);
      return Err(RuneSsdError::invalid(&msg, rknpu::Error::InvalidModel));
    }

    if num_outputs != RUNE_SSD_NUM_OUTPUTS {
      let msg = format!(
        "预期模型输出数量为 {}, 实际为 {}",
        RUNE_SSD_NUM_OUTPUTS, num_outputs
      );
      error!("{}", msg);
      return Err(RuneSsdError::invalid(&msg, rknpu::Error::InvalidModel));
    }

    info!("模型加载完成，输入尺寸 {}x{}", W, H);
    Ok(RuneSsd { context })
  }
}

impl<const W: u32, const H: u32> RuneSsd<W, H> {
  fn postprocess(output: rknpu::Output) -> Result<RawDetections, RuneSsdError> {
    debug!("后处理模型输出");
    let num = output.get_f32(OUTPUT_NUM_DETECTIONS)?;
    let boxes = output.get_f32(OUTPUT_BOXES)?;
    let classes = output.get_f32(OUTPUT_CLASSES)?;
    let scores = output.get_f32(OUTPUT_SCORES)?;

    let num_detections = num.first().copied().unwrap_or(0.0).max(0.0) as usize;
    let available = scores.len().min(classes.len()).min(boxes.len() / 4);
    if num_detections > available {
      return Err(RuneSsdError::MalformedOutput(format!(
        "检测数量 {} 超过输出长度 {}",
        num_detections, available
      )));
    }

    let raw = RawDetections {
      num_detections,
      scores: scores[..num_detections].to_vec(),
      boxes: boxes
        .chunks_exact(4)
        .take(num_detections)
        .map(|c| [c[0], c[1], c[2], c[3]])
        .collect(),
      classes: classes[..num_detections]
        .iter()
        .map(|&c| c.round() as u32)
        .collect(),
    };
    debug!("检测到 {} 个候选", raw.num_detections);

    Ok(raw)
  }
}

impl<const W: u32, const H: u32> Model for RuneSsd<W, H> {
  type Input = RgbNhwcFrame;
  type Output = RawDetections;
  type Error = RuneSsdError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    if input.is_empty() {
      return Err(RuneSsdError::EmptyInput);
    }

    let resized;
    let data = if input.width() == W as usize && input.height() == H as usize {
      input.as_nhwc()
    } else {
      debug!(
        "输入 {}x{} 缩放到 {}x{}",
        input.width(),
        input.height(),
        W,
        H
      );
      resized = imageops::resize(&input.to_rgb_image(), W, H, FilterType::Triangle);
      resized.as_raw().as_slice()
    };

    debug!("设置模型输入");
    self
      .context
      .set_input(0, data, TensorFormat::NHWC, TensorType::UInt8)?;

    debug!("执行模型推理");
    self.context.run()?;

    let output = self.context.get_outputs()?;
    Self::postprocess(output)
  }
}
