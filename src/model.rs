// 该文件是 Fengxiang （风向） 项目的一部分。
// src/model.rs - 模型
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

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 单个检测结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectItem {
  pub class_id: u32,
  pub score: f32,
  pub bbox: [f32; 4], // [y_min, x_min, y_max, x_max]，相对输入图像归一化
}

impl DetectItem {
  pub fn y_min(&self) -> f32 {
    self.bbox[0]
  }

  pub fn x_min(&self) -> f32 {
    self.bbox[1]
  }

  pub fn y_max(&self) -> f32 {
    self.bbox[2]
  }

  pub fn x_max(&self) -> f32 {
    self.bbox[3]
  }
}

/// 检测器的原始输出：检测数量与三个按下标对齐的数组
#[derive(Debug, Clone, Default)]
pub struct RawDetections {
  pub num_detections: usize,
  pub scores: Vec<f32>,
  pub boxes: Vec<[f32; 4]>,
  pub classes: Vec<u32>,
}

impl RawDetections {
  /// 截断到检测器报告的数量后按下标组合
  pub fn items(&self) -> impl Iterator<Item = DetectItem> + '_ {
    self
      .scores
      .iter()
      .zip(self.boxes.iter())
      .zip(self.classes.iter())
      .take(self.num_detections)
      .map(|((&score, &bbox), &class_id)| DetectItem {
        class_id,
        score,
        bbox,
      })
  }
}

impl FromIterator<DetectItem> for RawDetections {
  fn from_iter<T: IntoIterator<Item = DetectItem>>(iter: T) -> Self {
    let mut raw = RawDetections::default();
    for item in iter {
      raw.scores.push(item.score);
      raw.boxes.push(item.bbox);
      raw.classes.push(item.class_id);
      raw.num_detections += 1;
    }
    raw
  }
}

#[cfg(feature = "model_rknn")]
mod rune_ssd;
#[cfg(feature = "model_rknn")]
pub use self::rune_ssd::{RuneSsd, RuneSsdBuilder, RuneSsdError};
