// 该文件是 Fengxiang （风向） 项目的一部分。
// src/rune/disambiguate.rs - 旋转双检测纠正左右方向
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

//! 左右箭头几乎互为镜像，检测器经常把二者弄反，而上下箭头的识别是可靠的。
//! 画布逆时针旋转 90° 后，原来的水平箭头变成竖直箭头：向右变为向上，向左变为向下。
//! 第二次检测给出的竖直标签因此可以替换第一次检测中的左右标签。

use std::collections::VecDeque;

use image::{RgbImage, imageops};
use tracing::debug;

use crate::{
  frame::RgbNhwcFrame,
  model::{DetectItem, Model, RawDetections},
  rune::{Arrow, DetectionClient, RuneError, UnknownClass},
};

/// 按框左边缘从左到右排序后转换为方向
pub fn primary_labels(mut items: Vec<DetectItem>) -> Result<Vec<Arrow>, UnknownClass> {
  items.sort_by(|a, b| a.x_min().total_cmp(&b.x_min()));
  items
    .iter()
    .map(|item| Arrow::try_from(item.class_id))
    .collect()
}

/// 旋转画布上的检测按框下边缘从下到上排序，即旋转前的从左到右；
/// 只保留竖直箭头并还原为水平方向
pub fn rotated_labels(mut items: Vec<DetectItem>) -> VecDeque<Arrow> {
  items.sort_by(|a, b| b.y_max().total_cmp(&a.y_max()));
  items
    .iter()
    .filter_map(|item| Arrow::try_from(item.class_id).ok())
    .filter_map(Arrow::unrotate)
    .collect()
}

/// 依次用旋转结果替换左右标签；上下标签保持不变，旋转结果用完后剩余的左右标签也保持不变
pub fn merge_labels(primary: Vec<Arrow>, rotated: impl IntoIterator<Item = Arrow>) -> Vec<Arrow> {
  let mut rotated = rotated.into_iter().fuse();
  primary
    .into_iter()
    .map(|arrow| {
      if arrow.is_horizontal() {
        rotated.next().unwrap_or(arrow)
      } else {
        arrow
      }
    })
    .collect()
}

pub struct Disambiguator<'m, M> {
  client: DetectionClient<'m, M>,
  required: usize,
}

impl<'m, M> Disambiguator<'m, M>
where
  M: Model<Input = RgbNhwcFrame, Output = RawDetections>,
{
  pub fn new(client: DetectionClient<'m, M>, required: usize) -> Self {
    Self { client, required }
  }

  /// 画布上的箭头数不等于 required 时返回空序列，且不做旋转检测
  pub fn run(&self, canvas: &RgbImage) -> Result<Vec<Arrow>, RuneError<M::Error>> {
    let primary = self.client.detect(canvas).map_err(RuneError::Detector)?;
    if primary.len() != self.required {
      debug!(
        "画布上检测到 {} 个箭头，需要恰好 {} 个",
        primary.len(),
        self.required
      );
      return Ok(Vec::new());
    }
    let primary = primary_labels(primary)?;

    let rotated_canvas = imageops::rotate270(canvas);
    let rotated = self
      .client
      .detect(&rotated_canvas)
      .map_err(RuneError::Detector)?;
    let rotated = rotated_labels(rotated);
    debug!("直接检测: {:?}，旋转检测: {:?}", primary, rotated);

    Ok(merge_labels(primary, rotated))
  }
}
