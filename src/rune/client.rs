// 该文件是 Fengxiang （风向） 项目的一部分。
// src/rune/client.rs - 检测调用与结果筛选
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

use image::RgbImage;
use tracing::debug;

use crate::{
  frame::RgbNhwcFrame,
  model::{DetectItem, Model, RawDetections},
  rune::ARROW_COUNT,
};

const DETECTION_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionPolicy {
  /// 置信度必须严格大于该值
  pub threshold: f32,
  pub max_count: usize,
}

impl Default for DetectionPolicy {
  fn default() -> Self {
    Self {
      threshold: DETECTION_THRESHOLD,
      max_count: ARROW_COUNT,
    }
  }
}

impl DetectionPolicy {
  pub fn with_threshold(mut self, threshold: f32) -> Self {
    self.threshold = threshold;
    self
  }

  pub fn with_max_count(mut self, max_count: usize) -> Self {
    self.max_count = max_count;
    self
  }

  /// 过滤低置信度结果，按置信度降序取前 max_count 个
  pub fn select(&self, items: impl IntoIterator<Item = DetectItem>) -> Vec<DetectItem> {
    let mut kept: Vec<DetectItem> = items
      .into_iter()
      .filter(|item| item.score > self.threshold)
      .collect();
    kept.sort_by(|a, b| b.score.total_cmp(&a.score));
    kept.truncate(self.max_count);
    kept
  }
}

pub struct DetectionClient<'m, M> {
  model: &'m M,
  policy: DetectionPolicy,
}

impl<'m, M> DetectionClient<'m, M>
where
  M: Model<Input = RgbNhwcFrame, Output = RawDetections>,
{
  pub fn new(model: &'m M, policy: DetectionPolicy) -> Self {
    Self { model, policy }
  }

  /// 检测器的错误原样返回
  pub fn detect(&self, image: &RgbImage) -> Result<Vec<DetectItem>, M::Error> {
    let frame = RgbNhwcFrame::from(image);
    let raw = self.model.infer(&frame)?;
    let items = self.policy.select(raw.items());
    debug!(
      "{}x{} 图像: {} 个候选，保留 {} 个",
      image.width(),
      image.height(),
      raw.num_detections,
      items.len()
    );
    Ok(items)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;

  fn item(score: f32, class_id: u32) -> DetectItem {
    DetectItem {
      class_id,
      score,
      bbox: [0.0, 0.0, 1.0, 1.0],
    }
  }

  struct Fixed {
    raw: RawDetections,
    seen: RefCell<Vec<(usize, usize)>>,
  }

  impl Model for Fixed {
    type Input = RgbNhwcFrame;
    type Output = RawDetections;
    type Error = std::convert::Infallible;

    fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
      self.seen.borrow_mut().push((input.height(), input.width()));
      Ok(self.raw.clone())
    }
  }

  #[test]
  fn select_filters_sorts_and_truncates() {
    let policy = DetectionPolicy::default();
    let selected = policy.select([
      item(0.6, 1),
      item(0.5, 2),
      item(0.95, 3),
      item(0.7, 4),
      item(0.8, 1),
      item(0.55, 2),
      item(0.1, 3),
    ]);

    let scores: Vec<f32> = selected.iter().map(|i| i.score).collect();
    assert_eq!(scores, vec![0.95, 0.8, 0.7, 0.6]);
  }

  #[test]
  fn select_is_idempotent() {
    let policy = DetectionPolicy::default();
    let once = policy.select([
      item(0.9, 1),
      item(0.51, 2),
      item(0.7, 3),
      item(0.99, 4),
      item(0.65, 1),
      item(0.3, 2),
    ]);
    let twice = policy.select(once.clone());
    assert_eq!(once, twice);
  }

  #[test]
  fn policy_is_configurable() {
    let policy = DetectionPolicy::default()
      .with_threshold(0.2)
      .with_max_count(2);
    let selected = policy.select([item(0.3, 1), item(0.25, 2), item(0.4, 3)]);
    assert_eq!(selected.len(), 2);
    assert_eq!(selected[0].class_id, 3);
    assert_eq!(selected[1].class_id, 1);
  }

  #[test]
  fn detect_feeds_whole_image_and_honors_count() {
    let model = Fixed {
      raw: RawDetections {
        num_detections: 2,
        scores: vec![0.6, 0.9, 0.99],
        boxes: vec![[0.0; 4]; 3],
        classes: vec![1, 2, 3],
      },
      seen: RefCell::new(Vec::new()),
    };
    let client = DetectionClient::new(&model, DetectionPolicy::default());

    let items = client.detect(&RgbImage::new(30, 20)).unwrap();
    assert_eq!(*model.seen.borrow(), vec![(20, 30)]);
    // 第三个结果超出检测数量，被丢弃
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].class_id, 2);
    assert_eq!(items[1].class_id, 1);
  }
}
