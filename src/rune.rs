// 该文件是 Fengxiang （风向） 项目的一部分。
// src/rune.rs - 符文箭头识别
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

//! 从一帧截图中读出符文谜题四个箭头的方向。
//!
//! 流程：裁剪并过滤颜色得到边缘图，检测一次找到四个箭头所在的符文框，
//! 将符文框居中填入固定画布，再分别在画布和逆时针旋转 90° 的画布上检测，
//! 用旋转后的竖直箭头纠正原图中容易混淆的左右箭头。

use thiserror::Error;

mod arrow;
mod client;
mod disambiguate;
mod geometry;
mod isolate;
mod solver;

pub use self::arrow::{Arrow, UnknownClass};
pub use self::client::{DetectionClient, DetectionPolicy};
pub use self::disambiguate::{Disambiguator, merge_labels, primary_labels, rotated_labels};
pub use self::geometry::{Canvas, CanvasConfig, RuneBox, crop, pad_to_canvas, rune_box_bounds};
pub use self::isolate::{Region, RegionConfig, edges, filter_color, isolate, to_hsv};
pub use self::solver::RuneSolver;

/// 一个符文固定由四个箭头组成
pub const ARROW_COUNT: usize = 4;

#[derive(Error, Debug)]
pub enum RuneError<E> {
  #[error("检测器错误: {0}")]
  Detector(#[source] E),
  #[error(transparent)]
  UnknownClass(#[from] UnknownClass),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuneConfig {
  pub region: RegionConfig,
  pub policy: DetectionPolicy,
  pub canvas: CanvasConfig,
}

impl RuneConfig {
  pub fn with_region(mut self, region: RegionConfig) -> Self {
    self.region = region;
    self
  }

  pub fn with_policy(mut self, policy: DetectionPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn with_canvas(mut self, canvas: CanvasConfig) -> Self {
    self.canvas = canvas;
    self
  }
}

/// 一次识别的结束方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingOutcome {
  /// 识别被开关关闭
  Disabled,
  /// 截图太小，裁剪区域为空
  EmptyRegion,
  /// 定位阶段没有恰好找到四个箭头
  NotLocated { found: usize },
  /// 符文框放不进画布，画布保持全黑
  OversizedRuneBox { width: u32, height: u32 },
  /// 画布上的检测不足四个箭头
  Incomplete,
  Solved,
}

impl ReadingOutcome {
  pub fn as_str(&self) -> &'static str {
    match self {
      ReadingOutcome::Disabled => "disabled",
      ReadingOutcome::EmptyRegion => "empty-region",
      ReadingOutcome::NotLocated { .. } => "not-located",
      ReadingOutcome::OversizedRuneBox { .. } => "oversized-rune-box",
      ReadingOutcome::Incomplete => "incomplete",
      ReadingOutcome::Solved => "solved",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuneReading {
  /// 按屏幕从左到右排列的方向，长度为 0 或 4
  pub arrows: Vec<Arrow>,
  pub outcome: ReadingOutcome,
  /// 符文框在原始截图中的位置
  pub rune_box: Option<RuneBox>,
}

impl RuneReading {
  pub fn empty(outcome: ReadingOutcome) -> Self {
    Self {
      arrows: Vec::new(),
      outcome,
      rune_box: None,
    }
  }

  pub fn is_solved(&self) -> bool {
    self.outcome == ReadingOutcome::Solved
  }
}
