// 该文件是 Fengxiang （风向） 项目的一部分。
// src/rune/solver.rs - 符文识别入口
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

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

use image::RgbImage;
use tracing::{debug, info, warn};

use crate::{
  frame::RgbNhwcFrame,
  model::{DetectItem, Model, RawDetections},
  rune::{
    ARROW_COUNT, DetectionClient, Disambiguator, ReadingOutcome, RuneConfig, RuneError,
    RuneReading, crop, isolate, pad_to_canvas, rune_box_bounds,
  },
};

/// 持有加载好的检测器，进程内只创建一次，之后每帧只读调用
pub struct RuneSolver<M> {
  model: M,
  config: RuneConfig,
  enabled: Arc<AtomicBool>,
}

impl<M> RuneSolver<M> {
  pub fn new(model: M) -> Self {
    Self {
      model,
      config: RuneConfig::default(),
      enabled: Arc::new(AtomicBool::new(true)),
    }
  }

  pub fn with_config(mut self, config: RuneConfig) -> Self {
    self.config = config;
    self
  }

  /// 与外部共享的开关，关闭时 solve 直接返回空结果
  pub fn with_toggle(mut self, enabled: Arc<AtomicBool>) -> Self {
    self.enabled = enabled;
    self
  }

  pub fn toggle(&self) -> Arc<AtomicBool> {
    Arc::clone(&self.enabled)
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled.load(Ordering::Relaxed)
  }
}

impl<M> RuneSolver<M>
where
  M: Model<Input = RgbNhwcFrame, Output = RawDetections>,
{
  pub fn solve(&self, frame: &RgbImage) -> Result<RuneReading, RuneError<M::Error>> {
    if !self.is_enabled() {
      debug!("符文识别已关闭，跳过");
      return Ok(RuneReading::empty(ReadingOutcome::Disabled));
    }
    self.read(frame)
  }

  /// 首次推理需要较长的初始化时间，启动时先跑一次，结果丢弃
  pub fn warm_up(&self, frame: &RgbImage) -> Result<(), RuneError<M::Error>> {
    info!("预热检测器...");
    let now = std::time::Instant::now();
    let reading = self.read(frame)?;
    info!(
      "预热完成，耗时: {:.2?}，结果: {}",
      now.elapsed(),
      reading.outcome.as_str()
    );
    Ok(())
  }

  fn read(&self, frame: &RgbImage) -> Result<RuneReading, RuneError<M::Error>> {
    let region = self.config.region.region(frame.width(), frame.height());
    let isolated = isolate(frame, &self.config.region);
    if isolated.width() == 0 || isolated.height() == 0 {
      warn!(
        "截图 {}x{} 过小，裁剪区域为空",
        frame.width(),
        frame.height()
      );
      return Ok(RuneReading::empty(ReadingOutcome::EmptyRegion));
    }

    let client = DetectionClient::new(&self.model, self.config.policy);
    let located = client.detect(&isolated).map_err(RuneError::Detector)?;
    let located: [DetectItem; ARROW_COUNT] = match located.try_into() {
      Ok(located) => located,
      Err(located) => {
        let found = located.len();
        debug!("定位阶段检测到 {} 个箭头，等待下一帧", found);
        return Ok(RuneReading::empty(ReadingOutcome::NotLocated { found }));
      }
    };

    let rune_box = rune_box_bounds(&located, isolated.height(), isolated.width());
    let frame_box = rune_box.translate(region.left as i64, region.top as i64);
    let canvas = pad_to_canvas(&crop(&isolated, &rune_box), &self.config.canvas);
    if !canvas.placed {
      // 全黑画布上不会有检测结果，直接结束本帧
      warn!(
        "符文框 {}x{} 放不进 {}x{} 的画布",
        rune_box.width(),
        rune_box.height(),
        self.config.canvas.width,
        self.config.canvas.height
      );
      return Ok(RuneReading {
        arrows: Vec::new(),
        outcome: ReadingOutcome::OversizedRuneBox {
          width: rune_box.width(),
          height: rune_box.height(),
        },
        rune_box: Some(frame_box),
      });
    }

    let arrows = Disambiguator::new(client, ARROW_COUNT).run(&canvas.image)?;
    let outcome = if arrows.is_empty() {
      ReadingOutcome::Incomplete
    } else {
      info!("符文方向: {:?}", arrows);
      ReadingOutcome::Solved
    };

    Ok(RuneReading {
      arrows,
      outcome,
      rune_box: Some(frame_box),
    })
  }
}

impl<M> Model for RuneSolver<M>
where
  M: Model<Input = RgbNhwcFrame, Output = RawDetections>,
{
  type Input = RgbImage;
  type Output = RuneReading;
  type Error = RuneError<M::Error>;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.solve(input)
  }
}
