// 该文件是 Fengxiang （风向） 项目的一部分。
// src/output/draw.rs - 识别结果可视化与记录
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

use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};
use serde_json::json;

use crate::rune::{RuneBox, RuneReading};

const SOLVED_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const FAILED_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const BOX_THICKNESS: u32 = 2;

pub struct Draw {
  solved_color: [u8; 3],
  failed_color: [u8; 3],
  thickness: u32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      solved_color: SOLVED_COLOR,
      failed_color: FAILED_COLOR,
      thickness: BOX_THICKNESS,
    }
  }
}

impl Draw {
  /// 在截图上画出符文框，识别成功为绿色，否则为红色
  pub fn draw_reading(&self, frame: &RgbImage, reading: &RuneReading) -> RgbImage {
    let mut image = frame.clone();
    if let Some(rune_box) = reading.rune_box {
      let color = if reading.is_solved() {
        self.solved_color
      } else {
        self.failed_color
      };
      self.draw_rune_box(&mut image, &rune_box, color);
    }
    image
  }

  fn draw_rune_box(&self, image: &mut RgbImage, rune_box: &RuneBox, color: [u8; 3]) {
    let (w, h) = (image.width() as i64, image.height() as i64);
    let left = rune_box.left.clamp(0, w);
    let top = rune_box.top.clamp(0, h);
    let right = rune_box.right.clamp(left, w);
    let bottom = rune_box.bottom.clamp(top, h);

    // 加粗边框，逐层向内收缩
    for t in 0..self.thickness as i64 {
      let width = right - left - 2 * t;
      let height = bottom - top - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at((left + t) as i32, (top + t) as i32).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, Rgb(color));
    }
  }
}

/// 识别结果的 JSON 记录
pub fn record(reading: &RuneReading) -> serde_json::Value {
  let arrows: Vec<&str> = reading.arrows.iter().map(|a| a.as_str()).collect();
  json!({
    "outcome": reading.outcome.as_str(),
    "arrows": arrows,
    "rune_box": reading
      .rune_box
      .map(|b| json!({ "top": b.top, "left": b.left, "bottom": b.bottom, "right": b.right })),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::rune::{Arrow, ReadingOutcome};

  fn reading(outcome: ReadingOutcome) -> RuneReading {
    RuneReading {
      arrows: if outcome == ReadingOutcome::Solved {
        vec![Arrow::Up, Arrow::Left, Arrow::Right, Arrow::Down]
      } else {
        Vec::new()
      },
      outcome,
      rune_box: Some(RuneBox {
        top: 10,
        left: 20,
        bottom: 30,
        right: 60,
      }),
    }
  }

  #[test]
  fn solved_box_is_green() {
    let frame = RgbImage::new(100, 50);
    let image = Draw::default().draw_reading(&frame, &reading(ReadingOutcome::Solved));
    assert_eq!(image.get_pixel(20, 10).0, SOLVED_COLOR);
    assert_eq!(image.get_pixel(21, 11).0, SOLVED_COLOR);
    assert_eq!(image.get_pixel(40, 20).0, [0, 0, 0]);
    assert_eq!(frame.get_pixel(20, 10).0, [0, 0, 0]);
  }

  #[test]
  fn failed_box_is_red() {
    let frame = RgbImage::new(100, 50);
    let image = Draw::default().draw_reading(&frame, &reading(ReadingOutcome::Incomplete));
    assert_eq!(image.get_pixel(59, 29).0, FAILED_COLOR);
  }

  #[test]
  fn box_outside_frame_is_skipped() {
    let frame = RgbImage::new(10, 10);
    let image = Draw::default().draw_reading(&frame, &reading(ReadingOutcome::Solved));
    assert_eq!(image, frame);
  }

  #[test]
  fn record_lists_arrows_and_box() {
    let value = record(&reading(ReadingOutcome::Solved));
    assert_eq!(value["outcome"], "solved");
    assert_eq!(value["arrows"], json!(["up", "left", "right", "down"]));
    assert_eq!(value["rune_box"]["right"], 60);

    let value = record(&RuneReading::empty(ReadingOutcome::NotLocated { found: 2 }));
    assert_eq!(value["outcome"], "not-located");
    assert!(value["rune_box"].is_null());
  }
}
