// 该文件是 Fengxiang （风向） 项目的一部分。
// src/rune/geometry.rs - 符文框与画布
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

use image::{RgbImage, imageops};

use crate::{model::DetectItem, rune::ARROW_COUNT};

const CANVAS_HEIGHT: u32 = 384;
const CANVAS_WIDTH: u32 = 455;

/// 四个箭头检测框的并集，像素坐标，右、下边界不包含
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuneBox {
  pub top: i64,
  pub left: i64,
  pub bottom: i64,
  pub right: i64,
}

impl RuneBox {
  pub fn width(&self) -> u32 {
    (self.right - self.left).max(0) as u32
  }

  pub fn height(&self) -> u32 {
    (self.bottom - self.top).max(0) as u32
  }

  pub fn translate(&self, dx: i64, dy: i64) -> Self {
    Self {
      top: self.top + dy,
      left: self.left + dx,
      bottom: self.bottom + dy,
      right: self.right + dx,
    }
  }
}

/// 计算四个检测框的并集。与检测顺序无关；取整为四舍六入五成双。
pub fn rune_box_bounds(detections: &[DetectItem; ARROW_COUNT], height: u32, width: u32) -> RuneBox {
  let fold = |init: f32, pick: fn(&DetectItem) -> f32, keep: fn(f32, f32) -> f32| {
    detections.iter().map(pick).fold(init, keep)
  };
  let y_min = fold(f32::INFINITY, DetectItem::y_min, f32::min);
  let x_min = fold(f32::INFINITY, DetectItem::x_min, f32::min);
  let y_max = fold(f32::NEG_INFINITY, DetectItem::y_max, f32::max);
  let x_max = fold(f32::NEG_INFINITY, DetectItem::x_max, f32::max);

  let scale = |v: f32, extent: u32| (v * extent as f32).round_ties_even() as i64;
  RuneBox {
    top: scale(y_min, height),
    left: scale(x_min, width),
    bottom: scale(y_max, height),
    right: scale(x_max, width),
  }
}

/// 截取符文框，超出图像的部分被裁掉；框无效时得到空图像
pub fn crop(image: &RgbImage, rune_box: &RuneBox) -> RgbImage {
  let (width, height) = (image.width() as i64, image.height() as i64);
  let left = rune_box.left.clamp(0, width);
  let top = rune_box.top.clamp(0, height);
  let right = rune_box.right.clamp(left, width);
  let bottom = rune_box.bottom.clamp(top, height);

  imageops::crop_imm(
    image,
    left as u32,
    top as u32,
    (right - left) as u32,
    (bottom - top) as u32,
  )
  .to_image()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasConfig {
  pub height: u32,
  pub width: u32,
}

impl Default for CanvasConfig {
  fn default() -> Self {
    Self {
      height: CANVAS_HEIGHT,
      width: CANVAS_WIDTH,
    }
  }
}

#[derive(Debug, Clone)]
pub struct Canvas {
  pub image: RgbImage,
  /// 符文框是否被贴到画布上
  pub placed: bool,
}

/// 将图像居中贴到黑色画布上。两个方向的偏移都必须严格大于 0，否则画布保持全黑。
pub fn pad_to_canvas(sub_image: &RgbImage, config: &CanvasConfig) -> Canvas {
  let mut image = RgbImage::new(config.width, config.height);
  let x_offset = (config.width as i64 - sub_image.width() as i64).div_euclid(2);
  let y_offset = (config.height as i64 - sub_image.height() as i64).div_euclid(2);

  let placed = x_offset > 0 && y_offset > 0;
  if placed {
    imageops::replace(&mut image, sub_image, x_offset, y_offset);
  }

  Canvas { image, placed }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  fn item(bbox: [f32; 4]) -> DetectItem {
    DetectItem {
      class_id: 1,
      score: 0.9,
      bbox,
    }
  }

  fn pixel_sum(image: &RgbImage) -> u64 {
    image.as_raw().iter().map(|&v| v as u64).sum()
  }

  #[test]
  fn bounds_are_union_of_boxes() {
    let detections = [
      item([0.2, 0.10, 0.8, 0.2]),
      item([0.3, 0.25, 0.7, 0.35]),
      item([0.1, 0.40, 0.9, 0.5]),
      item([0.25, 0.55, 0.75, 0.65]),
    ];
    let rune_box = rune_box_bounds(&detections, 100, 200);
    assert_eq!(
      rune_box,
      RuneBox {
        top: 10,
        left: 20,
        bottom: 90,
        right: 130,
      }
    );
    assert_eq!(rune_box.width(), 110);
    assert_eq!(rune_box.height(), 80);
  }

  #[test]
  fn bounds_ignore_detection_order() {
    let detections = [
      item([0.2, 0.10, 0.8, 0.2]),
      item([0.3, 0.25, 0.7, 0.35]),
      item([0.1, 0.40, 0.9, 0.5]),
      item([0.25, 0.55, 0.75, 0.65]),
    ];
    let expected = rune_box_bounds(&detections, 264, 683);

    let mut shuffled = detections;
    shuffled.reverse();
    assert_eq!(rune_box_bounds(&shuffled, 264, 683), expected);
    shuffled.swap(0, 2);
    assert_eq!(rune_box_bounds(&shuffled, 264, 683), expected);
  }

  #[test]
  fn bounds_round_half_to_even() {
    // 0.25 * 10 = 2.5 -> 2，0.75 * 10 = 7.5 -> 8
    let detections = [item([0.25, 0.25, 0.75, 0.75]); 4];
    let rune_box = rune_box_bounds(&detections, 10, 10);
    assert_eq!((rune_box.top, rune_box.left), (2, 2));
    assert_eq!((rune_box.bottom, rune_box.right), (8, 8));
  }

  #[test]
  fn crop_clamps_to_image() {
    let image = RgbImage::new(50, 40);
    let cropped = crop(
      &image,
      &RuneBox {
        top: 30,
        left: 10,
        bottom: 60,
        right: 70,
      },
    );
    assert_eq!(cropped.dimensions(), (40, 10));

    let inverted = crop(
      &image,
      &RuneBox {
        top: 20,
        left: 20,
        bottom: 10,
        right: 10,
      },
    );
    assert_eq!(inverted.dimensions(), (0, 0));
  }

  #[test]
  fn pad_centers_sub_image() {
    let sub = RgbImage::from_pixel(5, 4, Rgb([9, 9, 9]));
    let canvas = pad_to_canvas(&sub, &CanvasConfig::default());

    assert!(canvas.placed);
    assert_eq!(canvas.image.dimensions(), (455, 384));
    // x_offset = (455 - 5) / 2 = 225，y_offset = (384 - 4) / 2 = 190
    assert_eq!(canvas.image.get_pixel(225, 190).0, [9, 9, 9]);
    assert_eq!(canvas.image.get_pixel(229, 193).0, [9, 9, 9]);
    assert_eq!(canvas.image.get_pixel(224, 190).0, [0, 0, 0]);
    assert_eq!(canvas.image.get_pixel(230, 193).0, [0, 0, 0]);
    assert_eq!(pixel_sum(&canvas.image), 5 * 4 * 3 * 9);
  }

  #[test]
  fn oversized_sub_image_leaves_canvas_blank() {
    let blank = RgbImage::new(455, 384);
    for (w, h) in [(500, 100), (100, 400), (600, 600)] {
      let sub = RgbImage::from_pixel(w, h, Rgb([255, 255, 255]));
      let canvas = pad_to_canvas(&sub, &CanvasConfig::default());
      assert!(!canvas.placed);
      assert_eq!(pixel_sum(&canvas.image), pixel_sum(&blank));
    }
  }

  #[test]
  fn offsets_must_be_strictly_positive() {
    // 宽度恰好等于画布宽度，x_offset == 0
    let sub = RgbImage::from_pixel(455, 10, Rgb([255, 255, 255]));
    let canvas = pad_to_canvas(&sub, &CanvasConfig::default());
    assert!(!canvas.placed);
    assert_eq!(pixel_sum(&canvas.image), 0);

    // 宽度差为 1 时偏移向下取整为 0
    let sub = RgbImage::from_pixel(454, 10, Rgb([255, 255, 255]));
    assert!(!pad_to_canvas(&sub, &CanvasConfig::default()).placed);

    let sub = RgbImage::from_pixel(453, 382, Rgb([255, 255, 255]));
    assert!(pad_to_canvas(&sub, &CanvasConfig::default()).placed);
  }
}
