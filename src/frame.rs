// 该文件是 Fengxiang （风向） 项目的一部分。
// src/frame.rs - NHWC 张量帧定义
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

use image::{ImageBuffer, Rgb, RgbImage};

use crate::input::AsNhwcFrame;

const RGB_CHANNELS: usize = 3;

/// 批大小为 1 的 NHWC 排布 RGB 帧，即检测器的输入张量 (1, H, W, 3)
#[derive(Debug, Clone)]
pub struct RgbNhwcFrame {
  data: Box<[u8]>,
  height: usize,
  width: usize,
}

impl RgbNhwcFrame {
  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn to_rgb_image(&self) -> RgbImage {
    let width = self.width;
    let data = &self.data;

    ImageBuffer::from_fn(self.width as u32, self.height as u32, |x, y| {
      let idx = (y as usize * width + x as usize) * RGB_CHANNELS;
      Rgb([data[idx], data[idx + 1], data[idx + 2]])
    })
  }
}

impl AsNhwcFrame for RgbNhwcFrame {
  fn as_nhwc(&self) -> &[u8] {
    &self.data
  }
}

impl From<&RgbImage> for RgbNhwcFrame {
  fn from(image: &RgbImage) -> Self {
    let (width, height) = image.dimensions();
    // RgbImage 本身就是按行优先、通道交错存储的，与 NHWC 排布一致
    Self {
      data: image.as_raw().clone().into_boxed_slice(),
      height: height as usize,
      width: width as usize,
    }
  }
}

impl From<RgbImage> for RgbNhwcFrame {
  fn from(image: RgbImage) -> Self {
    let (width, height) = image.dimensions();
    Self {
      data: image.into_raw().into_boxed_slice(),
      height: height as usize,
      width: width as usize,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn nhwc_layout_matches_pixel_order() {
    let mut image = RgbImage::new(2, 2);
    image.put_pixel(1, 0, Rgb([1, 2, 3]));
    image.put_pixel(0, 1, Rgb([4, 5, 6]));

    let frame = RgbNhwcFrame::from(&image);
    assert_eq!(frame.height(), 2);
    assert_eq!(frame.width(), 2);
    assert_eq!(&frame.as_nhwc()[3..6], &[1, 2, 3]);
    assert_eq!(&frame.as_nhwc()[6..9], &[4, 5, 6]);
    assert_eq!(frame.to_rgb_image(), image);
  }

  #[test]
  fn zero_sized_image_is_empty() {
    assert!(RgbNhwcFrame::from(RgbImage::new(0, 4)).is_empty());
    assert!(!RgbNhwcFrame::from(RgbImage::new(3, 4)).is_empty());
  }
}
