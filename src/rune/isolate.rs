// 该文件是 Fengxiang （风向） 项目的一部分。
// src/rune/isolate.rs - 符文区域裁剪与边缘提取
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

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage, imageops};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use tracing::debug;

// 经验值：符文出现在屏幕上半部分的中间
const REGION_TOP_ROW: u32 = 120;
// 箭头图标的颜色特征，OpenCV 8 位 HSV 约定
const ARROW_HUE: (u8, u8) = (1, 75);
const ARROW_SATURATION: (u8, u8) = (100, 255);
const ARROW_VALUE: (u8, u8) = (100, 255);
const CANNY_LOW: f32 = 200.0;
const CANNY_HIGH: f32 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionConfig {
  pub top_row: u32,
  pub hue: (u8, u8),
  pub saturation: (u8, u8),
  pub value: (u8, u8),
  pub canny_low: f32,
  pub canny_high: f32,
}

impl Default for RegionConfig {
  fn default() -> Self {
    Self {
      top_row: REGION_TOP_ROW,
      hue: ARROW_HUE,
      saturation: ARROW_SATURATION,
      value: ARROW_VALUE,
      canny_low: CANNY_LOW,
      canny_high: CANNY_HIGH,
    }
  }
}

/// 截图中的裁剪区域，单位为像素
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
  pub left: u32,
  pub top: u32,
  pub width: u32,
  pub height: u32,
}

impl RegionConfig {
  pub fn with_top_row(mut self, top_row: u32) -> Self {
    self.top_row = top_row;
    self
  }

  pub fn with_canny_thresholds(mut self, low: f32, high: f32) -> Self {
    self.canny_low = low;
    self.canny_high = high;
    self
  }

  /// 行 [top_row, height/2)，列 [width/4, 3*width/4)
  pub fn region(&self, width: u32, height: u32) -> Region {
    let left = width / 4;
    let right = 3 * width / 4;
    let bottom = height / 2;
    Region {
      left,
      top: self.top_row,
      width: right - left,
      height: bottom.saturating_sub(self.top_row),
    }
  }

  fn keeps(&self, hsv: [u8; 3]) -> bool {
    let within = |v: u8, (lo, hi): (u8, u8)| lo <= v && v <= hi;
    within(hsv[0], self.hue) && within(hsv[1], self.saturation) && within(hsv[2], self.value)
  }
}

/// 裁剪出符文可能出现的区域，保留箭头颜色后提取边缘
pub fn isolate(frame: &RgbImage, config: &RegionConfig) -> RgbImage {
  let region = config.region(frame.width(), frame.height());
  debug!(
    "裁剪区域: ({}, {}) {}x{}",
    region.left, region.top, region.width, region.height
  );
  let cropped = imageops::crop_imm(frame, region.left, region.top, region.width, region.height)
    .to_image();
  let filtered = filter_color(&cropped, config);
  edges(&filtered, config.canny_low, config.canny_high)
}

/// 颜色范围之外的像素置黑
pub fn filter_color(image: &RgbImage, config: &RegionConfig) -> RgbImage {
  let mut filtered = image.clone();
  for pixel in filtered.pixels_mut() {
    if !config.keeps(to_hsv(*pixel)) {
      *pixel = Rgb([0, 0, 0]);
    }
  }
  filtered
}

/// Canny 边缘图，复制到三个通道以符合检测器的输入形状。
///
/// 不做高斯预平滑；梯度为 3x3 Sobel 的 L1 范数，每个像素取三个通道中梯度最大的一个，
/// 因此从 0 到 V 的阶跃边缘强度为 4V。
pub fn edges(image: &RgbImage, low: f32, high: f32) -> RgbImage {
  if image.width() == 0 || image.height() == 0 {
    return image.clone();
  }
  let (low, high) = if low > high { (high, low) } else { (low, high) };

  let gradient = Gradient::of(image);
  let candidates = gradient.suppress(low);
  let edges = gradient.hysteresis(&candidates, high);
  ImageBuffer::from_fn(image.width(), image.height(), |x, y| {
    let v = if edges[y as usize * gradient.width + x as usize] {
      255
    } else {
      0
    };
    Rgb([v, v, v])
  })
}

// tan(22.5°) 与 tan(67.5°)
const TAN_22_5: f32 = 0.414_213_57;
const TAN_67_5: f32 = 2.414_213_6;

struct Gradient {
  dx: Vec<i32>,
  dy: Vec<i32>,
  magnitude: Vec<i32>,
  width: usize,
  height: usize,
}

impl Gradient {
  fn of(image: &RgbImage) -> Self {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let mut gradient = Gradient {
      dx: vec![0; width * height],
      dy: vec![0; width * height],
      magnitude: vec![0; width * height],
      width,
      height,
    };

    for c in 0..3 {
      let channel = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([image.get_pixel(x, y).0[c]])
      });
      let gx = horizontal_sobel(&channel);
      let gy = vertical_sobel(&channel);
      for (i, (px, py)) in gx.pixels().zip(gy.pixels()).enumerate() {
        let (dx, dy) = (i32::from(px.0[0]), i32::from(py.0[0]));
        let magnitude = dx.abs() + dy.abs();
        if magnitude > gradient.magnitude[i] {
          gradient.dx[i] = dx;
          gradient.dy[i] = dy;
          gradient.magnitude[i] = magnitude;
        }
      }
    }
    gradient
  }

  /// 图像外的梯度视为 0
  fn at(&self, x: isize, y: isize) -> i32 {
    if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
      return 0;
    }
    self.magnitude[y as usize * self.width + x as usize]
  }

  /// 非极大值抑制：沿梯度方向的局部极大且强度高于 low 的像素
  fn suppress(&self, low: f32) -> Vec<bool> {
    let mut candidates = vec![false; self.magnitude.len()];
    for y in 0..self.height {
      for x in 0..self.width {
        let i = y * self.width + x;
        let m = self.magnitude[i];
        if m as f32 <= low {
          continue;
        }
        let (x, y) = (x as isize, y as isize);
        let (ax, ay) = (self.dx[i].abs() as f32, self.dy[i].abs() as f32);
        candidates[i] = if ay < ax * TAN_22_5 {
          m > self.at(x - 1, y) && m >= self.at(x + 1, y)
        } else if ay > ax * TAN_67_5 {
          m > self.at(x, y - 1) && m >= self.at(x, y + 1)
        } else {
          let s = if (self.dx[i] ^ self.dy[i]) < 0 { -1 } else { 1 };
          m > self.at(x - s, y - 1) && m > self.at(x + s, y + 1)
        };
      }
    }
    candidates
  }

  /// 从强度高于 high 的像素出发，沿 8 邻域连接其余候选
  fn hysteresis(&self, candidates: &[bool], high: f32) -> Vec<bool> {
    let mut edges = vec![false; candidates.len()];
    let mut stack: Vec<usize> = (0..candidates.len())
      .filter(|&i| candidates[i] && self.magnitude[i] as f32 > high)
      .collect();
    for &i in &stack {
      edges[i] = true;
    }

    while let Some(i) = stack.pop() {
      let (x, y) = (i % self.width, i / self.width);
      for ny in y.saturating_sub(1)..=(y + 1).min(self.height - 1) {
        for nx in x.saturating_sub(1)..=(x + 1).min(self.width - 1) {
          let j = ny * self.width + nx;
          if candidates[j] && !edges[j] {
            edges[j] = true;
            stack.push(j);
          }
        }
      }
    }
    edges
  }
}

/// H 取 [0, 180)，S、V 取 [0, 255]
pub fn to_hsv(pixel: Rgb<u8>) -> [u8; 3] {
  let [r, g, b] = pixel.0.map(f32::from);
  let v = r.max(g).max(b);
  let diff = v - r.min(g).min(b);

  let s = if v > 0.0 { diff * 255.0 / v } else { 0.0 };
  let mut h = if diff == 0.0 {
    0.0
  } else if v == r {
    60.0 * (g - b) / diff
  } else if v == g {
    120.0 + 60.0 * (b - r) / diff
  } else {
    240.0 + 60.0 * (r - g) / diff
  };
  if h < 0.0 {
    h += 360.0;
  }

  [(h / 2.0).round() as u8, s.round() as u8, v as u8]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hsv_follows_opencv_convention() {
    assert_eq!(to_hsv(Rgb([255, 0, 0])), [0, 255, 255]);
    assert_eq!(to_hsv(Rgb([0, 255, 0])), [60, 255, 255]);
    assert_eq!(to_hsv(Rgb([0, 0, 255])), [120, 255, 255]);
    assert_eq!(to_hsv(Rgb([255, 255, 0])), [30, 255, 255]);
    assert_eq!(to_hsv(Rgb([128, 128, 128])), [0, 0, 128]);
    assert_eq!(to_hsv(Rgb([0, 0, 0])), [0, 0, 0]);
  }

  #[test]
  fn color_filter_keeps_only_arrow_colors() {
    let config = RegionConfig::default();
    let mut image = RgbImage::new(5, 1);
    image.put_pixel(0, 0, Rgb([255, 255, 0])); // 黄色，保留
    image.put_pixel(1, 0, Rgb([255, 128, 0])); // 橙色，保留
    image.put_pixel(2, 0, Rgb([255, 0, 0])); // 纯红色色相为 0，剔除
    image.put_pixel(3, 0, Rgb([0, 0, 255])); // 蓝色，剔除
    image.put_pixel(4, 0, Rgb([60, 60, 0])); // 过暗，剔除

    let filtered = filter_color(&image, &config);
    assert_eq!(filtered.get_pixel(0, 0).0, [255, 255, 0]);
    assert_eq!(filtered.get_pixel(1, 0).0, [255, 128, 0]);
    for x in 2..5 {
      assert_eq!(filtered.get_pixel(x, 0).0, [0, 0, 0]);
    }
  }

  #[test]
  fn region_is_upper_middle_of_frame() {
    let region = RegionConfig::default().region(1366, 768);
    assert_eq!(
      region,
      Region {
        left: 341,
        top: 120,
        width: 683,
        height: 264,
      }
    );

    // 截图太矮时区域为空
    assert_eq!(RegionConfig::default().region(800, 200).height, 0);
  }

  #[test]
  fn isolate_outputs_replicated_edges_of_arrow_colored_shapes() {
    let mut frame = RgbImage::new(800, 400);
    // 区域为行 [120, 200)，列 [200, 600)
    for y in 140..180 {
      for x in 300..360 {
        frame.put_pixel(x, y, Rgb([255, 255, 0]));
      }
      for x in 450..510 {
        frame.put_pixel(x, y, Rgb([0, 0, 255]));
      }
    }

    let isolated = isolate(&frame, &RegionConfig::default());
    assert_eq!(isolated.dimensions(), (400, 80));
    assert!(isolated.pixels().all(|p| p[0] == p[1] && p[1] == p[2]));

    // 黄色方块留下边缘，蓝色方块被颜色过滤掉
    let yellow_edges = (100..160)
      .flat_map(|x| (0..80).map(move |y| (x, y)))
      .filter(|&(x, y)| isolated.get_pixel(x, y)[0] > 0)
      .count();
    let blue_edges = (240..320)
      .flat_map(|x| (0..80).map(move |y| (x, y)))
      .filter(|&(x, y)| isolated.get_pixel(x, y)[0] > 0)
      .count();
    assert!(yellow_edges > 0);
    assert_eq!(blue_edges, 0);
  }

  fn step(left: [u8; 3], right: [u8; 3]) -> RgbImage {
    ImageBuffer::from_fn(10, 6, |x, _| Rgb(if x < 5 { left } else { right }))
  }

  #[test]
  fn step_edge_is_one_pixel_wide() {
    // 阶跃强度 4 * 100 = 400，高于上阈值
    let edges = edges(&step([0, 0, 0], [100, 80, 0]), CANNY_LOW, CANNY_HIGH);
    for y in 1..5 {
      for x in 0..9 {
        let expected = if x == 4 { 255 } else { 0 };
        assert_eq!(edges.get_pixel(x, y).0, [expected; 3], "({}, {})", x, y);
      }
    }
  }

  #[test]
  fn weak_step_without_strong_neighbour_is_dropped() {
    // 4 * 70 = 280，介于两个阈值之间
    let edges = edges(&step([0, 0, 0], [70, 0, 0]), CANNY_LOW, CANNY_HIGH);
    assert!(edges.pixels().all(|p| p.0 == [0, 0, 0]));
  }

  #[test]
  fn strongest_channel_drives_the_edge() {
    // 亮度相同的两种颜色之间也有边缘
    let edges = edges(&step([0, 200, 0], [200, 0, 0]), CANNY_LOW, CANNY_HIGH);
    assert!(edges.pixels().any(|p| p.0 == [255, 255, 255]));
  }

  #[test]
  fn every_kept_color_leaves_edges() {
    let config = RegionConfig::default();
    for color in [[255, 255, 0], [255, 128, 0], [150, 120, 0], [100, 80, 0]] {
      assert_eq!(filter_color(&step([0, 0, 0], color), &config), step([0, 0, 0], color));

      let mut frame = RgbImage::new(800, 400);
      for y in 140..180 {
        for x in 300..360 {
          frame.put_pixel(x, y, Rgb(color));
        }
      }
      let isolated = isolate(&frame, &config);
      let lit = isolated.pixels().filter(|p| p[0] > 0).count();
      assert!(lit > 0, "{:?} 没有边缘", color);
    }
  }

  #[test]
  fn isolate_tolerates_tiny_frames() {
    let isolated = isolate(&RgbImage::new(100, 100), &RegionConfig::default());
    assert_eq!(isolated.height(), 0);
  }
}
