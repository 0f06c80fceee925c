// 该文件是 Fengxiang （风向） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(image::ImageError),
}

impl From<std::io::Error> for ImageFileInputError {
  fn from(err: std::io::Error) -> Self {
    ImageFileInputError::IoError(err)
  }
}

impl From<image::ImageError> for ImageFileInputError {
  fn from(err: image::ImageError) -> Self {
    ImageFileInputError::ImageLoadError(err)
  }
}

/// 单张截图，迭代一次后耗尽
pub struct ImageFileInput {
  image: Option<RgbImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let path = url.path();
    let image = ImageReader::open(path)?.decode()?.to_rgb8();
    debug!("读取图像 {}: {}x{}", path, image.width(), image.height());

    Ok(ImageFileInput { image: Some(image) })
  }
}

impl From<RgbImage> for ImageFileInput {
  fn from(image: RgbImage) -> Self {
    ImageFileInput { image: Some(image) }
  }
}

impl Iterator for ImageFileInput {
  type Item = RgbImage;

  fn next(&mut self) -> Option<Self::Item> {
    self.image.take()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reads_png_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.png");
    RgbImage::from_pixel(8, 6, image::Rgb([10, 20, 30]))
      .save(&path)
      .unwrap();

    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    let mut input = ImageFileInput::from_url(&url).unwrap();

    let frame = input.next().unwrap();
    assert_eq!(frame.dimensions(), (8, 6));
    assert_eq!(frame.get_pixel(0, 0).0, [10, 20, 30]);
    assert!(input.next().is_none());
  }

  #[test]
  fn rejects_other_scheme() {
    let url = Url::parse("folder:///tmp").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::SchemaMismatch)
    ));
  }
}
