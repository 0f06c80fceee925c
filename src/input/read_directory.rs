// 该文件是 Fengxiang （风向） 项目的一部分。
// src/input/read_directory.rs - 截图目录输入
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

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "gif", "webp"];

#[derive(Error, Debug)]
pub enum DirectoryInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
}

/// 按文件名顺序依次读取目录中的截图，无法解码的文件会被跳过
pub struct DirectoryInput {
  paths: VecDeque<PathBuf>,
}

impl FromUrlWithScheme for DirectoryInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryInput {
  type Error = DirectoryInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(DirectoryInputError::SchemaMismatch);
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(url.path())? {
      let path = entry?.path();
      if path.is_file() && is_image_file(&path) {
        paths.push(path);
      }
    }
    paths.sort();
    info!("目录 {} 中找到 {} 张图像", url.path(), paths.len());

    Ok(DirectoryInput {
      paths: paths.into(),
    })
  }
}

fn is_image_file(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| {
      let ext = ext.to_lowercase();
      IMAGE_EXTENSIONS.contains(&ext.as_str())
    })
    .unwrap_or(false)
}

impl Iterator for DirectoryInput {
  type Item = RgbImage;

  fn next(&mut self) -> Option<Self::Item> {
    while let Some(path) = self.paths.pop_front() {
      let decoded = ImageReader::open(&path)
        .map_err(image::ImageError::IoError)
        .and_then(|reader| reader.decode());
      match decoded {
        Ok(image) => return Some(image.to_rgb8()),
        Err(e) => error!("无法读取图像 {}: {}", path.display(), e),
      }
    }
    None
  }
}
