// 该文件是 Fengxiang （风向） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU16, Ordering};

use chrono::{Datelike, Utc};
use image::RgbImage;
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::{Render, draw::record},
  rune::RuneReading,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 按日期分目录保存原始截图和对应的 JSON 识别记录。
/// 默认只保存识别成功的帧，URL 带 `always` 参数时保存所有帧。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  frame_counter: AtomicU16,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      frame_counter: AtomicU16::new(0),
      always,
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> u16 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  fn frame_path(&self) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }

  fn save(
    &self,
    path: &Path,
    frame: &RgbImage,
    result: &RuneReading,
  ) -> Result<(), DirectoryRecordOutputError> {
    frame.save(path)?;
    let json = serde_json::to_string_pretty(&record(result))?;
    std::fs::write(path.with_extension("json"), json)?;
    debug!("记录到 {}", path.display());
    Ok(())
  }
}

impl Render<RgbImage, RuneReading> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &RgbImage, result: &RuneReading) -> Result<(), Self::Error> {
    if self.always || result.is_solved() {
      let path = self.frame_path()?;
      self.save(&path, frame, result)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::rune::{Arrow, ReadingOutcome};

  fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
      for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
          stack.push(path);
        } else if path.extension().is_some_and(|e| e == ext) {
          found.push(path);
        }
      }
    }
    found
  }

  fn solved() -> RuneReading {
    RuneReading {
      arrows: vec![Arrow::Right, Arrow::Left, Arrow::Up, Arrow::Down],
      outcome: ReadingOutcome::Solved,
      rune_box: None,
    }
  }

  #[test]
  fn records_only_solved_frames_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    let frame = RgbImage::new(8, 8);

    output
      .render_result(&frame, &RuneReading::empty(ReadingOutcome::Incomplete))
      .unwrap();
    assert!(files_with_extension(dir.path(), "png").is_empty());

    output.render_result(&frame, &solved()).unwrap();
    assert_eq!(files_with_extension(dir.path(), "png").len(), 1);

    let records = files_with_extension(dir.path(), "json");
    assert_eq!(records.len(), 1);
    let value: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(&records[0]).unwrap()).unwrap();
    assert_eq!(value["arrows"][0], "right");
  }

  #[test]
  fn always_records_every_frame() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}?always", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    let frame = RgbImage::new(8, 8);

    output
      .render_result(&frame, &RuneReading::empty(ReadingOutcome::Disabled))
      .unwrap();
    output.render_result(&frame, &solved()).unwrap();
    assert_eq!(files_with_extension(dir.path(), "json").len(), 2);
  }
}
