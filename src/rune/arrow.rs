// 该文件是 Fengxiang （风向） 项目的一部分。
// src/rune/arrow.rs - 箭头方向标签
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

use std::fmt;

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("未知的类别编号: {0}")]
pub struct UnknownClass(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arrow {
  Up,
  Down,
  Left,
  Right,
}

impl Arrow {
  /// 模型标签文件中的类别编号，从 1 开始
  pub fn class_id(self) -> u32 {
    match self {
      Arrow::Up => 1,
      Arrow::Down => 2,
      Arrow::Left => 3,
      Arrow::Right => 4,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Arrow::Up => "up",
      Arrow::Down => "down",
      Arrow::Left => "left",
      Arrow::Right => "right",
    }
  }

  pub fn is_horizontal(self) -> bool {
    matches!(self, Arrow::Left | Arrow::Right)
  }

  /// 逆时针旋转 90° 后看到的竖直箭头，还原为旋转前的水平方向
  pub fn unrotate(self) -> Option<Arrow> {
    match self {
      Arrow::Up => Some(Arrow::Right),
      Arrow::Down => Some(Arrow::Left),
      Arrow::Left | Arrow::Right => None,
    }
  }
}

impl TryFrom<u32> for Arrow {
  type Error = UnknownClass;

  fn try_from(class_id: u32) -> Result<Self, Self::Error> {
    match class_id {
      1 => Ok(Arrow::Up),
      2 => Ok(Arrow::Down),
      3 => Ok(Arrow::Left),
      4 => Ok(Arrow::Right),
      other => Err(UnknownClass(other)),
    }
  }
}

impl fmt::Display for Arrow {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn class_ids_round_trip() {
    for arrow in [Arrow::Up, Arrow::Down, Arrow::Left, Arrow::Right] {
      assert_eq!(Arrow::try_from(arrow.class_id()), Ok(arrow));
    }
  }

  #[test]
  fn unknown_class_is_an_error() {
    assert_eq!(Arrow::try_from(0), Err(UnknownClass(0)));
    assert_eq!(Arrow::try_from(5), Err(UnknownClass(5)));
  }

  #[test]
  fn only_vertical_arrows_unrotate() {
    assert_eq!(Arrow::Up.unrotate(), Some(Arrow::Right));
    assert_eq!(Arrow::Down.unrotate(), Some(Arrow::Left));
    assert_eq!(Arrow::Left.unrotate(), None);
    assert_eq!(Arrow::Right.unrotate(), None);
  }
}
