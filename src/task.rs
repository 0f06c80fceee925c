// 该文件是 Fengxiang （风向） 项目的一部分。
// src/task.rs - 任务循环
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

use std::sync::mpsc::{self, Receiver};
use std::{thread, time::Duration};

use tracing::{info, warn};

use crate::{model::Model, output::Render};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

/// 只处理第一帧
pub struct OneShotTask;

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始识别...");
    let now = std::time::Instant::now();
    let result = model.infer(&frame)?;
    info!("识别完成，耗时: {:.2?}", now.elapsed());
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

/// 逐帧轮询，直到输入耗尽、达到指定帧数或收到中断信号
#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  handle_interrupt: bool,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  pub fn with_interrupt_handler(mut self, handle_interrupt: bool) -> Self {
    self.handle_interrupt = handle_interrupt;
    self
  }

  fn install_interrupt_handler(&self) -> anyhow::Result<Option<Receiver<()>>> {
    if !self.handle_interrupt {
      return Ok(None);
    }

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })?;
    Ok(Some(rx))
  }
}

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let interrupt = self.install_interrupt_handler()?;

    let mut frame_index = 0usize;
    let mut now = std::time::Instant::now();
    for frame in input {
      frame_index = frame_index.wrapping_add(1);
      info!("处理第 {} 帧图像", frame_index);
      let result = model.infer(&frame)?;
      let elapsed_a = now.elapsed();
      output.render_result(&frame, &result)?;
      let elapsed_b = now.elapsed();
      now = std::time::Instant::now();
      info!("识别完成，耗时: {:.2?} / {:.2?}", elapsed_a, elapsed_b);
      if self.frame_number.is_some_and(|n| frame_index >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if interrupt.as_ref().is_some_and(|rx| rx.try_recv().is_ok()) {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!("任务完成，共处理 {} 帧", frame_index);
    Ok(())
  }
}
