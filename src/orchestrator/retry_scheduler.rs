//! 定时提取
//!
//! 页面加载后按固定时间点（从启动算起）重复提取，
//! 直到字段数超过阈值，剩余的时间点全部取消。

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::infrastructure::DocumentSource;
use crate::models::ExtractTrigger;
use crate::workflow::FormSession;

/// 定时提取调度器
#[derive(Debug, Clone)]
pub struct RetryScheduler {
    delays: Vec<Duration>,
    threshold: usize,
}

impl RetryScheduler {
    pub fn new(delays: Vec<Duration>, threshold: usize) -> Self {
        Self { delays, threshold }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config
                .retry_delays_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            config.sufficiency_threshold,
        )
    }

    /// 启动调度任务
    ///
    /// # 返回
    /// 任务句柄，取消或丢弃句柄都会停止剩余的提取
    pub fn start<S: DocumentSource>(&self, session: Arc<FormSession<S>>) -> RetryHandle {
        let delays = self.delays.clone();
        let threshold = self.threshold;
        let task = tokio::spawn(async move {
            let start = Instant::now();
            let mut attempts = 0;
            for (index, delay) in delays.iter().enumerate() {
                sleep_until(start + *delay).await;
                attempts += 1;
                let attempt = index + 1;

                match session.extract(ExtractTrigger::Initial { attempt }).await {
                    Ok(schema) if schema.is_empty() => {
                        info!("⚠️ 第 {} 次定时提取未找到表单字段", attempt)
                    }
                    Ok(schema) => debug!("第 {} 次定时提取: {} 个字段", attempt, schema.len()),
                    Err(e) => warn!("⚠️ 第 {} 次定时提取失败: {}", attempt, e),
                }

                if session.current_schema().await.is_sufficient(threshold) {
                    info!("✓ 字段数已超过 {}，停止定时提取", threshold);
                    break;
                }
            }
            attempts
        });
        RetryHandle { task: Some(task) }
    }
}

/// 定时提取任务句柄
pub struct RetryHandle {
    task: Option<JoinHandle<usize>>,
}

impl RetryHandle {
    /// 取消剩余的提取
    pub fn cancel(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// 等待任务结束，返回实际执行的提取次数；被取消时返回 `None`
    pub async fn join(mut self) -> Option<usize> {
        let task = self.task.take()?;
        task.await.ok()
    }
}

impl Drop for RetryHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
