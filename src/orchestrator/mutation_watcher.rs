//! 结构变化监听
//!
//! 新增节点命中问题块特征时标记"结构已变化"，静默一段时间后只提取一次；
//! 连续的变化会不断推迟提取时间，合并成一次。
//! 填写期间的变化交给会话，在填写结束后统一提取一次。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::dom::Document;
use crate::infrastructure::{DocumentSource, MutationBatch};
use crate::models::ExtractTrigger;
use crate::providers::strategies::STRUCTURAL_MARKERS;
use crate::providers::FormProvider;
use crate::workflow::FormSession;

/// 变化批次通道容量
const BATCH_CHANNEL_CAPACITY: usize = 64;

/// 结构变化监听器
#[derive(Debug, Clone)]
pub struct MutationWatcher {
    debounce: Duration,
    /// 合并后的特征选择器
    markers: String,
}

impl MutationWatcher {
    /// # 参数
    /// - `provider`: 当前站点适配器，其问题块选择器也作为特征
    /// - `debounce`: 静默等待时间
    pub fn new(provider: &dyn FormProvider, debounce: Duration) -> Self {
        let mut markers: Vec<&str> = STRUCTURAL_MARKERS.to_vec();
        markers.extend_from_slice(provider.strategies().blocks);
        Self {
            debounce,
            markers: markers.join(", "),
        }
    }

    /// 新增节点本身或其后代是否命中特征
    pub fn is_relevant(&self, batch: &MutationBatch) -> bool {
        batch.added.iter().any(|fragment| {
            let doc = Document::parse(fragment);
            match doc.query(&self.markers) {
                Ok(hit) => hit.is_some(),
                Err(e) => {
                    warn!("⚠️ 特征选择器无效: {}", e);
                    false
                }
            }
        })
    }

    /// 启动监听任务
    ///
    /// # 返回
    /// 句柄：通过 `sender()` 投递变化批次，`stop()` 或丢弃句柄停止监听
    pub fn start<S: DocumentSource>(self, session: Arc<FormSession<S>>) -> WatcherHandle {
        let (sender, mut receiver) = mpsc::channel::<MutationBatch>(BATCH_CHANNEL_CAPACITY);
        let task = tokio::spawn(async move {
            let mut deadline: Option<Instant> = None;
            loop {
                tokio::select! {
                    batch = receiver.recv() => {
                        let Some(batch) = batch else {
                            debug!("变化通道已关闭，停止监听");
                            break;
                        };
                        if self.is_relevant(&batch) {
                            debug!("检测到表单结构变化 ({} 个新增节点)", batch.added.len());
                            if session.mark_reextract_scheduled().await {
                                // 填写结束后统一补充提取
                                deadline = None;
                            } else {
                                deadline = Some(Instant::now() + self.debounce);
                            }
                        }
                    }
                    _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                        deadline = None;
                        info!("🔄 表单结构已变化，重新提取");
                        if let Err(e) = session.extract(ExtractTrigger::Mutation).await {
                            warn!("⚠️ 重新提取失败: {}", e);
                        }
                    }
                }
            }
        });
        WatcherHandle {
            sender,
            task: Some(task),
        }
    }
}

/// 监听任务句柄
pub struct WatcherHandle {
    sender: mpsc::Sender<MutationBatch>,
    task: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    /// 投递变化批次的发送端
    pub fn sender(&self) -> mpsc::Sender<MutationBatch> {
        self.sender.clone()
    }

    /// 停止监听，尚未执行的提取一并取消
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
