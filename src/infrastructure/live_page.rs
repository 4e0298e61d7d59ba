//! 实时页面 - 基础设施层
//!
//! 通过 `JsExecutor` 操作真实的 Chromium 页面：
//! - 快照：克隆 `documentElement`，并把 value / checked / selected 写回克隆体的属性
//! - 重放：在页面里按定位器逐条执行交互
//! - 结构变化：页面内的 `MutationObserver` 把新增节点写入缓冲区，由轮询任务取走

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dom::Interaction;
use crate::error::AppResult;
use crate::infrastructure::document_source::{DocumentSource, MutationBatch, PageSnapshot};
use crate::infrastructure::js_executor::JsExecutor;

/// 页面内缓冲区最多保留的新增节点数
const MUTATION_BUFFER_LIMIT: usize = 200;

const SNAPSHOT_JS: &str = r#"
(() => {
  const SELECTOR = 'input, textarea, select, option';
  const live = document.documentElement;
  const clone = live.cloneNode(true);
  const source = live.querySelectorAll(SELECTOR);
  const target = clone.querySelectorAll(SELECTOR);
  source.forEach((el, i) => {
    const copy = target[i];
    if (!copy) return;
    if (el.tagName === 'INPUT') {
      if (el.type === 'checkbox' || el.type === 'radio') {
        if (el.checked) copy.setAttribute('checked', ''); else copy.removeAttribute('checked');
      } else {
        copy.setAttribute('value', el.value);
      }
    } else if (el.tagName === 'TEXTAREA') {
      copy.textContent = el.value;
    } else if (el.tagName === 'OPTION') {
      if (el.selected) copy.setAttribute('selected', ''); else copy.removeAttribute('selected');
    }
  });
  return { url: location.href, html: '<!DOCTYPE html>' + clone.outerHTML };
})()
"#;

const REPLAY_JS: &str = r#"
(async (steps) => {
  const pause = (ms) => new Promise((resolve) => setTimeout(resolve, ms));
  let applied = 0;
  for (const step of steps) {
    const el = document.querySelector(step.locator);
    if (!el) continue;
    const action = step.action;
    switch (action.kind) {
      case 'focus': el.focus(); break;
      case 'set_value': el.value = action.value; break;
      case 'dispatch': el.dispatchEvent(new Event(action.value, { bubbles: true })); break;
      case 'click': el.click(); await pause(__CLICK_PAUSE__); break;
    }
    applied++;
  }
  return applied;
})(__STEPS__)
"#;

const OBSERVER_JS: &str = r#"
(() => {
  if (window.__formWatchBuffer) return false;
  window.__formWatchBuffer = [];
  new MutationObserver((mutations) => {
    const buffer = window.__formWatchBuffer;
    for (const m of mutations) {
      for (const node of m.addedNodes) {
        if (node.nodeType === Node.ELEMENT_NODE) buffer.push(node.outerHTML);
      }
    }
    if (buffer.length > __LIMIT__) buffer.splice(0, buffer.length - __LIMIT__);
  }).observe(document.body, { childList: true, subtree: true });
  return true;
})()
"#;

const DRAIN_JS: &str = r#"
(() => {
  const batch = window.__formWatchBuffer || [];
  if (window.__formWatchBuffer) window.__formWatchBuffer = [];
  return batch;
})()
"#;

#[derive(Debug, Deserialize)]
struct RawSnapshot {
    url: Option<String>,
    html: String,
}

/// 实时页面
pub struct LivePage {
    executor: JsExecutor,
    click_pause_ms: u64,
}

impl LivePage {
    pub fn new(executor: JsExecutor) -> Self {
        Self {
            executor,
            click_pause_ms: 150,
        }
    }

    pub fn executor(&self) -> &JsExecutor {
        &self.executor
    }

    /// 在页面内安装结构变化监听，重复调用不会重复安装
    pub async fn install_observer(&self) -> AppResult<bool> {
        let js = OBSERVER_JS.replace("__LIMIT__", &MUTATION_BUFFER_LIMIT.to_string());
        let installed: bool = self.executor.eval_as("install_observer", js).await?;
        if installed {
            debug!("👀 已在页面内安装 MutationObserver");
        }
        Ok(installed)
    }

    /// 取走页面缓冲区里的新增节点
    pub async fn drain_mutations(&self) -> AppResult<MutationBatch> {
        let added: Vec<String> = self.executor.eval_as("drain_mutations", DRAIN_JS).await?;
        Ok(MutationBatch::new(added))
    }

    /// 启动轮询任务：按间隔取走缓冲区并转发给监听器
    ///
    /// 接收端关闭后任务自动退出
    pub fn spawn_mutation_pump(
        self: Arc<Self>,
        interval: Duration,
        sink: mpsc::Sender<MutationBatch>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.install_observer().await {
                warn!("⚠️ 安装 MutationObserver 失败: {}", e);
                return;
            }
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let batch = match self.drain_mutations().await {
                    Ok(batch) => batch,
                    Err(e) => {
                        warn!("⚠️ 读取页面变化失败: {}", e);
                        continue;
                    }
                };
                if batch.is_empty() {
                    continue;
                }
                if sink.send(batch).await.is_err() {
                    debug!("监听器已停止，结束轮询");
                    break;
                }
            }
        })
    }
}

impl DocumentSource for LivePage {
    async fn snapshot(&self) -> AppResult<PageSnapshot> {
        let raw: RawSnapshot = self.executor.eval_as("snapshot", SNAPSHOT_JS).await?;
        debug!("📸 页面快照: {} 字节", raw.html.len());
        Ok(PageSnapshot::new(raw.url, raw.html))
    }

    async fn apply(&self, interactions: &[Interaction]) -> AppResult<usize> {
        if interactions.is_empty() {
            return Ok(0);
        }
        let steps = serde_json::to_string(interactions).map_err(|e| {
            crate::error::BrowserError::UnexpectedScriptResult {
                context: "serialize interactions".to_string(),
                source: e,
            }
        })?;
        let js = REPLAY_JS
            .replace("__CLICK_PAUSE__", &self.click_pause_ms.to_string())
            .replace("__STEPS__", &steps);
        let applied: usize = self.executor.eval_as("replay", js).await?;
        if applied < interactions.len() {
            warn!(
                "⚠️ 页面上只执行了 {}/{} 条交互",
                applied,
                interactions.len()
            );
        } else {
            info!("✓ 已在页面上执行 {} 条交互", applied);
        }
        Ok(applied)
    }
}
