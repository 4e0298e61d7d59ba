//! 应用入口 - 编排层
//!
//! 负责资源和任务的生命周期：
//! 1. 初始化日志文件
//! 2. 打开页面（浏览器模式连接 / 启动浏览器，离线模式读取本地 HTML）
//! 3. 启动定时提取和结构变化监听
//! 4. 获取答案并填写一次，输出统计

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::browser;
use crate::clients::AnswerClient;
use crate::config::Config;
use crate::error::{AnswerError, AppError, AppResult};
use crate::infrastructure::{DocumentSource, JsExecutor, LivePage, MemoryPage, MutationBatch};
use crate::models::{AnswerMap, FormSchema, NoticeLevel, Outbound, Request, Response};
use crate::orchestrator::{MutationWatcher, RetryScheduler};
use crate::providers::ProviderKind;
use crate::utils::logging::{
    append_log_line, init_log_file, log_schema, log_startup, print_fill_summary,
};
use crate::workflow::FormSession;

/// 应用主结构
pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        init_log_file(&self.config.output_log_file)
            .with_context(|| format!("初始化日志文件失败: {}", self.config.output_log_file))?;
        log_startup(&self.config);

        match &self.config.html_file {
            Some(path) => self.run_offline(path).await,
            None => self.run_live().await,
        }
    }

    /// 离线模式：读取本地 HTML，填写后写回文件
    async fn run_offline(&self, path: &str) -> Result<()> {
        let html = fs::read_to_string(path).map_err(|e| AppError::file_read_failed(path, e))?;
        let mut page = MemoryPage::new(html);
        if self.config.target_url != Config::default().target_url {
            page = page.with_url(self.config.target_url.clone());
        }
        let page = Arc::new(page);

        self.drive(Arc::clone(&page), |_| None).await?;

        if let Some(output) = &self.config.output_file {
            fs::write(output, page.html().await)
                .map_err(|e| AppError::file_write_failed(output, e))?;
            info!("💾 填写后的页面已保存到: {}", output);
        }
        Ok(())
    }

    /// 浏览器模式
    async fn run_live(&self) -> Result<()> {
        let url = &self.config.target_url;
        let (_browser, page) = match &self.config.chrome_executable {
            Some(executable) => browser::launch_headless_browser(executable, url)
                .await
                .context("启动无头浏览器失败")?,
            None => browser::connect_to_browser_and_page(self.config.browser_debug_port, url)
                .await
                .context("连接浏览器失败")?,
        };

        let live = Arc::new(LivePage::new(JsExecutor::new(page)));
        let poll = Duration::from_millis(self.config.mutation_poll_ms);
        let pump_source = Arc::clone(&live);
        self.drive(live, move |sink| Some(pump_source.spawn_mutation_pump(poll, sink)))
            .await
    }

    /// 在一个页面上跑完整流程
    ///
    /// # 参数
    /// - `source`: 页面
    /// - `attach_pump`: 接入页面变化来源，返回轮询任务（没有变化来源时返回 `None`）
    async fn drive<S, F>(&self, source: Arc<S>, attach_pump: F) -> Result<()>
    where
        S: DocumentSource,
        F: FnOnce(mpsc::Sender<MutationBatch>) -> Option<JoinHandle<()>>,
    {
        let provider = self.detect_provider(source.as_ref()).await;
        info!("🧭 表单类型: {:?}", provider);

        let (session, events) = FormSession::new(source);
        let session = Arc::new(session);
        let reporter = spawn_event_reporter(events, self.config.output_log_file.clone());

        let debounce = Duration::from_millis(self.config.mutation_debounce_ms);
        let mut watcher = MutationWatcher::new(provider.provider(), debounce).start(Arc::clone(&session));
        let pump = attach_pump(watcher.sender());

        let retries = RetryScheduler::from_config(&self.config).start(Arc::clone(&session));
        if let Some(attempts) = retries.join().await {
            debug!("定时提取结束，共 {} 次", attempts);
        }

        let schema = session.current_schema().await;
        if schema.is_empty() {
            warn!("⚠️ 页面上没有找到任何表单字段，程序结束");
        } else {
            self.fill_once(&session, &schema).await;
        }

        watcher.stop();
        if let Some(pump) = pump {
            pump.abort();
        }
        drop(session);
        if tokio::time::timeout(Duration::from_secs(1), reporter).await.is_err() {
            debug!("事件输出任务未在 1 秒内结束");
        }
        Ok(())
    }

    async fn detect_provider<S: DocumentSource>(&self, source: &S) -> ProviderKind {
        match source.snapshot().await {
            Ok(snapshot) if snapshot.url.is_some() => ProviderKind::detect(snapshot.url.as_deref()),
            Ok(_) => ProviderKind::detect(Some(&self.config.target_url)),
            Err(e) => {
                warn!("⚠️ 读取页面失败，按通用表单处理: {}", e);
                ProviderKind::Generic
            }
        }
    }

    async fn fill_once<S: DocumentSource>(&self, session: &FormSession<S>, schema: &FormSchema) {
        let answers = match self.resolve_answers(schema).await {
            Ok(answers) => answers,
            Err(e) => {
                session
                    .handle(Request::FillError {
                        error: e.to_string(),
                    })
                    .await;
                return;
            }
        };
        info!("📨 收到 {} 个答案", answers.len());

        match session.handle(Request::FillAnswers { answers }).await {
            Response::FillResult(result) => {
                if let Some(report) = session.last_report().await {
                    print_fill_summary(&report);
                } else {
                    debug!("填写计数: {:?}", result);
                }
            }
            Response::Error { message } => warn!("⚠️ 填写未完成: {}", message),
            other => debug!("意外的应答: {:?}", other),
        }
    }

    /// 答案来源：本地 JSON 文件优先，否则请求答案接口
    async fn resolve_answers(&self, schema: &FormSchema) -> AppResult<AnswerMap> {
        if let Some(path) = &self.config.answers_file {
            info!("📂 读取本地答案: {}", path);
            let text = fs::read_to_string(path).map_err(|e| AppError::file_read_failed(path, e))?;
            let answers = AnswerMap::from_json_str(&text)
                .map_err(|source| AnswerError::JsonParseFailed { source })?;
            return Ok(answers);
        }

        let client = AnswerClient::new(&self.config)?;
        client.ensure_available().await?;
        info!("🌐 请求答案接口: {}", client.fill_form_endpoint());
        Ok(client.fetch_answers(schema).await?)
    }
}

/// 把会话推送的事件输出到日志和日志文件
fn spawn_event_reporter(
    mut events: mpsc::UnboundedReceiver<Outbound>,
    log_file: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let line = match &event {
                Outbound::SchemaUpdate { schema, trigger } => {
                    log_schema(schema);
                    format!("{:?} 提取: {} 个字段", trigger, schema.len())
                }
                Outbound::Notice(notice) => {
                    match notice.level {
                        NoticeLevel::Error => warn!("{}", notice.message),
                        NoticeLevel::Success | NoticeLevel::Info => info!("{}", notice.message),
                    }
                    notice.message.clone()
                }
            };
            if let Err(e) = append_log_line(&log_file, &line) {
                warn!("⚠️ 写入日志文件失败: {}", e);
            }
        }
    })
}
