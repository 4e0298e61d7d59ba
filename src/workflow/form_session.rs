//! 表单会话 - 流程层
//!
//! 核心职责：持有当前表单结构和状态机，处理调用方的三种请求。
//!
//! 状态流转：
//! ```text
//! IDLE → EXTRACTING → SCHEMA_EMPTY | SCHEMA_READY
//! SCHEMA_READY --填写--> FILLING → FILLED | PARTIALLY_FILLED --下一次请求--> IDLE
//! 任意状态（FILLING 除外）--结构变化--> REEXTRACT_SCHEDULED → EXTRACTING
//! FILLING 期间的所有结构变化合并为填写结束后的一次补充提取
//! ```

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::error::{AppError, AppResult, FillError};
use crate::infrastructure::DocumentSource;
use crate::models::{
    AnswerMap, ExtractTrigger, FillReport, FillResult, FormSchema, Notice, Outbound, Request,
    Response,
};
use crate::services::{FillExecutor, SchemaExtractor};

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Idle,
    Extracting,
    SchemaEmpty,
    SchemaReady,
    ReextractScheduled,
    Filling,
    Filled,
    PartiallyFilled,
}

#[derive(Debug)]
struct SessionInner {
    state: SessionState,
    /// 最近一次非空的表单结构
    schema: FormSchema,
    /// 填写期间收到的提取请求，填写结束后合并执行一次
    pending_reextract: bool,
    extractions: usize,
    last_fill: Option<FillReport>,
}

/// 表单会话
pub struct FormSession<S: DocumentSource> {
    source: Arc<S>,
    inner: Mutex<SessionInner>,
    /// 同一时间只允许一次填写
    fill_lock: Mutex<()>,
    events: mpsc::UnboundedSender<Outbound>,
}

impl<S: DocumentSource> FormSession<S> {
    /// 创建会话，返回会话和推送事件的接收端
    pub fn new(source: Arc<S>) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let session = Self {
            source,
            inner: Mutex::new(SessionInner {
                state: SessionState::Idle,
                schema: FormSchema::default(),
                pending_reextract: false,
                extractions: 0,
                last_fill: None,
            }),
            fill_lock: Mutex::new(()),
            events,
        };
        (session, receiver)
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// 当前（最近一次非空的）表单结构
    pub async fn current_schema(&self) -> FormSchema {
        self.inner.lock().await.schema.clone()
    }

    /// 已完成的提取次数
    pub async fn extraction_count(&self) -> usize {
        self.inner.lock().await.extractions
    }

    /// 最近一次填写的计数
    pub async fn last_fill(&self) -> Option<FillResult> {
        self.inner.lock().await.last_fill.as_ref().map(|report| report.result)
    }

    /// 最近一次填写的完整报告
    pub async fn last_report(&self) -> Option<FillReport> {
        self.inner.lock().await.last_fill.clone()
    }

    /// 标记页面结构已变化
    ///
    /// # 返回
    /// `true` 表示填写进行中，变化已并入填写结束后的补充提取，调用方无需再安排提取
    pub async fn mark_reextract_scheduled(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.state == SessionState::Filling {
            inner.pending_reextract = true;
            return true;
        }
        inner.state = SessionState::ReextractScheduled;
        false
    }

    fn publish(&self, event: Outbound) {
        if self.events.send(event).is_err() {
            debug!("事件接收端已关闭，丢弃推送");
        }
    }

    fn notify(&self, notice: Notice) {
        self.publish(Outbound::Notice(notice));
    }

    // ========== 提取 ==========

    /// 执行一次提取
    ///
    /// # 返回
    /// 本次提取的结果（可能为空）；填写进行中时不提取，返回当前结构
    pub async fn extract(&self, trigger: ExtractTrigger) -> AppResult<FormSchema> {
        {
            let mut inner = self.inner.lock().await;
            if inner.state == SessionState::Filling {
                debug!("填写进行中，{:?} 提取推迟到填写结束", trigger);
                inner.pending_reextract = true;
                return Ok(inner.schema.clone());
            }
            inner.state = SessionState::Extracting;
        }

        let snapshot = match self.source.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.settle_after_extract().await;
                return Err(e);
            }
        };
        let schema = {
            let doc = snapshot.document();
            SchemaExtractor::for_document(&doc).extract(&doc)
        };
        self.accept_schema(&schema, trigger).await;
        Ok(schema)
    }

    /// 接收一次提取结果：非空结构整体替换当前结构，空结构不覆盖
    async fn accept_schema(&self, schema: &FormSchema, trigger: ExtractTrigger) {
        let mut inner = self.inner.lock().await;
        inner.extractions += 1;
        if schema.is_empty() {
            debug!("⚠️ {:?} 提取未找到字段", trigger);
        } else {
            info!("✓ {:?} 提取到 {} 个字段", trigger, schema.len());
            inner.schema = schema.clone();
            self.publish(Outbound::SchemaUpdate {
                schema: schema.clone(),
                trigger,
            });
        }
        if inner.state != SessionState::Filling {
            inner.state = ready_state(&inner.schema);
        }
    }

    async fn settle_after_extract(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Filling {
            inner.state = ready_state(&inner.schema);
        }
    }

    // ========== 填写 ==========

    /// 执行一次填写
    ///
    /// 先重新提取；新结构为空时使用当前结构，两者都为空返回 `FillError::NoSchema`
    pub async fn fill(&self, answers: &AnswerMap) -> AppResult<FillReport> {
        let _guard = self.fill_lock.lock().await;
        self.inner.lock().await.state = SessionState::Filling;

        let outcome = self.fill_inner(answers).await;

        let follow_up = {
            let mut inner = self.inner.lock().await;
            match &outcome {
                Ok(report) => {
                    inner.state = if report.result.is_complete() {
                        SessionState::Filled
                    } else {
                        SessionState::PartiallyFilled
                    };
                    inner.last_fill = Some(report.clone());
                    debug!("填写状态: {:?}", inner.state);
                }
                Err(_) => inner.state = ready_state(&inner.schema),
            }
            std::mem::take(&mut inner.pending_reextract)
        };

        if follow_up {
            info!("🔄 填写期间页面结构发生变化，补充提取一次");
            if let Err(e) = self.extract(ExtractTrigger::Mutation).await {
                warn!("⚠️ 补充提取失败: {}", e);
            }
        }
        outcome
    }

    async fn fill_inner(&self, answers: &AnswerMap) -> AppResult<FillReport> {
        let snapshot = self.source.snapshot().await?;
        let current = self.current_schema().await;

        let (fresh, report) = {
            let mut doc = snapshot.document();
            let fresh = SchemaExtractor::for_document(&doc).extract(&doc);
            let schema = if fresh.is_empty() { &current } else { &fresh };
            let report = FillExecutor::new(&mut doc).fill(schema, answers)?;
            (fresh, report)
        };
        if !fresh.is_empty() {
            self.accept_schema(&fresh, ExtractTrigger::Fill).await;
        }

        self.source.apply(&report.interactions).await?;
        Ok(report)
    }

    // ========== 请求处理 ==========

    /// 处理调用方请求
    pub async fn handle(&self, request: Request) -> Response {
        self.close_fill_cycle().await;
        match request {
            Request::GetSchema => match self.extract(ExtractTrigger::Request).await {
                Ok(schema) if !schema.is_empty() => Response::Schema { schema },
                Ok(_) => Response::Schema {
                    schema: self.current_schema().await,
                },
                Err(e) => {
                    error!("❌ 提取表单结构失败: {}", e);
                    Response::Error {
                        message: e.to_string(),
                    }
                }
            },
            Request::FillAnswers { answers } => self.handle_fill(&answers).await,
            Request::FillError { error } => {
                warn!("❌ 答案获取失败: {}", error);
                self.notify(Notice::error(format!("❌ Error: {}", error)));
                Response::Ack
            }
        }
    }

    /// 上一次填写的结果状态保留到下一次请求，然后回到 IDLE
    async fn close_fill_cycle(&self) {
        let mut inner = self.inner.lock().await;
        if matches!(
            inner.state,
            SessionState::Filled | SessionState::PartiallyFilled
        ) {
            inner.state = SessionState::Idle;
        }
    }

    async fn handle_fill(&self, answers: &AnswerMap) -> Response {
        if answers.is_empty() {
            warn!("⚠️ 没有收到任何答案");
            self.notify(Notice::error("No answers provided"));
            return Response::FillResult(FillResult::default());
        }

        match self.fill(answers).await {
            Ok(report) => {
                let result = report.result;
                if result.filled > 0 {
                    self.notify(Notice::success(format!(
                        "✅ Filled {}/{} fields successfully!",
                        result.filled,
                        answers.len()
                    )));
                } else if result.failed > 0 {
                    self.notify(Notice::error(
                        "❌ Failed to fill any fields. Check form compatibility.",
                    ));
                } else {
                    self.notify(Notice::info("No answers matched a field on this form"));
                }
                Response::FillResult(result)
            }
            Err(e) => {
                if matches!(e, AppError::Fill(FillError::NoSchema)) {
                    warn!("⚠️ 页面上没有可填写的字段");
                } else {
                    error!("❌ 填写失败: {}", e);
                }
                self.notify(Notice::error(format!("❌ Error: {}", e)));
                Response::Error {
                    message: e.to_string(),
                }
            }
        }
    }
}

fn ready_state(schema: &FormSchema) -> SessionState {
    if schema.is_empty() {
        SessionState::SchemaEmpty
    } else {
        SessionState::SchemaReady
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryPage;
    use crate::models::NoticeLevel;

    const PAGE: &str = r#"<form>
        <div role="listitem"><div role="heading">Full Name</div><input type="text" name="entry.123"></div>
        <div role="listitem"><div role="heading">Colour</div>
          <label><input type="radio" name="entry.9" value="red">Red</label>
          <label><input type="radio" name="entry.9" value="blue">Blue</label>
        </div>
      </form>"#;

    fn session(html: &str) -> (FormSession<MemoryPage>, mpsc::UnboundedReceiver<Outbound>) {
        FormSession::new(Arc::new(
            MemoryPage::new(html).with_url("https://docs.google.com/forms/d/e/x/viewform"),
        ))
    }

    #[tokio::test]
    async fn test_get_schema_publishes_update() {
        let (session, mut events) = session(PAGE);
        let response = session.handle(Request::GetSchema).await;

        match response {
            Response::Schema { schema } => assert_eq!(schema.len(), 2),
            other => panic!("unexpected response: {:?}", other),
        }
        assert_eq!(session.state().await, SessionState::SchemaReady);
        assert!(matches!(
            events.try_recv().unwrap(),
            Outbound::SchemaUpdate {
                trigger: ExtractTrigger::Request,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_fill_updates_page_and_notifies() {
        let (session, mut events) = session(PAGE);
        let answers: AnswerMap = [("entry.123", "Jane Doe"), ("entry.9", "blue")]
            .into_iter()
            .collect();

        let response = session.handle(Request::FillAnswers { answers }).await;

        assert_eq!(
            response,
            Response::FillResult(FillResult {
                filled: 2,
                failed: 0,
                attempted: 2
            })
        );
        assert_eq!(session.state().await, SessionState::Filled);

        let doc = session.source().document().await;
        let name = doc.query(r#"[name="entry.123"]"#).unwrap().unwrap();
        let blue = doc.query(r#"[value="blue"]"#).unwrap().unwrap();
        assert_eq!(doc.value(name), "Jane Doe");
        assert!(doc.is_checked(blue));

        let mut notices = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let Outbound::Notice(notice) = event {
                notices.push(notice);
            }
        }
        assert_eq!(
            notices,
            vec![Notice::success("✅ Filled 2/2 fields successfully!")]
        );
    }

    #[tokio::test]
    async fn test_fill_without_form_is_no_schema_error() {
        let (session, mut events) = session("<div>nothing</div>");
        let answers: AnswerMap = [("entry.1", "x")].into_iter().collect();

        let response = session.handle(Request::FillAnswers { answers }).await;

        assert!(matches!(response, Response::Error { .. }));
        assert_eq!(session.state().await, SessionState::SchemaEmpty);
        match events.try_recv().unwrap() {
            Outbound::Notice(notice) => assert_eq!(notice.level, NoticeLevel::Error),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_answers_and_fill_error_only_notify() {
        let (session, mut events) = session(PAGE);
        let before = session.source().html().await;

        let response = session
            .handle(Request::FillAnswers {
                answers: AnswerMap::new(),
            })
            .await;
        assert_eq!(response, Response::FillResult(FillResult::default()));

        let response = session
            .handle(Request::FillError {
                error: "quota exceeded".into(),
            })
            .await;
        assert_eq!(response, Response::Ack);

        assert_eq!(session.source().html().await, before);
        let messages: Vec<String> = std::iter::from_fn(|| events.try_recv().ok())
            .filter_map(|event| match event {
                Outbound::Notice(notice) => Some(notice.message),
                _ => None,
            })
            .collect();
        assert_eq!(
            messages,
            vec![
                "No answers provided".to_string(),
                "❌ Error: quota exceeded".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_pass_keeps_previous_schema() {
        let (session, _events) = session(PAGE);
        session.extract(ExtractTrigger::Request).await.unwrap();

        session.source().set_html("<div>re-rendering</div>").await;
        let pass = session.extract(ExtractTrigger::Mutation).await.unwrap();

        assert!(pass.is_empty());
        assert_eq!(session.current_schema().await.len(), 2);
        assert_eq!(session.state().await, SessionState::SchemaReady);
    }

    #[tokio::test]
    async fn test_fill_outcome_state_lasts_until_next_request() {
        let (session, _events) = session(PAGE);
        let answers: AnswerMap = [("entry.123", "Jane"), ("entry.9", "green")]
            .into_iter()
            .collect();

        session.handle(Request::FillAnswers { answers }).await;
        assert_eq!(session.state().await, SessionState::PartiallyFilled);
        assert_eq!(
            session.last_fill().await,
            Some(FillResult {
                filled: 1,
                failed: 1,
                attempted: 2
            })
        );

        session.handle(Request::GetSchema).await;
        assert_eq!(session.state().await, SessionState::SchemaReady);
    }

    #[tokio::test]
    async fn test_mutation_mark_during_fill_is_deferred() {
        let (session, _events) = session(PAGE);
        assert!(!session.mark_reextract_scheduled().await);
        assert_eq!(session.state().await, SessionState::ReextractScheduled);

        session.inner.lock().await.state = SessionState::Filling;
        assert!(session.mark_reextract_scheduled().await);
        assert_eq!(session.state().await, SessionState::Filling);
        assert!(session.inner.lock().await.pending_reextract);
    }

    #[tokio::test]
    async fn test_answers_without_fields_get_info_notice() {
        let (session, mut events) = session(PAGE);
        let answers: AnswerMap = [("entry.unknown", "x")].into_iter().collect();

        let response = session.handle(Request::FillAnswers { answers }).await;

        assert_eq!(response, Response::FillResult(FillResult::default()));
        match events.try_recv().unwrap() {
            Outbound::Notice(notice) => assert_eq!(notice.level, NoticeLevel::Info),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
