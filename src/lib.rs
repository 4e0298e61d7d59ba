//! # Smart Form Filler
//!
//! 在网页表单上发现问题字段、按答案自动填写的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有页面资源，只暴露"取快照"和"重放交互"
//! - `LivePage` - 真实浏览器页面（通过 `JsExecutor`）
//! - `MemoryPage` - 内存中的 HTML，用于离线模式和测试
//!
//! ### ② 业务能力层（Services）
//! - `providers/` - 各站点的定位策略和问题块查找
//! - `SchemaExtractor` - 从快照中提取表单结构
//! - `answer_matcher` - 答案与选项的匹配规则
//! - `FillExecutor` - 在快照上执行填写并记录交互
//!
//! ### ③ 流程层（Workflow）
//! - `FormSession` - 状态机，处理 GET_SCHEMA / FILL_ANSWERS / FILL_ERROR
//!
//! ### ④ 编排层（Orchestration）
//! - `RetryScheduler` - 页面加载后的定时提取
//! - `MutationWatcher` - 结构变化后的防抖重新提取
//! - `App` - 资源和任务的生命周期
//!
//! ## 模块结构

pub mod browser;
pub mod clients;
pub mod config;
pub mod dom;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod providers;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use dom::Document;
pub use error::{AppError, AppResult};
pub use infrastructure::{DocumentSource, LivePage, MemoryPage};
pub use models::{AnswerMap, FieldDescriptor, FieldKind, FormSchema, Request, Response};
pub use orchestrator::{App, MutationWatcher, RetryScheduler};
pub use providers::ProviderKind;
pub use services::{FillExecutor, SchemaExtractor};
pub use workflow::{FormSession, SessionState};
