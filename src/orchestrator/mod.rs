//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 决定"什么时候"提取和填写，本身不做提取和填写。
//!
//! ## 模块划分
//!
//! ### `retry_scheduler` - 定时提取
//! - 页面加载后按固定时间点重复提取
//! - 字段数超过阈值后取消剩余时间点
//!
//! ### `mutation_watcher` - 结构变化监听
//! - 过滤与表单无关的新增节点
//! - 防抖合并，静默后只提取一次
//!
//! ### `app` - 应用入口
//! - 持有浏览器资源和所有后台任务
//! - 获取答案并触发一次填写
//!
//! ## 层次关系
//!
//! ```text
//! app / retry_scheduler / mutation_watcher
//!     ↓
//! workflow::FormSession (状态机)
//!     ↓
//! services (提取 / 匹配 / 填写)
//!     ↓
//! infrastructure (页面)
//! ```

pub mod app;
pub mod mutation_watcher;
pub mod retry_scheduler;

pub use app::App;
pub use mutation_watcher::{MutationWatcher, WatcherHandle};
pub use retry_scheduler::{RetryHandle, RetryScheduler};
