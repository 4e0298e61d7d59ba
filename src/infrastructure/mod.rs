//! 基础设施层
//!
//! 持有页面资源，只暴露"取快照"和"重放交互"两种能力。

pub mod document_source;
pub mod js_executor;
pub mod live_page;
pub mod memory_page;

pub use document_source::{DocumentSource, MutationBatch, PageSnapshot};
pub use js_executor::JsExecutor;
pub use live_page::LivePage;
pub use memory_page::MemoryPage;
