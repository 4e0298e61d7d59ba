//! 文档层
//!
//! - `Document` - 某一时刻的页面快照，可查询、可交互、可序列化
//! - `Locator` - 可在实时页面上重新解析的选择器
//! - `Interaction` - 填写过程产生的可重放操作

pub mod css;
pub mod document;

pub use css::{quote_attr, Locator};
pub use document::{Action, DispatchedEvent, Document, DomEvent, Interaction, NodeId};
