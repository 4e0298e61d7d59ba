//! 页面来源
//!
//! 提取和填写都只在某一时刻的文档快照上同步执行，
//! 来源负责提供快照、接收填写产生的交互日志。

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::dom::{Document, Interaction};
use crate::error::AppResult;

/// 某一时刻的页面内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: Option<String>,
    pub html: String,
}

impl PageSnapshot {
    pub fn new(url: Option<String>, html: impl Into<String>) -> Self {
        Self {
            url,
            html: html.into(),
        }
    }

    /// 解析为可查询、可交互的文档
    pub fn document(&self) -> Document {
        let doc = Document::parse(&self.html);
        match &self.url {
            Some(url) => doc.with_url(url.clone()),
            None => doc,
        }
    }
}

/// 一批新增节点（outerHTML 片段）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationBatch {
    pub added: Vec<String>,
}

impl MutationBatch {
    pub fn new(added: Vec<String>) -> Self {
        Self { added }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
    }
}

/// 页面来源
pub trait DocumentSource: Send + Sync + 'static {
    /// 获取当前页面快照
    fn snapshot(&self) -> impl Future<Output = AppResult<PageSnapshot>> + Send;

    /// 按顺序重放交互，返回实际执行的条数
    fn apply(&self, interactions: &[Interaction]) -> impl Future<Output = AppResult<usize>> + Send;
}
