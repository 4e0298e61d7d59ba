//! 填写结果模型

use serde::{Deserialize, Serialize};

use crate::dom::Interaction;

/// 填写计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillResult {
    pub filled: usize,
    pub failed: usize,
    pub attempted: usize,
}

impl FillResult {
    pub fn record(&mut self, ok: bool) {
        self.attempted += 1;
        if ok {
            self.filled += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// 单个字段失败的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// 页面上找不到字段对应的元素
    ElementNotFound,
    /// 没有选项能匹配答案
    NoMatchingOption,
    /// 匹配到了选项但选项元素不存在
    OptionNotFound,
}

/// 单个字段的填写结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldStatus {
    Filled,
    Failed(FailureReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOutcome {
    pub entry: String,
    pub label: String,
    pub status: FieldStatus,
}

/// 一次填写的完整报告
#[derive(Debug, Clone, Default)]
pub struct FillReport {
    pub result: FillResult,
    pub outcomes: Vec<FieldOutcome>,
    /// 按顺序执行过的交互，可在实时页面上重放
    pub interactions: Vec<Interaction>,
}
