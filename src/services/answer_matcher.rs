/// 答案匹配服务
///
/// 把答案表里的一个值解析成字段上的具体选项。
/// 按选项声明顺序逐个检查，选项满足任一规则即命中：
/// 1. 与 `value` 完全相等
/// 2. 与显示文字完全相等
/// 3. 答案（忽略大小写）包含在显示文字中
use tracing::debug;

use crate::models::{AnswerValue, FieldDescriptor, FieldKind, OptionDescriptor};

/// 命中的规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    Value,
    DisplayText,
    Contains,
}

/// 一次命中
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionMatch<'a> {
    pub index: usize,
    pub option: &'a OptionDescriptor,
    pub rule: MatchRule,
}

/// 字段级的匹配结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMatch<'a> {
    /// 文本字段：直接写入的字符串
    Text(String),
    /// 单选 / 下拉：命中的选项，`None` 表示没有匹配
    Single(Option<OptionMatch<'a>>),
    /// 多选：每个请求值各自的匹配结果（与请求顺序一致）
    Multiple(Vec<(String, Option<OptionMatch<'a>>)>),
}

/// 检查单个选项满足的第一条规则
fn rule_for(option: &OptionDescriptor, answer: &str, answer_lower: &str) -> Option<MatchRule> {
    if option.value == answer {
        Some(MatchRule::Value)
    } else if option.display_text == answer {
        Some(MatchRule::DisplayText)
    } else if option.display_text.to_lowercase().contains(answer_lower) {
        Some(MatchRule::Contains)
    } else {
        None
    }
}

/// 在选项列表中查找答案
///
/// 空白答案不匹配任何选项（否则"包含"规则会命中第一个选项）。
pub fn match_option<'a>(options: &'a [OptionDescriptor], answer: &str) -> Option<OptionMatch<'a>> {
    if answer.trim().is_empty() {
        return None;
    }
    let answer_lower = answer.to_lowercase();
    options.iter().enumerate().find_map(|(index, option)| {
        rule_for(option, answer, &answer_lower).map(|rule| OptionMatch {
            index,
            option,
            rule,
        })
    })
}

/// 按字段类型解析答案
pub fn match_field<'a>(field: &'a FieldDescriptor, answer: &AnswerValue) -> FieldMatch<'a> {
    let result = match field.kind {
        FieldKind::Text => FieldMatch::Text(answer.as_text()),
        FieldKind::Radio | FieldKind::Dropdown => FieldMatch::Single(
            answer
                .first()
                .and_then(|value| match_option(&field.options, value)),
        ),
        FieldKind::Checkbox => FieldMatch::Multiple(
            answer
                .values()
                .into_iter()
                .map(|value| (value.to_string(), match_option(&field.options, value)))
                .collect(),
        ),
    };
    debug!("字段 {} 匹配结果: {:?}", field.entry, result);
    result
}
