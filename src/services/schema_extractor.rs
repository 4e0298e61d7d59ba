/// 表单结构提取服务
///
/// 把站点适配器找到的问题块逐个转换成字段描述。
/// 单个问题块出错只跳过该块，不影响整次提取。
use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::dom::{Document, Locator, NodeId};
use crate::error::DomError;
use crate::models::{FieldDescriptor, FieldKind, FormSchema, OptionDescriptor};
use crate::providers::strategies::{
    LabelSource, LocatorStrategies, OptionLabelSource, LABEL_MAX_CHARS, LABEL_MIN_CHARS,
};
use crate::providers::{FormProvider, ProviderKind};

const CHOICE_CONTROLS: &str = r#"input[type="radio"], input[type="checkbox"]"#;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// 折叠空白并去掉首尾空白
pub fn normalize_text(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// 表单结构提取服务
pub struct SchemaExtractor {
    provider: &'static dyn FormProvider,
}

impl SchemaExtractor {
    pub fn new(provider: &'static dyn FormProvider) -> Self {
        Self { provider }
    }

    /// 按文档 URL 选择站点适配器
    pub fn for_document(doc: &Document) -> Self {
        Self::new(ProviderKind::detect(doc.url()).provider())
    }

    pub fn provider(&self) -> &'static dyn FormProvider {
        self.provider
    }

    /// 执行一次完整提取
    ///
    /// # 返回
    /// 按问题块顺序排列的表单结构；没有表单时返回空结构
    pub fn extract(&self, doc: &Document) -> FormSchema {
        let blocks = self.provider.find_blocks(doc);
        debug!(
            "🔎 {:?} 适配器找到 {} 个问题块",
            self.provider.kind(),
            blocks.len()
        );

        let mut seen = HashSet::new();
        let mut fields = Vec::new();
        for (index, block) in blocks.into_iter().enumerate() {
            match self.extract_block(doc, block, index + 1) {
                Ok(Some(field)) => {
                    if seen.insert(field.entry.clone()) {
                        fields.push(field);
                    } else {
                        debug!("跳过重复字段: {}", field.entry);
                    }
                }
                Ok(None) => debug!("问题块 {} 没有可识别的控件", index + 1),
                Err(e) => warn!("⚠️ 问题块 {} 提取失败，已跳过: {}", index + 1, e),
            }
        }

        FormSchema::new(self.provider.kind(), fields)
    }

    /// 提取单个问题块
    ///
    /// # 参数
    /// - `position`: 问题块序号（从 1 开始），用于默认标签
    fn extract_block(
        &self,
        doc: &Document,
        block: NodeId,
        position: usize,
    ) -> Result<Option<FieldDescriptor>, DomError> {
        let strategies = self.provider.strategies();
        let label = resolve_label(doc, block, strategies)
            .unwrap_or_else(|| format!("Question {}", position));
        let required = is_required(doc, block, strategies) || label.contains('*');

        if let Some(field) = classify_text(doc, block, strategies, &label, required)? {
            return Ok(Some(field));
        }
        for (kind, css) in [
            (FieldKind::Radio, strategies.radio_inputs),
            (FieldKind::Checkbox, strategies.checkbox_inputs),
        ] {
            if let Some(field) = classify_choice(doc, block, strategies, kind, css, &label, required)? {
                return Ok(Some(field));
            }
        }
        classify_dropdown(doc, block, strategies, &label, required)
    }
}

// ========== 标签 ==========

fn resolve_label(doc: &Document, block: NodeId, strategies: &LocatorStrategies) -> Option<String> {
    strategies.labels.iter().find_map(|source| {
        let text = match source {
            LabelSource::AriaLabelledBy => {
                let ids = doc.attr(block, "aria-labelledby")?;
                ids.split_whitespace()
                    .filter_map(|id| doc.element_by_id(id))
                    .map(|node| doc.text(node))
                    .collect::<Vec<_>>()
                    .join(" ")
            }
            LabelSource::Css(css) => doc.text(doc.query_within(block, css).ok().flatten()?),
        };
        let text = normalize_text(&text);
        let chars = text.chars().count();
        (LABEL_MIN_CHARS..=LABEL_MAX_CHARS)
            .contains(&chars)
            .then_some(text)
    })
}

fn is_required(doc: &Document, block: NodeId, strategies: &LocatorStrategies) -> bool {
    strategies.required_markers.iter().any(|css| {
        doc.matches(block, css).unwrap_or(false)
            || doc.query_within(block, css).ok().flatten().is_some()
    })
}

fn non_empty_attr<'a>(doc: &'a Document, id: NodeId, name: &str) -> Option<&'a str> {
    doc.attr(id, name).filter(|v| !v.trim().is_empty())
}

// ========== 分类 ==========

fn classify_text(
    doc: &Document,
    block: NodeId,
    strategies: &LocatorStrategies,
    label: &str,
    required: bool,
) -> Result<Option<FieldDescriptor>, DomError> {
    for css in strategies.text_inputs {
        let Some(input) = doc.query_within(block, css)? else {
            continue;
        };
        // 没有 name 的输入框无法与答案对应
        let Some(name) = non_empty_attr(doc, input, "name") else {
            continue;
        };
        let placeholder = non_empty_attr(doc, input, "placeholder").map(normalize_text);
        return Ok(Some(FieldDescriptor::text(
            name,
            label,
            required,
            Locator::tag_with_name(doc.tag(input), name),
            placeholder,
        )));
    }
    Ok(None)
}

fn classify_choice(
    doc: &Document,
    block: NodeId,
    strategies: &LocatorStrategies,
    kind: FieldKind,
    css: &str,
    label: &str,
    required: bool,
) -> Result<Option<FieldDescriptor>, DomError> {
    let controls = doc.query_all_within(block, css)?;
    let Some(name) = controls
        .first()
        .and_then(|first| non_empty_attr(doc, *first, "name"))
    else {
        return Ok(None);
    };
    let input_type = match kind {
        FieldKind::Checkbox => "checkbox",
        _ => "radio",
    };

    let options: Vec<OptionDescriptor> = controls
        .iter()
        .copied()
        .filter(|control| doc.attr(*control, "name") == Some(name))
        .enumerate()
        .map(|(i, control)| {
            let raw_value = doc.attr(control, "value");
            let display_text = option_label(doc, control, strategies)
                .or_else(|| raw_value.filter(|v| !v.trim().is_empty()).map(str::to_string))
                .unwrap_or_else(|| format!("Option {}", i + 1));
            let (value, locator) = match raw_value {
                Some(value) => (value.to_string(), Locator::choice(input_type, name, value)),
                None => (format!("option_{}", i), doc.css_path(control)),
            };
            OptionDescriptor {
                value,
                display_text,
                locator,
            }
        })
        .collect();

    Ok(Some(FieldDescriptor::choice(
        kind,
        name,
        label,
        required,
        Locator::group(input_type, name),
        options,
    )))
}

fn option_label(doc: &Document, control: NodeId, strategies: &LocatorStrategies) -> Option<String> {
    let text_of = |node: NodeId| Some(normalize_text(&doc.text(node))).filter(|t| !t.is_empty());

    strategies.option_labels.iter().find_map(|source| match source {
        OptionLabelSource::ClosestLabel => doc.closest(control, "label").ok().flatten().and_then(text_of),
        OptionLabelSource::LabelFor => {
            let id = doc.attr(control, "id")?;
            let css = format!("label[for={}]", crate::dom::quote_attr(id));
            doc.query(&css).ok().flatten().and_then(text_of)
        }
        OptionLabelSource::Ancestors { selectors, depth } => {
            let mut current = doc.parent_element(control);
            for _ in 0..*depth {
                let node = current?;
                // 祖先同时包住多个选项时，里面的文字不再属于当前选项
                let siblings = doc
                    .query_all_within(node, CHOICE_CONTROLS)
                    .map(|c| c.len())
                    .unwrap_or(0);
                if siblings > 1 {
                    return None;
                }
                let hit = selectors.iter().find_map(|css| {
                    if doc.matches(node, css).unwrap_or(false) {
                        return text_of(node);
                    }
                    doc.query_within(node, css).ok().flatten().and_then(text_of)
                });
                if hit.is_some() {
                    return hit;
                }
                current = doc.parent_element(node);
            }
            None
        }
    })
}

fn classify_dropdown(
    doc: &Document,
    block: NodeId,
    strategies: &LocatorStrategies,
    label: &str,
    required: bool,
) -> Result<Option<FieldDescriptor>, DomError> {
    for css in strategies.dropdowns {
        let Some(dropdown) = doc.query_within(block, css)? else {
            continue;
        };
        let field = if doc.tag(dropdown) == "select" {
            native_select(doc, dropdown, label, required)
        } else {
            aria_listbox(doc, block, dropdown, strategies, label, required)?
        };
        if field.is_some() {
            return Ok(field);
        }
    }
    Ok(None)
}

fn is_usable_option(doc: &Document, option: NodeId, value: &str) -> bool {
    !value.trim().is_empty() && doc.attr(option, "hidden").is_none()
}

fn native_select(
    doc: &Document,
    select: NodeId,
    label: &str,
    required: bool,
) -> Option<FieldDescriptor> {
    let name = non_empty_attr(doc, select, "name")?;
    let locator = Locator::tag_with_name("select", name);

    let options: Vec<OptionDescriptor> = doc
        .select_options(select)
        .into_iter()
        .filter_map(|option| {
            let value = doc.option_value(option);
            if !is_usable_option(doc, option, &value) {
                return None;
            }
            let text = normalize_text(&doc.text(option));
            let option_locator = match doc.attr(option, "value") {
                Some(raw) => locator.descendant_with_attr("option", "value", raw),
                None => doc.css_path(option),
            };
            Some(OptionDescriptor {
                display_text: if text.is_empty() { value.clone() } else { text },
                value,
                locator: option_locator,
            })
        })
        .collect();

    if options.is_empty() {
        debug!("下拉框 {} 没有可用选项，跳过", name);
        return None;
    }
    Some(FieldDescriptor::choice(
        FieldKind::Dropdown,
        name,
        label,
        required,
        locator,
        options,
    ))
}

fn aria_listbox(
    doc: &Document,
    block: NodeId,
    listbox: NodeId,
    strategies: &LocatorStrategies,
    label: &str,
    required: bool,
) -> Result<Option<FieldDescriptor>, DomError> {
    let hidden_name = doc
        .query_within(block, strategies.hidden_entry)?
        .and_then(|hidden| non_empty_attr(doc, hidden, "name"));
    let entry = non_empty_attr(doc, listbox, "name")
        .or_else(|| non_empty_attr(doc, listbox, "data-name"))
        .or(hidden_name)
        .or_else(|| non_empty_attr(doc, listbox, "id"));
    let Some(entry) = entry else {
        return Ok(None);
    };

    let locator = match non_empty_attr(doc, listbox, "id") {
        Some(id) => Locator::by_id(id),
        None => doc.css_path(listbox),
    };

    let options: Vec<OptionDescriptor> = doc
        .query_all_within(listbox, strategies.listbox_options)?
        .into_iter()
        .filter_map(|option| {
            let text = normalize_text(&doc.text(option));
            let value = doc
                .attr(option, "data-value")
                .map(str::to_string)
                .unwrap_or_else(|| text.clone());
            if !is_usable_option(doc, option, &value) {
                return None;
            }
            let option_locator = match doc.attr(option, "data-value") {
                Some(raw) => locator.descendant_with_attr(strategies.listbox_options, "data-value", raw),
                None => doc.css_path(option),
            };
            Some(OptionDescriptor {
                display_text: if text.is_empty() { value.clone() } else { text },
                value,
                locator: option_locator,
            })
        })
        .collect();

    if options.is_empty() {
        debug!("列表框 {} 没有可用选项，跳过", entry);
        return Ok(None);
    }
    Ok(Some(FieldDescriptor::choice(
        FieldKind::Dropdown,
        entry,
        label,
        required,
        locator,
        options,
    )))
}
