//! 表单结构模型

use serde::{Deserialize, Serialize};

use crate::dom::Locator;
use crate::providers::ProviderKind;

/// 字段类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldKind {
    /// 单行 / 多行文本
    Text,
    /// 单选
    Radio,
    /// 多选
    Checkbox,
    /// 下拉（原生 select 或 ARIA listbox）
    Dropdown,
}

impl FieldKind {
    /// 该类型是否必须带选项
    pub fn requires_options(self) -> bool {
        !matches!(self, FieldKind::Text)
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Text => "TEXT",
            FieldKind::Radio => "RADIO",
            FieldKind::Checkbox => "CHECKBOX",
            FieldKind::Dropdown => "DROPDOWN",
        }
    }
}

/// 选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDescriptor {
    pub value: String,
    #[serde(rename = "text")]
    pub display_text: String,
    pub locator: Locator,
}

/// 一个表单字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// 字段唯一标识，与答案表的 key 对应
    pub entry: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub label: String,
    pub required: bool,
    pub locator: Locator,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl FieldDescriptor {
    /// 创建文本字段
    pub fn text(
        entry: impl Into<String>,
        label: impl Into<String>,
        required: bool,
        locator: Locator,
        placeholder: Option<String>,
    ) -> Self {
        Self {
            entry: entry.into(),
            kind: FieldKind::Text,
            label: label.into(),
            required,
            locator,
            options: Vec::new(),
            placeholder,
        }
    }

    /// 创建带选项的字段（单选 / 多选 / 下拉）
    pub fn choice(
        kind: FieldKind,
        entry: impl Into<String>,
        label: impl Into<String>,
        required: bool,
        locator: Locator,
        options: Vec<OptionDescriptor>,
    ) -> Self {
        Self {
            entry: entry.into(),
            kind,
            label: label.into(),
            required,
            locator,
            options,
            placeholder: None,
        }
    }
}

/// 表单结构：一次提取的完整结果，生成后不再修改
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormSchema {
    #[serde(skip)]
    provider: ProviderKind,
    fields: Vec<FieldDescriptor>,
}

impl FormSchema {
    pub fn new(provider: ProviderKind, fields: Vec<FieldDescriptor>) -> Self {
        Self { provider, fields }
    }

    pub fn empty(provider: ProviderKind) -> Self {
        Self::new(provider, Vec::new())
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, entry: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.entry == entry)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 字段数是否超过阈值（足够好，可以停止重试）
    pub fn is_sufficient(&self, threshold: usize) -> bool {
        self.fields.len() > threshold
    }
}

impl<'a> IntoIterator for &'a FormSchema {
    type Item = &'a FieldDescriptor;
    type IntoIter = std::slice::Iter<'a, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_serializes_like_content_script_record() {
        let field = FieldDescriptor::choice(
            FieldKind::Radio,
            "entry.9",
            "Color",
            true,
            Locator::by_name("entry.9"),
            vec![OptionDescriptor {
                value: "red".into(),
                display_text: "Red".into(),
                locator: Locator::choice("radio", "entry.9", "red"),
            }],
        );
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["type"], "RADIO");
        assert_eq!(json["options"][0]["text"], "Red");
        assert!(json.get("placeholder").is_none());
    }

    #[test]
    fn test_schema_serializes_as_array() {
        let schema = FormSchema::new(
            ProviderKind::Google,
            vec![FieldDescriptor::text(
                "entry.1",
                "Name",
                false,
                Locator::by_name("entry.1"),
                None,
            )],
        );
        let json = serde_json::to_value(&schema).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["entry"], "entry.1");
        assert!(json[0].get("options").is_none());
    }

    #[test]
    fn test_sufficiency_is_strictly_greater() {
        let field = |i: usize| {
            FieldDescriptor::text(format!("e{}", i), "x", false, Locator::new("x"), None)
        };
        let three = FormSchema::new(ProviderKind::Generic, (0..3).map(field).collect());
        let four = FormSchema::new(ProviderKind::Generic, (0..4).map(field).collect());
        assert!(!three.is_sufficient(3));
        assert!(four.is_sufficient(3));
    }
}
