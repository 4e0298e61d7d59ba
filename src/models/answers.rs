//! 答案表模型

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// 单个字段的答案：单值或多值
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AnswerValue {
    One(String),
    Many(Vec<String>),
}

impl AnswerValue {
    /// 从任意 JSON 值转换；`null` 视为没有答案
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Null => None,
            JsonValue::Array(items) => Some(AnswerValue::Many(
                items.iter().filter_map(scalar_to_string).collect(),
            )),
            other => scalar_to_string(other).map(AnswerValue::One),
        }
    }

    /// 文本字段使用的字符串形式，多值用 ", " 连接
    pub fn as_text(&self) -> String {
        match self {
            AnswerValue::One(s) => s.clone(),
            AnswerValue::Many(items) => items.join(", "),
        }
    }

    /// 单选类字段使用的值：多值时取第一个
    pub fn first(&self) -> Option<&str> {
        match self {
            AnswerValue::One(s) => Some(s.as_str()),
            AnswerValue::Many(items) => items.first().map(String::as_str),
        }
    }

    /// 多选字段使用的值：单值视为只有一个元素的序列
    pub fn values(&self) -> Vec<&str> {
        match self {
            AnswerValue::One(s) => vec![s.as_str()],
            AnswerValue::Many(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

fn scalar_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::One(value.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        AnswerValue::One(value)
    }
}

impl From<Vec<&str>> for AnswerValue {
    fn from(values: Vec<&str>) -> Self {
        AnswerValue::Many(values.into_iter().map(str::to_string).collect())
    }
}

/// 答案表：entry → 答案
///
/// 由调用方持有，只在一次填写中借用
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, JsonValue>")]
pub struct AnswerMap(BTreeMap<String, AnswerValue>);

impl AnswerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析 JSON 对象字符串
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn insert(&mut self, entry: impl Into<String>, value: impl Into<AnswerValue>) {
        self.0.insert(entry.into(), value.into());
    }

    pub fn get(&self, entry: &str) -> Option<&AnswerValue> {
        self.0.get(entry)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &AnswerValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<HashMap<String, JsonValue>> for AnswerMap {
    fn from(raw: HashMap<String, JsonValue>) -> Self {
        Self(
            raw.into_iter()
                .filter_map(|(entry, value)| AnswerValue::from_json(&value).map(|v| (entry, v)))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<AnswerValue>> FromIterator<(K, V)> for AnswerMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_answers() {
        let answers = AnswerMap::from_json_str(
            r#"{"entry.1": "Jane", "entry.2": ["a", "b"], "entry.3": 42, "entry.4": null, "entry.5": true}"#,
        )
        .unwrap();

        assert_eq!(answers.len(), 4);
        assert_eq!(answers.get("entry.1"), Some(&AnswerValue::One("Jane".into())));
        assert_eq!(answers.get("entry.2").unwrap().values(), vec!["a", "b"]);
        assert_eq!(answers.get("entry.3").unwrap().first(), Some("42"));
        assert!(answers.get("entry.4").is_none());
        assert_eq!(answers.get("entry.5").unwrap().as_text(), "true");
    }

    #[test]
    fn test_scalar_becomes_one_element_sequence() {
        let value = AnswerValue::from("x");
        assert_eq!(value.values(), vec!["x"]);
    }

    #[test]
    fn test_serialize_round_shape() {
        let answers: AnswerMap = [("entry.1", AnswerValue::from(vec!["a", "b"]))]
            .into_iter()
            .collect();
        let json = serde_json::to_value(&answers).unwrap();
        assert_eq!(json["entry.1"][1], "b");
    }
}
