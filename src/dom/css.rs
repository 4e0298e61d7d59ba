//! 定位器与 CSS 转义
//!
//! 所有插入到选择器里的外部值（name / value / id）都必须经过转义，
//! 否则值里的引号或反斜杠会让选择器失效，甚至命中错误的元素。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 把任意字符串转成可以放进 CSS 属性选择器的带引号字符串
///
/// # 示例
/// `a"b` → `"a\"b"`
pub fn quote_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\0' => out.push('\u{FFFD}'),
            c if c.is_control() => {
                // 控制字符使用十六进制转义，末尾空格结束转义序列
                out.push_str(&format!("\\{:x} ", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// 定位器：一条可以在实时文档上重新解析的 CSS 选择器
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    pub fn new(css: impl Into<String>) -> Self {
        Self(css.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `[name="…"]`
    pub fn by_name(name: &str) -> Self {
        Self(format!("[name={}]", quote_attr(name)))
    }

    /// `select[name="…"]` 之类带标签名的定位
    pub fn tag_with_name(tag: &str, name: &str) -> Self {
        Self(format!("{}[name={}]", tag, quote_attr(name)))
    }

    /// 单选 / 多选的某个选项：`input[type="radio"][name="…"][value="…"]`
    pub fn choice(input_type: &str, name: &str, value: &str) -> Self {
        Self(format!(
            "input[type={}][name={}][value={}]",
            quote_attr(input_type),
            quote_attr(name),
            quote_attr(value)
        ))
    }

    /// 同名的一组单选 / 多选：`input[type="radio"][name="…"]`
    pub fn group(input_type: &str, name: &str) -> Self {
        Self(format!(
            "input[type={}][name={}]",
            quote_attr(input_type),
            quote_attr(name)
        ))
    }

    /// `[id="…"]`
    pub fn by_id(id: &str) -> Self {
        Self(format!("[id={}]", quote_attr(id)))
    }

    /// 在当前定位器下按属性值查找后代
    pub fn descendant_with_attr(&self, css: &str, attr: &str, value: &str) -> Self {
        Self(format!("{} {}[{}={}]", self.0, css, attr, quote_attr(value)))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Locator {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
