//! 内存文档
//!
//! 用 `scraper` 解析 HTML，再在上面叠加一层"实时属性"（value / checked /
//! selected），模拟浏览器里 property 与 attribute 分离的行为。
//! 所有交互都会记录到事件日志中，方便测试断言事件顺序。

use std::collections::HashMap;

use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dom::css::{quote_attr, Locator};
use crate::error::DomError;

pub use ego_tree::NodeId;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// 交互事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomEvent {
    Focus,
    Input,
    Change,
    Blur,
    Click,
}

impl DomEvent {
    /// DOM 事件名
    pub fn as_str(self) -> &'static str {
        match self {
            DomEvent::Focus => "focus",
            DomEvent::Input => "input",
            DomEvent::Change => "change",
            DomEvent::Blur => "blur",
            DomEvent::Click => "click",
        }
    }
}

/// 针对单个元素的操作
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Action {
    Focus,
    SetValue(String),
    Dispatch(DomEvent),
    Click,
}

/// 可重放的交互：定位器 + 操作
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub locator: Locator,
    pub action: Action,
}

/// 事件日志中的一条记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedEvent {
    pub target: NodeId,
    pub event: DomEvent,
}

/// 某一时刻的页面文档
pub struct Document {
    html: Html,
    url: Option<String>,
    values: HashMap<NodeId, String>,
    checked: HashMap<NodeId, bool>,
    selected: HashMap<NodeId, bool>,
    events: Vec<DispatchedEvent>,
}

impl Document {
    /// 解析完整的 HTML 文档
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
            url: None,
            values: HashMap::new(),
            checked: HashMap::new(),
            selected: HashMap::new(),
            events: Vec::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    // ========== 查询 ==========

    fn selector(css: &str) -> Result<Selector, DomError> {
        Selector::parse(css).map_err(|e| DomError::InvalidSelector {
            selector: css.to_string(),
            reason: format!("{:?}", e),
        })
    }

    fn element(&self, id: NodeId) -> Result<ElementRef<'_>, DomError> {
        self.html
            .tree
            .get(id)
            .and_then(ElementRef::wrap)
            .ok_or(DomError::DetachedNode)
    }

    /// 文档中第一个命中的元素
    pub fn query(&self, css: &str) -> Result<Option<NodeId>, DomError> {
        let selector = Self::selector(css)?;
        Ok(self.html.select(&selector).next().map(|e| e.id()))
    }

    /// 文档中所有命中的元素（文档顺序）
    pub fn query_all(&self, css: &str) -> Result<Vec<NodeId>, DomError> {
        let selector = Self::selector(css)?;
        Ok(self.html.select(&selector).map(|e| e.id()).collect())
    }

    /// `scope` 的后代中第一个命中的元素（不含 `scope` 自身）
    pub fn query_within(&self, scope: NodeId, css: &str) -> Result<Option<NodeId>, DomError> {
        Ok(self.query_all_within(scope, css)?.into_iter().next())
    }

    /// `scope` 的后代中所有命中的元素（不含 `scope` 自身）
    pub fn query_all_within(&self, scope: NodeId, css: &str) -> Result<Vec<NodeId>, DomError> {
        let selector = Self::selector(css)?;
        let element = self.element(scope)?;
        Ok(element
            .select(&selector)
            .map(|e| e.id())
            .filter(|id| *id != scope)
            .collect())
    }

    pub fn matches(&self, id: NodeId, css: &str) -> Result<bool, DomError> {
        let selector = Self::selector(css)?;
        Ok(selector.matches(&self.element(id)?))
    }

    /// 从自身开始向上查找第一个命中的祖先
    pub fn closest(&self, id: NodeId, css: &str) -> Result<Option<NodeId>, DomError> {
        let selector = Self::selector(css)?;
        let element = self.element(id)?;
        Ok(std::iter::once(element)
            .chain(element.ancestors().filter_map(ElementRef::wrap))
            .find(|e| selector.matches(e))
            .map(|e| e.id()))
    }

    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.element(id)
            .ok()?
            .parent()
            .and_then(ElementRef::wrap)
            .map(|p| p.id())
    }

    /// `ancestor` 是否是 `descendant` 的祖先（不含自身）
    pub fn contains(&self, ancestor: NodeId, descendant: NodeId) -> bool {
        self.html
            .tree
            .get(descendant)
            .map(|node| node.ancestors().any(|a| a.id() == ancestor))
            .unwrap_or(false)
    }

    pub fn element_by_id(&self, dom_id: &str) -> Option<NodeId> {
        self.query(&format!("[id={}]", quote_attr(dom_id)))
            .ok()
            .flatten()
    }

    pub fn tag(&self, id: NodeId) -> &str {
        self.element(id).map(|e| e.value().name()).unwrap_or("")
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).ok()?.value().attr(name)
    }

    /// 等价于 `textContent`
    pub fn text(&self, id: NodeId) -> String {
        self.element(id)
            .map(|e| e.text().collect::<String>())
            .unwrap_or_default()
    }

    /// 元素是否被隐藏（hidden / aria-hidden / display:none）
    pub fn is_hidden(&self, id: NodeId) -> bool {
        if self.attr(id, "hidden").is_some() || self.attr(id, "aria-hidden") == Some("true") {
            return true;
        }
        self.attr(id, "style")
            .map(|style| {
                style
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect::<String>()
                    .to_lowercase()
                    .contains("display:none")
            })
            .unwrap_or(false)
    }

    /// 由 `:nth-child` 组成的绝对路径定位器
    pub fn css_path(&self, id: NodeId) -> Locator {
        let mut segments = Vec::new();
        let mut current = self.element(id).ok();
        while let Some(element) = current {
            let name = element.value().name().to_string();
            let parent = element.parent().and_then(ElementRef::wrap);
            match parent {
                Some(parent_el) => {
                    let position = parent_el
                        .children()
                        .filter_map(ElementRef::wrap)
                        .position(|sibling| sibling.id() == element.id())
                        .map(|p| p + 1)
                        .unwrap_or(1);
                    segments.push(format!("{}:nth-child({})", name, position));
                }
                None => segments.push(name),
            }
            current = parent;
        }
        segments.reverse();
        Locator::new(segments.join(" > "))
    }

    // ========== 实时属性 ==========

    /// 等价于元素的 `.value` 属性
    pub fn value(&self, id: NodeId) -> String {
        match self.tag(id) {
            "select" => self
                .selected_option(id)
                .map(|opt| self.option_value(opt))
                .unwrap_or_default(),
            "textarea" => self
                .values
                .get(&id)
                .cloned()
                .unwrap_or_else(|| self.text(id)),
            _ => self
                .values
                .get(&id)
                .cloned()
                .or_else(|| self.attr(id, "value").map(str::to_string))
                .unwrap_or_default(),
        }
    }

    pub fn is_checked(&self, id: NodeId) -> bool {
        self.checked
            .get(&id)
            .copied()
            .unwrap_or_else(|| self.attr(id, "checked").is_some())
    }

    /// `<option selected>` 或 `[role="option"][aria-selected="true"]`
    pub fn is_selected(&self, id: NodeId) -> bool {
        if let Some(selected) = self.selected.get(&id) {
            return *selected;
        }
        if self.tag(id) == "option" {
            self.attr(id, "selected").is_some()
        } else {
            self.attr(id, "aria-selected") == Some("true")
        }
    }

    /// 原生 `<option>` 的值：没有 value 属性时取文本
    pub fn option_value(&self, option: NodeId) -> String {
        self.attr(option, "value")
            .map(str::to_string)
            .unwrap_or_else(|| self.text(option).trim().to_string())
    }

    pub fn select_options(&self, select: NodeId) -> Vec<NodeId> {
        self.query_all_within(select, "option").unwrap_or_default()
    }

    fn selected_option(&self, select: NodeId) -> Option<NodeId> {
        let options = self.select_options(select);
        let touched = options.iter().any(|o| self.selected.contains_key(o));
        let explicit = options.iter().copied().find(|o| self.is_selected(*o));
        if touched || explicit.is_some() {
            explicit
        } else {
            options.first().copied()
        }
    }

    // ========== 交互 ==========

    pub fn focus(&mut self, id: NodeId) {
        self.record(id, DomEvent::Focus);
    }

    /// 赋值，不派发任何事件
    pub fn set_value(&mut self, id: NodeId, value: &str) {
        if self.tag(id) == "select" {
            let options = self.select_options(id);
            let mut matched = false;
            for option in options {
                let hit = !matched && self.option_value(option) == value;
                matched |= hit;
                self.selected.insert(option, hit);
            }
            return;
        }
        self.values.insert(id, value.to_string());
    }

    pub fn dispatch(&mut self, id: NodeId, event: DomEvent) {
        self.record(id, event);
    }

    /// 模拟用户点击，包括浏览器的激活行为
    pub fn click(&mut self, id: NodeId) {
        self.record(id, DomEvent::Click);

        let tag = self.tag(id).to_string();
        let input_type = self
            .attr(id, "type")
            .map(|t| t.to_ascii_lowercase())
            .unwrap_or_default();

        if tag == "input" && input_type == "radio" {
            if !self.is_checked(id) {
                let group = self
                    .attr(id, "name")
                    .map(|name| format!("input[type=\"radio\"][name={}]", quote_attr(name)));
                if let Some(group) = group {
                    for other in self.query_all(&group).unwrap_or_default() {
                        if other != id {
                            self.checked.insert(other, false);
                        }
                    }
                }
                self.checked.insert(id, true);
                self.record(id, DomEvent::Input);
                self.record(id, DomEvent::Change);
            }
        } else if tag == "input" && input_type == "checkbox" {
            let now = !self.is_checked(id);
            self.checked.insert(id, now);
            self.record(id, DomEvent::Input);
            self.record(id, DomEvent::Change);
        } else if self.attr(id, "role") == Some("option") {
            if let Ok(Some(listbox)) = self.closest(id, "[role=\"listbox\"]") {
                for sibling in self
                    .query_all_within(listbox, "[role=\"option\"]")
                    .unwrap_or_default()
                {
                    self.selected.insert(sibling, false);
                }
            }
            self.selected.insert(id, true);
        } else if tag == "label" {
            let control = match self.attr(id, "for") {
                Some(target) => self.element_by_id(target),
                None => self
                    .query_within(id, "input, select, textarea")
                    .ok()
                    .flatten(),
            };
            if let Some(control) = control.filter(|c| *c != id) {
                self.click(control);
            }
        }
    }

    /// 对元素执行一个操作
    pub fn perform(&mut self, id: NodeId, action: &Action) {
        match action {
            Action::Focus => self.focus(id),
            Action::SetValue(value) => self.set_value(id, value),
            Action::Dispatch(event) => self.dispatch(id, *event),
            Action::Click => self.click(id),
        }
    }

    /// 按定位器重放一条交互；定位不到元素时返回 `false`
    pub fn apply(&mut self, interaction: &Interaction) -> Result<bool, DomError> {
        match self.query(interaction.locator.as_str())? {
            Some(id) => {
                self.perform(id, &interaction.action);
                Ok(true)
            }
            None => {
                debug!("重放时未找到元素: {}", interaction.locator);
                Ok(false)
            }
        }
    }

    fn record(&mut self, target: NodeId, event: DomEvent) {
        self.events.push(DispatchedEvent { target, event });
    }

    pub fn events(&self) -> &[DispatchedEvent] {
        &self.events
    }

    /// 某个元素上按顺序收到的事件
    pub fn events_for(&self, id: NodeId) -> Vec<DomEvent> {
        self.events
            .iter()
            .filter(|e| e.target == id)
            .map(|e| e.event)
            .collect()
    }

    // ========== 序列化 ==========

    /// 序列化为 HTML，实时属性会回写到对应的 attribute 上
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_node(self.html.tree.root(), &mut out);
        out
    }

    fn write_node(&self, node: NodeRef<'_, Node>, out: &mut String) {
        match node.value() {
            Node::Document | Node::Fragment => {
                for child in node.children() {
                    self.write_node(child, out);
                }
            }
            Node::Doctype(doctype) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(doctype.name());
                out.push('>');
            }
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            Node::Text(text) => {
                let raw = node
                    .parent()
                    .and_then(|p| p.value().as_element().map(|e| e.name()))
                    .is_some_and(|name| name == "script" || name == "style");
                if raw {
                    out.push_str(text);
                } else {
                    out.push_str(&escape_text(text));
                }
            }
            Node::Element(element) => {
                let id = node.id();
                let name = element.name();
                let attrs = self.live_attrs(id, element);

                out.push('<');
                out.push_str(name);
                for (key, value) in &attrs {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');

                if VOID_ELEMENTS.contains(&name) {
                    return;
                }
                match (name, self.values.get(&id)) {
                    ("textarea", Some(value)) => out.push_str(&escape_text(value)),
                    _ => {
                        for child in node.children() {
                            self.write_node(child, out);
                        }
                    }
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            _ => {}
        }
    }

    fn live_attrs(&self, id: NodeId, element: &scraper::node::Element) -> Vec<(String, String)> {
        let mut attrs: Vec<(String, String)> = element
            .attrs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let mut put = |key: &str, value: Option<String>| {
            attrs.retain(|(k, _)| k != key);
            if let Some(value) = value {
                attrs.push((key.to_string(), value));
            }
        };

        if element.name() == "input" {
            if let Some(value) = self.values.get(&id) {
                put("value", Some(value.clone()));
            }
            if let Some(checked) = self.checked.get(&id) {
                put("checked", checked.then(String::new));
            }
        }
        if let Some(selected) = self.selected.get(&id) {
            if element.name() == "option" {
                put("selected", selected.then(String::new));
            } else {
                put("aria-selected", Some(selected.to_string()));
            }
        }
        attrs
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
