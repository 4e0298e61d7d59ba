/// 答案填写服务
///
/// 在快照文档上执行填写，同时把每一步操作记录为可重放的交互日志，
/// 实时页面再按日志重放同样的操作。
use tracing::{debug, info, warn};

use crate::dom::{Action, Document, DomEvent, Interaction, Locator, NodeId};
use crate::error::FillError;
use crate::models::{
    AnswerMap, AnswerValue, FailureReason, FieldDescriptor, FieldKind, FieldOutcome, FieldStatus,
    FillReport, FillResult, FormSchema, OptionDescriptor,
};
use crate::providers::strategies::OPTION_LABEL_DEPTH;
use crate::services::answer_matcher::{match_field, match_option, FieldMatch};
use crate::services::schema_extractor::normalize_text;

const LISTBOX: &str = r#"[role="listbox"]"#;

type FieldResult = Result<(), FailureReason>;

/// 答案填写服务
pub struct FillExecutor<'d> {
    doc: &'d mut Document,
    listbox_options: &'static str,
    interactions: Vec<Interaction>,
}

impl<'d> FillExecutor<'d> {
    pub fn new(doc: &'d mut Document) -> Self {
        Self {
            doc,
            listbox_options: r#"[role="option"]"#,
            interactions: Vec::new(),
        }
    }

    /// 按表单结构把答案写入文档
    ///
    /// # 参数
    /// - `schema`: 本次使用的表单结构
    /// - `answers`: 调用方提供的答案表，只在本次调用中借用
    ///
    /// # 返回
    /// 填写报告；只有表单结构为空时才返回错误，单个字段失败只计数
    pub fn fill(mut self, schema: &FormSchema, answers: &AnswerMap) -> Result<FillReport, FillError> {
        if schema.is_empty() {
            return Err(FillError::NoSchema);
        }
        self.listbox_options = schema.provider().provider().strategies().listbox_options;

        for (entry, _) in answers.entries() {
            if schema.field(entry).is_none() {
                debug!("答案 {} 没有对应字段，跳过", entry);
            }
        }

        let mut result = FillResult::default();
        let mut outcomes = Vec::new();
        for field in schema {
            let Some(answer) = answers.get(&field.entry) else {
                continue;
            };
            let status = match self.fill_field(field, answer) {
                Ok(()) => {
                    debug!("✓ {} ({})", field.label, field.entry);
                    FieldStatus::Filled
                }
                Err(reason) => {
                    warn!("⚠️ 字段填写失败 {} ({}): {:?}", field.label, field.entry, reason);
                    FieldStatus::Failed(reason)
                }
            };
            result.record(status == FieldStatus::Filled);
            outcomes.push(FieldOutcome {
                entry: field.entry.clone(),
                label: field.label.clone(),
                status,
            });
        }

        info!(
            "📝 填写完成: 成功 {} / 失败 {} / 共 {}",
            result.filled, result.failed, result.attempted
        );
        Ok(FillReport {
            result,
            outcomes,
            interactions: self.interactions,
        })
    }

    fn fill_field(&mut self, field: &FieldDescriptor, answer: &AnswerValue) -> FieldResult {
        match field.kind {
            FieldKind::Dropdown => return self.fill_dropdown(field, answer),
            FieldKind::Text | FieldKind::Radio | FieldKind::Checkbox => {}
        }
        match match_field(field, answer) {
            FieldMatch::Text(value) => self.fill_text(field, &value),
            FieldMatch::Single(hit) => {
                let hit = hit.ok_or(FailureReason::NoMatchingOption)?;
                self.activate_choice(hit.option)
            }
            FieldMatch::Multiple(hits) => {
                let mut matched_any = false;
                let mut resolved_any = false;
                for (value, hit) in hits {
                    let Some(hit) = hit else {
                        debug!("多选值 {:?} 没有匹配的选项", value);
                        continue;
                    };
                    matched_any = true;
                    resolved_any |= self.activate_choice(hit.option).is_ok();
                }
                match (resolved_any, matched_any) {
                    (true, _) => Ok(()),
                    (false, true) => Err(FailureReason::OptionNotFound),
                    (false, false) => Err(FailureReason::NoMatchingOption),
                }
            }
        }
    }

    fn resolve(&self, locator: &Locator) -> Option<NodeId> {
        self.doc.query(locator.as_str()).ok().flatten()
    }

    fn act(&mut self, id: NodeId, locator: &Locator, action: Action) {
        self.doc.perform(id, &action);
        self.interactions.push(Interaction {
            locator: locator.clone(),
            action,
        });
    }

    // ========== 文本 ==========

    fn fill_text(&mut self, field: &FieldDescriptor, value: &str) -> FieldResult {
        let input = self
            .resolve(&field.locator)
            .ok_or(FailureReason::ElementNotFound)?;
        let locator = &field.locator;
        self.act(input, locator, Action::Focus);
        self.act(input, locator, Action::SetValue(value.to_string()));
        for event in [DomEvent::Input, DomEvent::Change, DomEvent::Blur] {
            self.act(input, locator, Action::Dispatch(event));
        }
        Ok(())
    }

    // ========== 单选 / 多选 ==========

    /// 选中一个选项；已选中的选项不再点击，避免多选被取消
    fn activate_choice(&mut self, option: &OptionDescriptor) -> FieldResult {
        let control = self
            .resolve(&option.locator)
            .ok_or(FailureReason::OptionNotFound)?;
        if self.doc.is_checked(control) {
            debug!("选项 {} 已选中", option.value);
            return Ok(());
        }
        self.act(control, &option.locator, Action::Focus);
        self.act(control, &option.locator, Action::Click);
        Ok(())
    }

    // ========== 下拉 ==========

    fn fill_dropdown(&mut self, field: &FieldDescriptor, answer: &AnswerValue) -> FieldResult {
        let element = self
            .resolve(&field.locator)
            .ok_or(FailureReason::ElementNotFound)?;
        let wanted = answer.first().ok_or(FailureReason::NoMatchingOption)?;

        if self.doc.tag(element) == "select" {
            if let Some(value) = self.native_match(element, wanted) {
                let locator = &field.locator;
                self.act(element, locator, Action::SetValue(value));
                self.act(element, locator, Action::Focus);
                self.act(element, locator, Action::Dispatch(DomEvent::Change));
                return Ok(());
            }
            debug!("原生下拉框 {} 没有匹配项，尝试列表框", field.entry);
        }

        let listbox = self
            .nearest_listbox(element)
            .ok_or(FailureReason::NoMatchingOption)?;
        self.activate_listbox_option(listbox, wanted)
    }

    /// 在原生 `<option>` 中匹配，返回要设置的值
    fn native_match(&self, select: NodeId, wanted: &str) -> Option<String> {
        let options: Vec<OptionDescriptor> = self
            .doc
            .select_options(select)
            .into_iter()
            .map(|option| {
                let value = self.doc.option_value(option);
                let text = normalize_text(&self.doc.text(option));
                OptionDescriptor {
                    display_text: if text.is_empty() { value.clone() } else { text },
                    value,
                    locator: self.doc.css_path(option),
                }
            })
            .filter(|option| !option.value.trim().is_empty())
            .collect();
        match_option(&options, wanted).map(|hit| hit.option.value.clone())
    }

    /// 字段自身的列表框，或向上 3 层内的列表框
    fn nearest_listbox(&self, element: NodeId) -> Option<NodeId> {
        if self.doc.matches(element, LISTBOX).unwrap_or(false) {
            return Some(element);
        }
        let mut current = self.doc.parent_element(element);
        for _ in 0..OPTION_LABEL_DEPTH {
            let node = current?;
            if let Some(listbox) = self.doc.query_within(node, LISTBOX).ok().flatten() {
                return Some(listbox);
            }
            current = self.doc.parent_element(node);
        }
        None
    }

    /// 先点开列表框，再点击匹配的可见选项
    fn activate_listbox_option(&mut self, listbox: NodeId, wanted: &str) -> FieldResult {
        let candidates: Vec<(NodeId, OptionDescriptor)> = self
            .doc
            .query_all_within(listbox, self.listbox_options)
            .unwrap_or_default()
            .into_iter()
            .filter(|option| !self.doc.is_hidden(*option))
            .map(|option| {
                let text = normalize_text(&self.doc.text(option));
                let value = self
                    .doc
                    .attr(option, "data-value")
                    .map(str::to_string)
                    .unwrap_or_else(|| text.clone());
                let descriptor = OptionDescriptor {
                    display_text: if text.is_empty() { value.clone() } else { text },
                    value,
                    locator: self.doc.css_path(option),
                };
                (option, descriptor)
            })
            .collect();

        let descriptors: Vec<OptionDescriptor> =
            candidates.iter().map(|(_, d)| d.clone()).collect();
        let hit = match_option(&descriptors, wanted).ok_or(FailureReason::NoMatchingOption)?;
        let (option, descriptor) = &candidates[hit.index];
        let (option, option_locator) = (*option, descriptor.locator.clone());

        if self.doc.is_selected(option) {
            debug!("列表框选项 {} 已选中", descriptor.value);
            return Ok(());
        }
        let listbox_locator = match self.doc.attr(listbox, "id") {
            Some(id) if !id.trim().is_empty() => Locator::by_id(id),
            _ => self.doc.css_path(listbox),
        };
        self.act(listbox, &listbox_locator, Action::Click);
        self.act(option, &option_locator, Action::Click);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderKind;
    use crate::services::schema_extractor::SchemaExtractor;

    const FORM: &str = r#"
        <form>
          <div role="listitem">
            <div role="heading">Full Name</div>
            <input type="text" name="entry.123">
          </div>
          <div role="listitem">
            <div role="heading">Favourite colour</div>
            <label><input type="radio" name="entry.9" value="red">Red</label>
            <label><input type="radio" name="entry.9" value="blue">Blue</label>
          </div>
          <div role="listitem">
            <div role="heading">Toppings</div>
            <label><input type="checkbox" name="entry.4" value="ham" checked>Ham</label>
            <label><input type="checkbox" name="entry.4" value="olive">Olive</label>
            <label><input type="checkbox" name="entry.4" value="onion">Onion</label>
          </div>
          <div role="listitem">
            <div role="heading">Size</div>
            <select name="entry.5">
              <option value="">Choose</option>
              <option value="s">Small</option>
              <option value="l">Large</option>
            </select>
          </div>
        </form>"#;

    fn extract(doc: &Document) -> FormSchema {
        SchemaExtractor::new(ProviderKind::Google.provider()).extract(doc)
    }

    fn checked_values(doc: &Document, name: &str) -> Vec<String> {
        doc.query_all(&format!("[name={}]", crate::dom::quote_attr(name)))
            .unwrap()
            .into_iter()
            .filter(|id| doc.is_checked(*id))
            .filter_map(|id| doc.attr(id, "value").map(str::to_string))
            .collect()
    }

    #[test]
    fn test_text_fill_sets_value_and_events() {
        let mut doc = Document::parse(FORM);
        let schema = extract(&doc);
        let answers: AnswerMap = [("entry.123", "Jane Doe")].into_iter().collect();

        let report = FillExecutor::new(&mut doc).fill(&schema, &answers).unwrap();

        assert_eq!(report.result, FillResult { filled: 1, failed: 0, attempted: 1 });
        let input = doc.query(r#"[name="entry.123"]"#).unwrap().unwrap();
        assert_eq!(doc.value(input), "Jane Doe");
        assert_eq!(
            doc.events_for(input),
            vec![DomEvent::Focus, DomEvent::Input, DomEvent::Change, DomEvent::Blur]
        );
    }

    #[test]
    fn test_radio_refill_keeps_single_selection() {
        let mut doc = Document::parse(FORM);
        let schema = extract(&doc);
        let answers: AnswerMap = [("entry.9", "blue")].into_iter().collect();

        FillExecutor::new(&mut doc).fill(&schema, &answers).unwrap();
        let second = FillExecutor::new(&mut doc).fill(&schema, &answers).unwrap();

        assert_eq!(checked_values(&doc, "entry.9"), vec!["blue"]);
        assert_eq!(second.result.filled, 1);
        assert!(second.interactions.is_empty());
    }

    #[test]
    fn test_checkbox_never_deselects() {
        let mut doc = Document::parse(FORM);
        let schema = extract(&doc);
        let mut answers = AnswerMap::new();
        answers.insert("entry.4", vec!["Ham", "olive"]);

        FillExecutor::new(&mut doc).fill(&schema, &answers).unwrap();
        FillExecutor::new(&mut doc).fill(&schema, &answers).unwrap();

        assert_eq!(checked_values(&doc, "entry.4"), vec!["ham", "olive"]);
    }

    #[test]
    fn test_checkbox_partial_match_counts_as_filled() {
        let mut doc = Document::parse(FORM);
        let schema = extract(&doc);
        let mut answers = AnswerMap::new();
        answers.insert("entry.4", vec!["onion", "pineapple"]);

        let report = FillExecutor::new(&mut doc).fill(&schema, &answers).unwrap();
        assert_eq!(report.result.filled, 1);
        assert_eq!(checked_values(&doc, "entry.4"), vec!["ham", "onion"]);
    }

    #[test]
    fn test_native_select_by_display_text() {
        let mut doc = Document::parse(FORM);
        let schema = extract(&doc);
        let answers: AnswerMap = [("entry.5", "large")].into_iter().collect();

        let report = FillExecutor::new(&mut doc).fill(&schema, &answers).unwrap();

        let select = doc.query("select").unwrap().unwrap();
        assert_eq!(report.result.filled, 1);
        assert_eq!(doc.value(select), "l");
        assert_eq!(doc.events_for(select), vec![DomEvent::Focus, DomEvent::Change]);
    }

    #[test]
    fn test_select_falls_back_to_nearby_listbox() {
        let mut doc = Document::parse(
            r#"<form><div role="listitem">
                 <div role="heading">Country</div>
                 <div class="wrap">
                   <select name="entry.8"><option value="x">Placeholder</option></select>
                 </div>
                 <div role="listbox" id="countries">
                   <div role="option" data-value="fr">France</div>
                   <div role="option" data-value="de" style="display: none">Germany</div>
                   <div role="option" data-value="de2">Germany</div>
                 </div>
               </div></form>"#,
        );
        let schema = extract(&doc);
        let answers: AnswerMap = [("entry.8", "Germany")].into_iter().collect();

        let report = FillExecutor::new(&mut doc).fill(&schema, &answers).unwrap();

        assert_eq!(report.result.filled, 1);
        let picked = doc.query(r#"[data-value="de2"]"#).unwrap().unwrap();
        let hidden = doc.query(r#"[data-value="de"]"#).unwrap().unwrap();
        assert!(doc.is_selected(picked));
        assert!(!doc.is_selected(hidden));
        assert_eq!(report.interactions.len(), 2);
        assert_eq!(report.interactions[0].locator, Locator::by_id("countries"));
    }

    #[test]
    fn test_failures_and_skips() {
        let mut doc = Document::parse(FORM);
        let schema = extract(&doc);
        let mut answers = AnswerMap::new();
        answers.insert("entry.9", "green");
        answers.insert("entry.5", "");
        answers.insert("entry.unknown", "ignored");

        let report = FillExecutor::new(&mut doc).fill(&schema, &answers).unwrap();

        assert_eq!(report.result, FillResult { filled: 0, failed: 2, attempted: 2 });
        assert!(report
            .outcomes
            .iter()
            .all(|o| o.status == FieldStatus::Failed(FailureReason::NoMatchingOption)));
    }

    #[test]
    fn test_missing_element_is_field_failure() {
        let doc = Document::parse(FORM);
        let schema = extract(&doc);
        let mut other = Document::parse("<form></form>");
        let answers: AnswerMap = [("entry.123", "x")].into_iter().collect();

        let report = FillExecutor::new(&mut other).fill(&schema, &answers).unwrap();
        assert_eq!(
            report.outcomes[0].status,
            FieldStatus::Failed(FailureReason::ElementNotFound)
        );
    }

    #[test]
    fn test_empty_schema_is_error() {
        let mut doc = Document::parse("<div></div>");
        let result = FillExecutor::new(&mut doc).fill(
            &FormSchema::empty(ProviderKind::Generic),
            &AnswerMap::new(),
        );
        assert!(matches!(result, Err(FillError::NoSchema)));
    }

    #[test]
    fn test_journal_replays_onto_fresh_copy() {
        let mut doc = Document::parse(FORM);
        let schema = extract(&doc);
        let mut answers = AnswerMap::new();
        answers.insert("entry.123", "Jane Doe");
        answers.insert("entry.9", "Blue");
        answers.insert("entry.5", "s");

        let report = FillExecutor::new(&mut doc).fill(&schema, &answers).unwrap();

        let mut replica = Document::parse(FORM);
        for interaction in &report.interactions {
            assert!(replica.apply(interaction).unwrap());
        }
        assert_eq!(replica.to_html(), doc.to_html());
    }
}
