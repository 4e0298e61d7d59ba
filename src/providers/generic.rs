//! 普通网页表单
//!
//! 通用块选择器（`p`、`li`、`.field` …）经常互相嵌套，
//! 这里按"块内包含哪些控件"来挑出真正对应一个问题的那一层。

use std::collections::BTreeSet;

use crate::dom::{Document, NodeId};
use crate::providers::strategies::{LocatorStrategies, GENERIC};
use crate::providers::{query_blocks, FormProvider, ProviderKind};

const CONTROLS: &str = r#"input[name], select[name], textarea[name], [role="listbox"]"#;

pub struct GenericProvider;

impl FormProvider for GenericProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Generic
    }

    fn strategies(&self) -> &'static LocatorStrategies {
        &GENERIC
    }

    fn find_blocks(&self, doc: &Document) -> Vec<NodeId> {
        let forms = doc.query_all("form").unwrap_or_default();
        let candidates: Vec<NodeId> = forms
            .into_iter()
            .flat_map(|form| query_blocks(doc, Some(form), self.strategies()))
            .collect();

        candidates
            .iter()
            .copied()
            .filter(|block| keep_block(doc, *block, &candidates))
            .collect()
    }
}

/// 块内控件的分组键：name，没有 name 的 listbox 用 id
fn control_keys(doc: &Document, block: NodeId) -> Vec<String> {
    doc.query_all_within(block, CONTROLS)
        .unwrap_or_default()
        .into_iter()
        .map(|control| {
            doc.attr(control, "name")
                .or_else(|| doc.attr(control, "id"))
                .map(str::to_string)
                .unwrap_or_else(|| format!("{:?}", control))
        })
        .collect()
}

/// 保留规则：
/// - 没有控件的块丢弃；
/// - 没有嵌套候选块的块保留；
/// - 包含多个问题的外层块丢弃，交给内层块；
/// - 只含一组同名控件的块，若某个内层块已包含全部控件则丢弃，否则保留（单选组被拆散在多个 `p` 里的情况）。
fn keep_block(doc: &Document, block: NodeId, candidates: &[NodeId]) -> bool {
    let keys = control_keys(doc, block);
    if keys.is_empty() {
        return false;
    }
    let nested: Vec<NodeId> = candidates
        .iter()
        .copied()
        .filter(|other| *other != block && doc.contains(block, *other))
        .collect();
    if nested.is_empty() {
        return true;
    }

    let distinct: BTreeSet<&String> = keys.iter().collect();
    if distinct.len() > 1 {
        return false;
    }
    !nested
        .iter()
        .any(|inner| control_keys(doc, *inner).len() == keys.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_ids(doc: &Document) -> Vec<String> {
        GenericProvider
            .find_blocks(doc)
            .into_iter()
            .map(|b| doc.attr(b, "id").unwrap_or("?").to_string())
            .collect()
    }

    #[test]
    fn test_no_form_is_empty() {
        let doc = Document::parse(r#"<div class="field"><input name="a"></div>"#);
        assert!(GenericProvider.find_blocks(&doc).is_empty());
    }

    #[test]
    fn test_innermost_question_blocks() {
        let doc = Document::parse(
            r#"<form>
                 <fieldset id="outer">
                   <div class="field" id="name"><label>Name</label><input name="name"></div>
                   <div class="field" id="mail"><label>Email</label><input type="email" name="mail"></div>
                 </fieldset>
               </form>"#,
        );
        assert_eq!(block_ids(&doc), vec!["name", "mail"]);
    }

    #[test]
    fn test_split_radio_group_keeps_outer_block() {
        let doc = Document::parse(
            r#"<form>
                 <fieldset id="color">
                   <legend>Color</legend>
                   <p id="p1"><label><input type="radio" name="color" value="red">Red</label></p>
                   <p id="p2"><label><input type="radio" name="color" value="blue">Blue</label></p>
                 </fieldset>
               </form>"#,
        );
        let ids = block_ids(&doc);
        assert_eq!(ids.first().map(String::as_str), Some("color"));
    }

    #[test]
    fn test_wrapper_around_single_control_is_dropped() {
        let doc = Document::parse(
            r#"<form>
                 <li id="outer"><p id="inner"><input name="city"></p></li>
               </form>"#,
        );
        assert_eq!(block_ids(&doc), vec!["inner"]);
    }
}
