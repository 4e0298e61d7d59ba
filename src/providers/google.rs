use crate::dom::{Document, NodeId};
use crate::providers::strategies::{LocatorStrategies, GOOGLE_FORMS};
use crate::providers::{find_container, query_blocks, FormProvider, ProviderKind};

/// Google Forms
///
/// 容器只用来判断页面上是否存在表单，问题块在整个文档范围内查找：
/// 部分问题块会被渲染到 `form` 之外。
pub struct GoogleFormsProvider;

impl FormProvider for GoogleFormsProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn strategies(&self) -> &'static LocatorStrategies {
        &GOOGLE_FORMS
    }

    fn find_blocks(&self, doc: &Document) -> Vec<NodeId> {
        if find_container(doc, self.strategies()).is_none() {
            return Vec::new();
        }
        query_blocks(doc, None, self.strategies())
    }
}
