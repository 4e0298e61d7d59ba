//! 表单站点适配层
//!
//! 不同站点（Google Forms / Microsoft Forms / 普通网页）只在"怎样找到问题块"
//! 和"用哪组定位策略"上有区别，后续的分类、匹配、填写全部共用。

pub mod generic;
pub mod google;
pub mod microsoft;
pub mod strategies;

use phf::phf_map;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dom::{Document, NodeId};

pub use generic::GenericProvider;
pub use google::GoogleFormsProvider;
pub use microsoft::MicrosoftFormsProvider;
pub use strategies::LocatorStrategies;

/// 站点类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Google,
    Microsoft,
    #[default]
    Generic,
}

static HOST_PROVIDERS: phf::Map<&'static str, ProviderKind> = phf_map! {
    "docs.google.com" => ProviderKind::Google,
    "forms.office.com" => ProviderKind::Microsoft,
    "forms.microsoft.com" => ProviderKind::Microsoft,
};

impl ProviderKind {
    /// 根据页面 URL 选择站点类型，无法识别时使用通用适配
    pub fn detect(url: Option<&str>) -> Self {
        let Some(parsed) = url.and_then(|u| reqwest::Url::parse(u).ok()) else {
            return ProviderKind::Generic;
        };
        let kind = parsed
            .host_str()
            .and_then(|host| HOST_PROVIDERS.get(host).copied())
            .unwrap_or(ProviderKind::Generic);

        // docs.google.com 上只有 /forms 路径才是表单
        if kind == ProviderKind::Google && !parsed.path().contains("/forms") {
            return ProviderKind::Generic;
        }
        kind
    }

    pub fn provider(self) -> &'static dyn FormProvider {
        static GOOGLE: GoogleFormsProvider = GoogleFormsProvider;
        static MICROSOFT: MicrosoftFormsProvider = MicrosoftFormsProvider;
        static GENERIC: GenericProvider = GenericProvider;

        match self {
            ProviderKind::Google => &GOOGLE,
            ProviderKind::Microsoft => &MICROSOFT,
            ProviderKind::Generic => &GENERIC,
        }
    }
}

/// 站点适配器
///
/// `find_blocks` 永远不会失败：没有表单是正常情况，返回空列表即可。
pub trait FormProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn strategies(&self) -> &'static LocatorStrategies;

    /// 按文档顺序返回问题块
    fn find_blocks(&self, doc: &Document) -> Vec<NodeId> {
        let Some(container) = find_container(doc, self.strategies()) else {
            debug!("未找到表单容器 ({:?})", self.kind());
            return Vec::new();
        };
        query_blocks(doc, Some(container), self.strategies())
    }
}

/// 按优先级查找第一个存在的表单容器
pub(crate) fn find_container(doc: &Document, strategies: &LocatorStrategies) -> Option<NodeId> {
    strategies
        .containers
        .iter()
        .find_map(|css| doc.query(css).ok().flatten())
}

/// 在容器（或整个文档）内查询问题块，所有块选择器合并后按文档顺序返回
pub(crate) fn query_blocks(
    doc: &Document,
    scope: Option<NodeId>,
    strategies: &LocatorStrategies,
) -> Vec<NodeId> {
    let css = strategies.blocks.join(", ");
    let result = match scope {
        Some(scope) => doc.query_all_within(scope, &css),
        None => doc.query_all(&css),
    };
    result.unwrap_or_else(|e| {
        warn!("⚠️ 问题块选择器无效: {}", e);
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_host() {
        assert_eq!(
            ProviderKind::detect(Some("https://docs.google.com/forms/d/e/abc/viewform")),
            ProviderKind::Google
        );
        assert_eq!(
            ProviderKind::detect(Some("https://docs.google.com/document/d/abc")),
            ProviderKind::Generic
        );
        assert_eq!(
            ProviderKind::detect(Some("https://forms.office.com/Pages/ResponsePage.aspx?id=1")),
            ProviderKind::Microsoft
        );
        assert_eq!(
            ProviderKind::detect(Some("https://example.com/signup")),
            ProviderKind::Generic
        );
        assert_eq!(ProviderKind::detect(None), ProviderKind::Generic);
        assert_eq!(ProviderKind::detect(Some("not a url")), ProviderKind::Generic);
    }

    #[test]
    fn test_provider_kind_round_trip() {
        for kind in [
            ProviderKind::Google,
            ProviderKind::Microsoft,
            ProviderKind::Generic,
        ] {
            assert_eq!(kind.provider().kind(), kind);
        }
    }
}
