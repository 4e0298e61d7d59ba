use tokio::sync::Mutex;
use tracing::debug;

use crate::dom::{Document, Interaction};
use crate::error::AppResult;
use crate::infrastructure::document_source::{DocumentSource, PageSnapshot};

/// 内存页面：HTML 字符串即页面状态
///
/// 用于离线模式和测试。每次重放后把实时属性回写进 HTML，
/// 下一次快照能看到上一次填写的结果。
pub struct MemoryPage {
    url: Option<String>,
    html: Mutex<String>,
}

impl MemoryPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            url: None,
            html: Mutex::new(html.into()),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// 当前 HTML
    pub async fn html(&self) -> String {
        self.html.lock().await.clone()
    }

    /// 整体替换页面内容（模拟页面脚本重新渲染）
    pub async fn set_html(&self, html: impl Into<String>) {
        *self.html.lock().await = html.into();
    }

    /// 当前页面解析后的文档
    pub async fn document(&self) -> Document {
        let html = self.html().await;
        PageSnapshot::new(self.url.clone(), html).document()
    }
}

impl DocumentSource for MemoryPage {
    async fn snapshot(&self) -> AppResult<PageSnapshot> {
        Ok(PageSnapshot::new(self.url.clone(), self.html().await))
    }

    async fn apply(&self, interactions: &[Interaction]) -> AppResult<usize> {
        let mut html = self.html.lock().await;
        let mut doc = Document::parse(&html);
        let mut applied = 0;
        for interaction in interactions {
            if doc.apply(interaction)? {
                applied += 1;
            }
        }
        *html = doc.to_html();
        debug!("内存页面已重放 {}/{} 条交互", applied, interactions.len());
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Action, Locator};

    #[tokio::test]
    async fn test_apply_persists_into_next_snapshot() {
        let page = MemoryPage::new(r#"<form><input type="text" name="q"></form>"#);
        let applied = page
            .apply(&[
                Interaction {
                    locator: Locator::by_name("q"),
                    action: Action::SetValue("hello".into()),
                },
                Interaction {
                    locator: Locator::by_name("missing"),
                    action: Action::Click,
                },
            ])
            .await
            .unwrap();
        assert_eq!(applied, 1);

        let doc = page.snapshot().await.unwrap().document();
        let input = doc.query(r#"[name="q"]"#).unwrap().unwrap();
        assert_eq!(doc.value(input), "hello");
    }
}
