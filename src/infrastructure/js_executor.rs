//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"执行 JS"的能力

use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{AppResult, BrowserError};

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() 能力
/// - 不认识表单结构，也不处理填写流程
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于导航等其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    ///
    /// 返回 Promise 的脚本会等待其完成
    pub async fn eval(&self, js_code: impl Into<String>) -> AppResult<JsonValue> {
        let js_code = js_code.into();
        debug!("执行脚本 ({} 字节)", js_code.len());
        let result = self.page.evaluate(js_code).await.map_err(|e| {
            BrowserError::ScriptExecutionFailed {
                source: Box::new(e),
            }
        })?;
        let value = result.into_value().map_err(|e| BrowserError::UnexpectedScriptResult {
            context: "into_value".to_string(),
            source: e,
        })?;
        Ok(value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    ///
    /// # 参数
    /// - `context`: 出错时写入错误信息，便于定位是哪段脚本
    /// - `js_code`: 要执行的 JavaScript 代码
    pub async fn eval_as<T: DeserializeOwned>(
        &self,
        context: &str,
        js_code: impl Into<String>,
    ) -> AppResult<T> {
        let value = self.eval(js_code).await?;
        serde_json::from_value(value).map_err(|e| {
            BrowserError::UnexpectedScriptResult {
                context: context.to_string(),
                source: e,
            }
            .into()
        })
    }
}
