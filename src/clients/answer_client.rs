/// 答案接口客户端
///
/// 把表单结构发给后端 `/fill-form`，取回答案表。
/// 超时与其他网络错误分开报告，便于调用方区分"接口慢"和"接口坏"。
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::config::{ApiCredentials, Config};
use crate::error::AnswerError;
use crate::models::{AnswerMap, FormSchema};

/// `/fill-form` 请求体
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FillFormRequest {
    /// 表单结构的 JSON 字符串
    pub schema_json: String,
    #[serde(flatten)]
    pub credentials: ApiCredentials,
}

/// `/fill-form` 响应体，只关心答案字段
#[derive(Debug, Deserialize)]
struct FillFormResponse {
    answers_json: JsonValue,
}

/// 答案接口客户端
pub struct AnswerClient {
    http: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
    credentials: ApiCredentials,
}

impl AnswerClient {
    /// 创建新的答案客户端
    pub fn new(config: &Config) -> Result<Self, AnswerError> {
        let endpoint = config.answer_api_base_url.clone();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.answer_timeout_secs))
            .build()
            .map_err(|source| AnswerError::RequestFailed { endpoint, source })?;
        Ok(Self {
            http,
            base_url: config.answer_api_base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.answer_timeout_secs,
            credentials: config.credentials.clone(),
        })
    }

    pub fn fill_form_endpoint(&self) -> String {
        format!("{}/fill-form", self.base_url)
    }

    /// 构建请求体
    pub fn build_request(&self, schema: &FormSchema) -> Result<FillFormRequest, AnswerError> {
        let schema_json =
            serde_json::to_string(schema).map_err(|source| AnswerError::JsonParseFailed { source })?;
        Ok(FillFormRequest {
            schema_json,
            credentials: self.credentials.clone(),
        })
    }

    /// 请求答案
    ///
    /// # 参数
    /// - `schema`: 当前表单结构
    ///
    /// # 返回
    /// 后端给出的答案表
    pub async fn fetch_answers(&self, schema: &FormSchema) -> Result<AnswerMap, AnswerError> {
        let endpoint = self.fill_form_endpoint();
        let body = self.build_request(schema)?;
        info!("🤖 正在请求答案: {} ({} 个字段)", endpoint, schema.len());

        let response = self
            .http
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnswerError::BadResponse {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        let payload: FillFormResponse = response
            .json()
            .await
            .map_err(|e| self.classify(&endpoint, e))?;
        let answers = parse_answers(payload.answers_json)?;
        info!("✓ 收到 {} 个答案", answers.len());
        Ok(answers)
    }

    /// 健康检查：`GET {base}/`
    pub async fn health(&self) -> Result<bool, AnswerError> {
        let endpoint = format!("{}/", self.base_url);
        let response = self
            .http
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| self.classify(&endpoint, e))?;
        debug!("健康检查 {}: {}", endpoint, response.status());
        Ok(response.status().is_success())
    }

    /// 请求答案前先做健康检查，不通过时返回 `AnswerError::Unavailable`
    pub async fn ensure_available(&self) -> Result<(), AnswerError> {
        match self.health().await {
            Ok(true) => Ok(()),
            Ok(false) | Err(AnswerError::RequestFailed { .. }) => Err(AnswerError::Unavailable {
                endpoint: format!("{}/", self.base_url),
            }),
            Err(e) => Err(e),
        }
    }

    fn classify(&self, endpoint: &str, error: reqwest::Error) -> AnswerError {
        if error.is_timeout() {
            AnswerError::Timeout {
                endpoint: endpoint.to_string(),
                timeout_secs: self.timeout_secs,
            }
        } else {
            AnswerError::RequestFailed {
                endpoint: endpoint.to_string(),
                source: error,
            }
        }
    }
}

/// `answers_json` 可能是 JSON 字符串，也可能直接是对象
pub fn parse_answers(raw: JsonValue) -> Result<AnswerMap, AnswerError> {
    let parsed = match raw {
        JsonValue::String(text) => AnswerMap::from_json_str(&text),
        other => serde_json::from_value(other),
    };
    parsed.map_err(|source| AnswerError::JsonParseFailed { source })
}
