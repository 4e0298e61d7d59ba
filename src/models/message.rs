//! 与调用方之间的消息

use serde::{Deserialize, Serialize};

use crate::models::answers::AnswerMap;
use crate::models::fill::FillResult;
use crate::models::schema::FormSchema;

/// 调用方发来的请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    GetSchema,
    FillAnswers { answers: AnswerMap },
    FillError { error: String },
}

/// 对请求的应答
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Response {
    Schema { schema: FormSchema },
    FillResult(FillResult),
    Ack,
    Error { message: String },
}

/// 提示级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// 仅用于展示的提示，不会修改页面
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// 触发提取的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractTrigger {
    /// 页面加载后的第 n 次定时尝试（从 1 开始）
    Initial { attempt: usize },
    /// DOM 结构变化
    Mutation,
    /// 调用方主动请求
    Request,
    /// 填写前的刷新
    Fill,
}

/// 主动推送给调用方的事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outbound {
    SchemaUpdate {
        schema: FormSchema,
        trigger: ExtractTrigger,
    },
    Notice(Notice),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request: Request = serde_json::from_str(
            r#"{"type": "FILL_ANSWERS", "answers": {"entry.1": "Jane"}}"#,
        )
        .unwrap();
        match request {
            Request::FillAnswers { answers } => assert_eq!(answers.len(), 1),
            other => panic!("unexpected request: {:?}", other),
        }

        let request: Request = serde_json::from_str(r#"{"type": "GET_SCHEMA"}"#).unwrap();
        assert!(matches!(request, Request::GetSchema));
    }

    #[test]
    fn test_fill_result_response_is_flat() {
        let response = Response::FillResult(FillResult {
            filled: 1,
            failed: 0,
            attempted: 1,
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "FILL_RESULT");
        assert_eq!(json["filled"], 1);
    }
}
