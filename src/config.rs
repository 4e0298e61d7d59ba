use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, AppResult, ConfigError};

/// 配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "SMART_FILLER_CONFIG";
/// 默认配置文件
pub const DEFAULT_CONFIG_FILE: &str = "smart_filler.toml";

/// 后端答案接口需要的密钥，均为可选
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiCredentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groq_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinecone_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinecone_env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinecone_host: Option<String>,
}

/// 程序配置文件
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 目标表单 URL
    pub target_url: String,
    /// 设置后启动无头浏览器，而不是连接已打开的浏览器
    pub chrome_executable: Option<String>,
    /// 页面加载后的提取时间点（毫秒，从启动算起）
    pub retry_delays_ms: Vec<u64>,
    /// 字段数超过该值即停止后续定时提取
    pub sufficiency_threshold: usize,
    /// 结构变化后的静默等待时间（毫秒）
    pub mutation_debounce_ms: u64,
    /// 轮询页面变化缓冲区的间隔（毫秒）
    pub mutation_poll_ms: u64,
    /// 答案接口地址
    pub answer_api_base_url: String,
    /// 答案接口超时（秒）
    pub answer_timeout_secs: u64,
    pub credentials: ApiCredentials,
    /// 离线模式：本地 HTML 文件
    pub html_file: Option<String>,
    /// 离线模式：本地答案 JSON 文件（不设置时请求答案接口）
    pub answers_file: Option<String>,
    /// 离线模式：填写后的 HTML 输出路径
    pub output_file: Option<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 9222,
            target_url: "about:blank".to_string(),
            chrome_executable: None,
            retry_delays_ms: vec![1000, 3000, 5000],
            sufficiency_threshold: 3,
            mutation_debounce_ms: 2000,
            mutation_poll_ms: 500,
            answer_api_base_url: "http://localhost:8000".to_string(),
            answer_timeout_secs: 30,
            credentials: ApiCredentials::default(),
            html_file: None,
            answers_file: None,
            output_file: None,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
        }
    }
}

impl Config {
    /// 默认值 + 环境变量
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// 配置文件（如果存在）+ 环境变量
    ///
    /// 配置文件路径取 `SMART_FILLER_CONFIG`，未设置时为 `smart_filler.toml`
    pub fn load() -> AppResult<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let mut config = if Path::new(&path).exists() {
            Self::from_toml_file(&path)?
        } else {
            debug!("未找到配置文件 {}，使用默认配置", path);
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml_file(path: &str) -> AppResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| AppError::file_read_failed(path, e))?;
        Ok(Self::from_toml_str(path, &text)?)
    }

    pub fn from_toml_str(path: &str, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::TomlParseFailed {
            path: path.to_string(),
            source,
        })
    }

    /// 用环境变量覆盖配置
    ///
    /// # 参数
    /// - `lookup`: 变量名 → 值，测试时可以传入自定义表
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let string = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = string("BROWSER_DEBUG_PORT") {
            self.browser_debug_port = parse_var("BROWSER_DEBUG_PORT", &v, "u16")?;
        }
        if let Some(v) = string("TARGET_URL") {
            self.target_url = v;
        }
        if let Some(v) = string("CHROME_EXECUTABLE") {
            self.chrome_executable = Some(v);
        }
        if let Some(v) = string("RETRY_DELAYS_MS") {
            self.retry_delays_ms = v
                .split(',')
                .map(|part| parse_var("RETRY_DELAYS_MS", part.trim(), "逗号分隔的毫秒数"))
                .collect::<Result<Vec<u64>, _>>()?;
        }
        if let Some(v) = string("SUFFICIENCY_THRESHOLD") {
            self.sufficiency_threshold = parse_var("SUFFICIENCY_THRESHOLD", &v, "usize")?;
        }
        if let Some(v) = string("MUTATION_DEBOUNCE_MS") {
            self.mutation_debounce_ms = parse_var("MUTATION_DEBOUNCE_MS", &v, "u64")?;
        }
        if let Some(v) = string("MUTATION_POLL_MS") {
            self.mutation_poll_ms = parse_var("MUTATION_POLL_MS", &v, "u64")?;
        }
        if let Some(v) = string("ANSWER_API_BASE_URL") {
            self.answer_api_base_url = v;
        }
        if let Some(v) = string("ANSWER_TIMEOUT_SECS") {
            self.answer_timeout_secs = parse_var("ANSWER_TIMEOUT_SECS", &v, "u64")?;
        }
        if let Some(v) = string("GEMINI_KEY") {
            self.credentials.gemini_key = Some(v);
        }
        if let Some(v) = string("GROQ_KEY") {
            self.credentials.groq_key = Some(v);
        }
        if let Some(v) = string("PINECONE_KEY") {
            self.credentials.pinecone_key = Some(v);
        }
        if let Some(v) = string("PINECONE_ENV") {
            self.credentials.pinecone_env = Some(v);
        }
        if let Some(v) = string("PINECONE_HOST") {
            self.credentials.pinecone_host = Some(v);
        }
        if let Some(v) = string("FORM_HTML_FILE") {
            self.html_file = Some(v);
        }
        if let Some(v) = string("ANSWERS_FILE") {
            self.answers_file = Some(v);
        }
        if let Some(v) = string("OUTPUT_HTML_FILE") {
            self.output_file = Some(v);
        }
        if let Some(v) = string("VERBOSE_LOGGING") {
            self.verbose_logging = parse_var("VERBOSE_LOGGING", &v, "bool")?;
        }
        if let Some(v) = string("OUTPUT_LOG_FILE") {
            self.output_log_file = v;
        }
        Ok(())
    }

    /// 是否为离线模式（读取本地 HTML，不连接浏览器）
    pub fn is_offline(&self) -> bool {
        self.html_file.is_some()
    }
}

fn parse_var<T: FromStr>(var_name: &str, value: &str, expected_type: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::EnvVarParseFailed {
        var_name: var_name.to_string(),
        value: value.to_string(),
        expected_type: expected_type.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.retry_delays_ms, vec![1000, 3000, 5000]);
        assert_eq!(config.sufficiency_threshold, 3);
        assert_eq!(config.mutation_debounce_ms, 2000);
        assert_eq!(config.answer_timeout_secs, 30);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("RETRY_DELAYS_MS", "500, 1500"),
                ("GROQ_KEY", "k"),
                ("VERBOSE_LOGGING", "true"),
                ("TARGET_URL", ""),
            ]))
            .unwrap();
        assert_eq!(config.retry_delays_ms, vec![500, 1500]);
        assert_eq!(config.credentials.groq_key.as_deref(), Some("k"));
        assert!(config.verbose_logging);
        assert_eq!(config.target_url, "about:blank");
    }

    #[test]
    fn test_env_parse_error() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("BROWSER_DEBUG_PORT", "abc")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EnvVarParseFailed { ref var_name, .. } if var_name == "BROWSER_DEBUG_PORT"
        ));
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml_str(
            "inline",
            r#"
                target_url = "https://docs.google.com/forms/d/e/x/viewform"
                sufficiency_threshold = 5

                [credentials]
                gemini_key = "abc"
            "#,
        )
        .unwrap();
        assert_eq!(config.sufficiency_threshold, 5);
        assert_eq!(config.credentials.gemini_key.as_deref(), Some("abc"));
        assert_eq!(config.mutation_debounce_ms, 2000);
    }
}
