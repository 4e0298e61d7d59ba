use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 文档 / 选择器错误
    #[error("文档错误: {0}")]
    Dom(#[from] DomError),
    /// 填写错误
    #[error("填写错误: {0}")]
    Fill(#[from] FillError),
    /// 答案接口错误
    #[error("答案接口错误: {0}")]
    Answer(#[from] AnswerError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 创建页面失败
    #[error("创建页面失败: {source}")]
    PageCreationFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    ScriptExecutionFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 脚本返回了无法识别的结果
    #[error("脚本返回结果无法解析 ({context}): {source}")]
    UnexpectedScriptResult {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 文档 / 选择器错误
#[derive(Debug, Error)]
pub enum DomError {
    /// 选择器无法解析
    #[error("无效的选择器 `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },
    /// 节点句柄已不属于当前文档
    #[error("节点已不在文档中")]
    DetachedNode,
}

/// 填写错误（只有整体层面的错误，单个字段失败不会走到这里）
#[derive(Debug, Error)]
pub enum FillError {
    /// 页面上没有任何可定位的表单字段
    #[error("页面上没有可填写的表单字段")]
    NoSchema,
}

/// 答案接口错误
#[derive(Debug, Error)]
pub enum AnswerError {
    /// 请求超时（与字段匹配失败无关）
    #[error("答案请求超时 ({endpoint}, {timeout_secs} 秒)")]
    Timeout { endpoint: String, timeout_secs: u64 },
    /// 网络请求失败
    #[error("答案请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 健康检查未通过
    #[error("答案服务未响应，请确认服务已在 {endpoint} 启动")]
    Unavailable { endpoint: String },
    /// 接口返回错误状态
    #[error("接口返回错误响应 ({endpoint}): status={status}, body={body}")]
    BadResponse {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// 答案 JSON 解析失败
    #[error("答案 JSON 解析失败: {source}")]
    JsonParseFailed {
        #[source]
        source: serde_json::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
