//! 统一的错误处理类型
//!
//! 框架内部使用 thiserror 定义的结构化错误，应用层（如 demo 的 main）
//! 可以继续使用 anyhow::Result，通过 `?` 自动转换。

use thiserror::Error;

pub use anyhow::Result;

/// 容器（服务注册表）错误
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("bean '{0}' is already registered")]
    DuplicateBean(String),

    #[error("bean '{0}' not found")]
    BeanNotFound(String),

    #[error("bean '{name}' is a {actual}, not a {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("no bean of type {0} registered")]
    NoBeanOfType(&'static str),

    #[error("expected a single bean of type {type_name}, found {candidates:?}")]
    NoUniqueBean {
        type_name: &'static str,
        candidates: Vec<String>,
    },
}

/// 应用级错误（配置、日志、容器）
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {name}: {source}")]
    ConfigParse {
        name: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to bind configuration under '{prefix}': {message}")]
    ConfigBind { prefix: String, message: String },

    #[error("failed to initialize logging: {0}")]
    LoggingInitFailed(String),

    #[error(transparent)]
    Container(#[from] ContainerError),
}

pub type ContainerResult<T> = std::result::Result<T, ContainerError>;

pub type ApplicationResult<T> = std::result::Result<T, ApplicationError>;
