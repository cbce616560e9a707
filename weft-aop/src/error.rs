//! AOP 错误类型

use thiserror::Error;
use weft_core::{ApplicationError, ContainerError};

/// 拦截框架自身产生的错误
///
/// 被拦截方法的错误不会包装成 AopError，而是原样返回给调用方。
#[derive(Debug, Error)]
pub enum AopError {
    #[error("invalid pointcut expression `{expression}`: {reason}")]
    InvalidPointcut { expression: String, reason: String },

    /// 环绕通知返回了与目标方法不同类型的结果
    #[error("advice produced a {found} where {expected} was expected")]
    ReturnTypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// 环绕通知抛出了与目标方法不同类型的错误
    #[error("advice failed with {error_type}: {message}")]
    Advice { error_type: String, message: String },

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Config(#[from] ApplicationError),
}

impl AopError {
    pub(crate) fn invalid_pointcut(expression: &str, reason: impl Into<String>) -> Self {
        AopError::InvalidPointcut {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}

pub type AopResult<T> = std::result::Result<T, AopError>;
