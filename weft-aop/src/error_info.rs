//! 错误信息结构
//!
//! 被拦截方法失败时，错误值被原样装箱交给 after_throwing / around 通知，
//! 通知链结束后再还原成调用方的错误类型。

use crate::error::AopError;
use crate::joinpoint::short_type_name;
use std::error::Error;
use std::fmt;

/// 结构化的错误信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// 错误消息
    pub message: String,

    /// 错误类型名称（不含模块路径）
    pub error_type: String,

    /// 错误源链（cause chain）
    pub source_chain: Vec<String>,
}

impl ErrorInfo {
    pub fn from_error<E: Error + ?Sized>(error: &E) -> Self {
        let mut source_chain = Vec::new();
        let mut current = error.source();
        while let Some(source) = current {
            source_chain.push(source.to_string());
            current = source.source();
        }

        Self {
            message: error.to_string(),
            error_type: short_type_name(std::any::type_name::<E>()),
            source_chain,
        }
    }

    /// `类型: 消息` 形式的单行描述
    pub fn summary(&self) -> String {
        format!("{}: {}", self.error_type, self.message)
    }

    /// 完整描述（包含源链）
    pub fn full_description(&self) -> String {
        if self.source_chain.is_empty() {
            self.summary()
        } else {
            format!("{}\nCaused by:\n  {}", self.summary(), self.source_chain.join("\n  "))
        }
    }
}

/// 被拦截方法抛出的错误
pub struct ThrownError {
    info: ErrorInfo,
    error: Box<dyn Error + Send + Sync + 'static>,
}

impl ThrownError {
    pub fn new<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            info: ErrorInfo::from_error(&error),
            error: Box::new(error),
        }
    }

    pub fn info(&self) -> &ErrorInfo {
        &self.info
    }

    /// 原始错误
    pub fn error(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.error.as_ref()
    }

    pub fn is<E: Error + 'static>(&self) -> bool {
        self.error.is::<E>()
    }

    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.error.downcast_ref::<E>()
    }

    /// 还原为调用方的错误类型
    ///
    /// 原始错误直接返回；通知自行抛出的其它错误转换为 `AopError`。
    pub(crate) fn into_error<E>(self) -> E
    where
        E: Error + From<AopError> + 'static,
    {
        let ThrownError { info, error } = self;
        match error.downcast::<E>() {
            Ok(original) => *original,
            Err(other) => match other.downcast::<AopError>() {
                Ok(aop) => E::from(*aop),
                Err(_) => E::from(AopError::Advice {
                    error_type: info.error_type,
                    message: info.message,
                }),
            },
        }
    }
}

impl fmt::Debug for ThrownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrownError")
            .field("error_type", &self.info.error_type)
            .field("error", &self.error)
            .finish()
    }
}

impl fmt::Display for ThrownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.info.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "disk unplugged")
        }
    }

    impl Error for Inner {}

    #[derive(Debug)]
    enum StoreError {
        Io(Inner),
        Aop(AopError),
    }

    impl fmt::Display for StoreError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                StoreError::Io(_) => write!(f, "store unavailable"),
                StoreError::Aop(e) => write!(f, "{e}"),
            }
        }
    }

    impl Error for StoreError {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            match self {
                StoreError::Io(inner) => Some(inner),
                StoreError::Aop(e) => Some(e),
            }
        }
    }

    impl From<AopError> for StoreError {
        fn from(e: AopError) -> Self {
            StoreError::Aop(e)
        }
    }

    #[test]
    fn test_error_info_captures_chain() {
        let info = ErrorInfo::from_error(&StoreError::Io(Inner));

        assert_eq!(info.error_type, "StoreError");
        assert_eq!(info.summary(), "StoreError: store unavailable");
        assert_eq!(info.source_chain, vec!["disk unplugged".to_string()]);
        assert!(info.full_description().contains("Caused by:\n  disk unplugged"));
    }

    #[test]
    fn test_original_error_round_trips() {
        let thrown = ThrownError::new(StoreError::Io(Inner));
        assert!(thrown.is::<StoreError>());
        assert_eq!(thrown.to_string(), "StoreError: store unavailable");

        let restored: StoreError = thrown.into_error();
        assert!(matches!(restored, StoreError::Io(_)));
    }

    #[test]
    fn test_foreign_error_becomes_advice_error() {
        let thrown = ThrownError::new(Inner);
        let restored: StoreError = thrown.into_error();

        match restored {
            StoreError::Aop(AopError::Advice { error_type, message }) => {
                assert_eq!(error_type, "Inner");
                assert_eq!(message, "disk unplugged");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
