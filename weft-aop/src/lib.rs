//! Weft AOP - 面向切面编程支持
//!
//! 为注册到 Weft 上下文中的服务提供方法拦截，支持：
//! - 通过 `Aspect` trait 声明切面，`inventory` 在编译期收集
//! - 五种通知（Before、After、AfterReturning、AfterThrowing、Around）
//! - AspectJ 风格的切点表达式（execution / within / bean，可用 && || ! 组合）
//! - 注册时创建的代理（`ProxyFactory` / `AopContextExt`），不匹配的服务直接调用

pub mod advice;
pub mod aspect;
pub mod config;
pub mod error;
pub mod error_info;
pub mod joinpoint;
pub mod pointcut;
pub mod proxy;
pub mod registry;

// 重新导出核心类型
pub use advice::{AdviceChain, AdviceType};
pub use aspect::{get_all_aspect_registrations, Aspect, AspectRegistration};
pub use config::AopProperties;
pub use error::{AopError, AopResult};
pub use error_info::{ErrorInfo, ThrownError};
pub use joinpoint::{
    Arg, ArgValue, Continuation, JoinPoint, Outcome, ProceedingJoinPoint, ReturnValue, Returned,
    Signature, Target,
};
pub use pointcut::{ExecutionPattern, NamePattern, PointcutExpression, TypePathPattern};
pub use proxy::{AopContextExt, AopProxy, ProxyFactory};
pub use registry::{get_global_registry, AspectRegistry};

// 导出 inventory 供切面注册使用
pub use inventory;

// 导出 async_trait，实现 Aspect 时不必单独依赖
pub use async_trait::async_trait;

/// 预导入模块
pub mod prelude {
    pub use crate::advice::AdviceType;
    pub use crate::aspect::{Aspect, AspectRegistration};
    pub use crate::config::AopProperties;
    pub use crate::error::{AopError, AopResult};
    pub use crate::error_info::{ErrorInfo, ThrownError};
    pub use crate::joinpoint::{Arg, JoinPoint, Outcome, ProceedingJoinPoint, ReturnValue, Signature, Target};
    pub use crate::pointcut::PointcutExpression;
    pub use crate::proxy::{AopContextExt, AopProxy, ProxyFactory};
    pub use crate::registry::{get_global_registry, AspectRegistry};
    pub use crate::{advised, args};
    pub use async_trait::async_trait;
}
