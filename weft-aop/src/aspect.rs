//! 切面（Aspect）定义
//!
//! 切面是横切关注点的模块化

use crate::error::AopResult;
use crate::error_info::ThrownError;
use crate::joinpoint::{JoinPoint, Outcome, ProceedingJoinPoint, ReturnValue};
use crate::pointcut::PointcutExpression;
use async_trait::async_trait;
use std::sync::Arc;

/// 切面 Trait
///
/// 实现此 trait 以定义切面逻辑。所有通知都有空的默认实现，
/// 只需覆盖关心的部分。
///
/// 同一次调用中，一个切面的通知按如下顺序执行：
///
/// ```text
/// around（proceed 之前）
///   before
///     内层切面 / 目标方法
///   after_returning 或 after_throwing
///   after
/// around（proceed 之后）
/// ```
#[async_trait]
pub trait Aspect: Send + Sync {
    /// 切面名称
    fn name(&self) -> &str;

    /// 切点表达式
    fn pointcut(&self) -> &PointcutExpression;

    /// 执行顺序，值越小越靠外层
    fn order(&self) -> i32 {
        0
    }

    /// 前置通知
    async fn before(&self, _join_point: &JoinPoint) {}

    /// 后置通知，成功或失败都会执行
    async fn after(&self, _join_point: &JoinPoint) {}

    /// 返回后通知
    ///
    /// 可以通过 `result.downcast_mut` 修改返回值，调用方看到的是修改后的值。
    async fn after_returning(&self, _join_point: &JoinPoint, _result: &mut ReturnValue) {}

    /// 异常通知，只能观察，错误仍会返回给调用方
    async fn after_throwing(&self, _join_point: &JoinPoint, _error: &ThrownError) {}

    /// 环绕通知
    ///
    /// 必须调用 `pjp.proceed()` 目标方法才会执行，并应把结果原样返回。
    async fn around(&self, pjp: ProceedingJoinPoint) -> Outcome {
        pjp.proceed().await
    }
}

/// 切面注册器
///
/// 用于 inventory 自动收集和注册切面
///
/// ```ignore
/// weft_aop::inventory::submit! {
///     AspectRegistration::new("LoggingAspect", LOGGING_POINTCUT, || {
///         Ok(Arc::new(LoggingAspect::stdout()?) as Arc<dyn Aspect>)
///     })
/// }
/// ```
pub struct AspectRegistration {
    /// 切面名称
    pub name: &'static str,

    /// 切点表达式
    pub pointcut_expr: &'static str,

    /// 创建切面实例的函数（切点表达式无效时返回错误）
    pub creator: fn() -> AopResult<Arc<dyn Aspect>>,
}

impl AspectRegistration {
    pub const fn new(
        name: &'static str,
        pointcut_expr: &'static str,
        creator: fn() -> AopResult<Arc<dyn Aspect>>,
    ) -> Self {
        Self {
            name,
            pointcut_expr,
            creator,
        }
    }

    /// 创建切面实例
    pub fn create_instance(&self) -> AopResult<Arc<dyn Aspect>> {
        (self.creator)()
    }
}

// 使用 inventory 收集所有切面注册器
inventory::collect!(AspectRegistration);

/// 获取所有注册的切面注册器
pub fn get_all_aspect_registrations() -> impl Iterator<Item = &'static AspectRegistration> {
    inventory::iter::<AspectRegistration>()
}
