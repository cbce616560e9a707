//! 切面注册表
//!
//! 负责管理和执行所有切面

use crate::advice::AdviceChain;
use crate::aspect::Aspect;
use crate::joinpoint::{Continuation, JoinPoint, Outcome, Target};
use once_cell::sync::Lazy;
use std::future::Future;
use std::sync::Arc;

/// 全局 AOP 注册表
///
/// 第一次访问时初始化，加载所有通过 inventory 注册的切面
static GLOBAL_ASPECT_REGISTRY: Lazy<Arc<AspectRegistry>> = Lazy::new(|| {
    let mut registry = AspectRegistry::new();
    registry.auto_load_aspects();
    Arc::new(registry)
});

/// 获取全局 AOP 注册表
///
/// 使用示例：
/// ```ignore
/// use weft_aop::get_global_registry;
///
/// let registry = get_global_registry();
/// registry.execute_with_aspects(jp, move || async move {
///     // your code here
/// }).await
/// ```
pub fn get_global_registry() -> &'static Arc<AspectRegistry> {
    &GLOBAL_ASPECT_REGISTRY
}

/// 切面注册表
///
/// 管理所有注册的切面（按 order 排序，相同 order 保持注册顺序），
/// 并提供执行通知链的方法
pub struct AspectRegistry {
    aspects: Vec<Arc<dyn Aspect>>,
}

impl AspectRegistry {
    /// 创建新的切面注册表
    pub fn new() -> Self {
        Self {
            aspects: Vec::new(),
        }
    }

    /// 注册切面
    pub fn register(&mut self, aspect: Arc<dyn Aspect>) {
        tracing::debug!(
            "Registering aspect: {} (order {}, pointcut {:?})",
            aspect.name(),
            aspect.order(),
            aspect.pointcut()
        );
        let position = self
            .aspects
            .partition_point(|existing| existing.order() <= aspect.order());
        self.aspects.insert(position, aspect);
    }

    /// 批量注册切面
    pub fn register_all(&mut self, aspects: impl IntoIterator<Item = Arc<dyn Aspect>>) {
        for aspect in aspects {
            self.register(aspect);
        }
    }

    pub fn aspects(&self) -> &[Arc<dyn Aspect>] {
        &self.aspects
    }

    /// 获取匹配指定连接点的所有切面
    pub fn get_matching_aspects(&self, join_point: &JoinPoint) -> Vec<Arc<dyn Aspect>> {
        self.aspects
            .iter()
            .filter(|aspect| aspect.pointcut().matches(join_point))
            .cloned()
            .collect()
    }

    /// 获取可能作用于目标类型的切面
    ///
    /// 创建代理时调用一次，结果为空的目标不需要拦截
    pub fn candidates_for(&self, target: &Target) -> Vec<Arc<dyn Aspect>> {
        self.aspects
            .iter()
            .filter(|aspect| aspect.pointcut().may_match_target(target))
            .cloned()
            .collect()
    }

    /// 执行带AOP的方法调用
    ///
    /// 没有匹配的切面时直接执行 `invocation`；否则按
    /// around → before → 目标方法 → after_returning / after_throwing → after
    /// 的顺序嵌套执行所有匹配的切面。
    pub async fn execute_with_aspects<F, Fut>(&self, join_point: JoinPoint, invocation: F) -> Outcome
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        let aspects = self.get_matching_aspects(&join_point);
        if aspects.is_empty() {
            return invocation().await;
        }

        let invocation: Continuation = Box::new(move || Box::pin(invocation()));
        AdviceChain::new(Arc::new(join_point), aspects)
            .proceed(invocation)
            .await
    }

    /// 获取注册的切面数量
    pub fn len(&self) -> usize {
        self.aspects.len()
    }

    /// 检查是否没有注册任何切面
    pub fn is_empty(&self) -> bool {
        self.aspects.is_empty()
    }

    /// 清除所有切面
    pub fn clear(&mut self) {
        self.aspects.clear();
    }

    /// 从 inventory 自动加载所有注册的切面
    ///
    /// 切点表达式无效的切面会被跳过并记录错误
    ///
    /// 使用示例：
    /// ```ignore
    /// let mut registry = AspectRegistry::new();
    /// registry.auto_load_aspects();
    /// ```
    pub fn auto_load_aspects(&mut self) {
        let registrations: Vec<_> = crate::aspect::get_all_aspect_registrations().collect();
        tracing::info!("Auto-loading {} aspect(s) from registry", registrations.len());

        for registration in registrations {
            tracing::debug!(
                "  ├─ Loading aspect: {} with pointcut: {}",
                registration.name,
                registration.pointcut_expr
            );

            match registration.create_instance() {
                Ok(aspect) => self.register(aspect),
                Err(e) => tracing::error!("Skipping aspect {}: {}", registration.name, e),
            }
        }

        tracing::info!("Auto-loaded {} aspect(s)", self.len());
    }
}

impl Default for AspectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AspectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.aspects.iter().map(|aspect| aspect.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::error_info::ThrownError;
    use crate::joinpoint::ReturnValue;
    use crate::pointcut::PointcutExpression;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct Tagged {
        name: &'static str,
        order: i32,
        pointcut: PointcutExpression,
        seen: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Aspect for Tagged {
        fn name(&self) -> &str {
            self.name
        }

        fn pointcut(&self) -> &PointcutExpression {
            &self.pointcut
        }

        fn order(&self) -> i32 {
            self.order
        }

        async fn before(&self, _join_point: &JoinPoint) {
            self.seen.lock().push(self.name);
        }
    }

    struct BillingService;
    struct BillingRepository;

    fn tagged(
        name: &'static str,
        order: i32,
        expr: &str,
        seen: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Arc<dyn Aspect> {
        Arc::new(Tagged {
            name,
            order,
            pointcut: PointcutExpression::parse(expr).unwrap(),
            seen: Arc::clone(seen),
        })
    }

    #[test]
    fn test_register_sorts_by_order() {
        let seen = Arc::default();
        let mut registry = AspectRegistry::new();
        registry.register_all([
            tagged("late", 10, "*", &seen),
            tagged("first", -1, "*", &seen),
            tagged("default-a", 0, "*", &seen),
            tagged("default-b", 0, "*", &seen),
        ]);

        let names: Vec<&str> = registry.aspects().iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["first", "default-a", "default-b", "late"]);
        assert_eq!(registry.len(), 4);

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_matching_and_candidates() {
        let seen = Arc::default();
        let mut registry = AspectRegistry::new();
        registry.register(tagged("services", 0, "execution(* *Service.*(..))", &seen));
        registry.register(tagged("getters", 0, "execution(* *.get*(..))", &seen));

        let service = Target::new(Arc::new(BillingService));
        let repository = Target::new(Arc::new(BillingRepository));

        assert_eq!(registry.candidates_for(&service).len(), 2);
        assert_eq!(registry.candidates_for(&repository).len(), 1);

        let jp = JoinPoint::new(service, "charge", args![]);
        let names: Vec<String> = registry
            .get_matching_aspects(&jp)
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        assert_eq!(names, vec!["services"]);
    }

    #[tokio::test]
    async fn test_execute_with_aspects() {
        let seen: Arc<Mutex<Vec<&'static str>>> = Arc::default();
        let mut registry = AspectRegistry::new();
        registry.register(tagged("inner", 5, "execution(* *Service.*(..))", &seen));
        registry.register(tagged("outer", 1, "execution(* *Service.*(..))", &seen));

        let jp = JoinPoint::new(Target::new(Arc::new(BillingService)), "charge", args![10_u64]);
        let value = registry
            .execute_with_aspects(jp, || async { Ok(ReturnValue::new("charged")) })
            .await
            .unwrap();

        assert_eq!(value.downcast::<&'static str>().unwrap(), "charged");
        assert_eq!(*seen.lock(), vec!["outer", "inner"]);
    }

    #[tokio::test]
    async fn test_execute_without_matching_aspects() {
        let seen: Arc<Mutex<Vec<&'static str>>> = Arc::default();
        let mut registry = AspectRegistry::new();
        registry.register(tagged("services", 0, "within(*Service)", &seen));

        let jp = JoinPoint::new(Target::new(Arc::new(BillingRepository)), "save", args![]);

        #[derive(Debug, thiserror::Error)]
        #[error("disk full")]
        struct DiskFull;

        let thrown = registry
            .execute_with_aspects(jp, || async { Err(ThrownError::new(DiskFull)) })
            .await
            .unwrap_err();

        assert!(thrown.is::<DiskFull>());
        assert!(seen.lock().is_empty());
    }
}
