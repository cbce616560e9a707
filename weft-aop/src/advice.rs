//! 通知（Advice）定义
//!
//! 定义了在连接点执行的各种动作，以及把多个切面的通知串成一条调用链的执行器

use crate::aspect::Aspect;
use crate::joinpoint::{Continuation, JoinPoint, Outcome, ProceedingJoinPoint};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdviceType {
    /// 前置通知
    Before,
    /// 后置通知（无论成功还是失败都执行）
    After,
    /// 返回后通知（成功返回时执行）
    AfterReturning,
    /// 异常通知（抛出异常时执行）
    AfterThrowing,
    /// 环绕通知（可以控制方法执行）
    Around,
}

impl fmt::Display for AdviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdviceType::Before => "before",
            AdviceType::After => "after",
            AdviceType::AfterReturning => "after-returning",
            AdviceType::AfterThrowing => "after-throwing",
            AdviceType::Around => "around",
        };
        f.write_str(name)
    }
}

/// 通知链
///
/// 按切面顺序（外层在前）嵌套执行：每个切面的 around 包住它自己的
/// before / after_returning / after_throwing / after 以及所有内层切面。
pub struct AdviceChain {
    join_point: Arc<JoinPoint>,
    aspects: Arc<[Arc<dyn Aspect>]>,
}

impl AdviceChain {
    pub fn new(join_point: Arc<JoinPoint>, aspects: impl Into<Arc<[Arc<dyn Aspect>]>>) -> Self {
        Self {
            join_point,
            aspects: aspects.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.aspects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aspects.is_empty()
    }

    /// 执行整条链，`invocation` 是最内层的目标方法调用
    pub async fn proceed(self, invocation: Continuation) -> Outcome {
        proceed_at(self.join_point, self.aspects, 0, invocation).await
    }
}

fn proceed_at(
    join_point: Arc<JoinPoint>,
    aspects: Arc<[Arc<dyn Aspect>]>,
    index: usize,
    invocation: Continuation,
) -> BoxFuture<'static, Outcome> {
    let Some(aspect) = aspects.get(index).cloned() else {
        return invocation();
    };

    let inner_join_point = Arc::clone(&join_point);
    let inner_aspect = Arc::clone(&aspect);
    let next: Continuation = Box::new(move || {
        Box::pin(async move {
            let jp = inner_join_point;
            let aspect = inner_aspect;

            trace_advice(aspect.as_ref(), AdviceType::Before, &jp);
            aspect.before(&jp).await;

            let mut outcome = proceed_at(Arc::clone(&jp), aspects, index + 1, invocation).await;

            match &mut outcome {
                Ok(value) => {
                    trace_advice(aspect.as_ref(), AdviceType::AfterReturning, &jp);
                    aspect.after_returning(&jp, value).await;
                }
                Err(error) => {
                    trace_advice(aspect.as_ref(), AdviceType::AfterThrowing, &jp);
                    aspect.after_throwing(&jp, error).await;
                }
            }

            trace_advice(aspect.as_ref(), AdviceType::After, &jp);
            aspect.after(&jp).await;

            outcome
        })
    });

    Box::pin(async move {
        trace_advice(aspect.as_ref(), AdviceType::Around, &join_point);
        aspect.around(ProceedingJoinPoint::new(join_point, next)).await
    })
}

fn trace_advice(aspect: &dyn Aspect, advice: AdviceType, join_point: &JoinPoint) {
    tracing::trace!(
        aspect = aspect.name(),
        advice = %advice,
        method = join_point.method_name(),
        "Applying advice"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_info::ThrownError;
    use crate::joinpoint::{ReturnValue, Target};
    use crate::pointcut::PointcutExpression;
    use crate::args;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    type Journal = Arc<Mutex<Vec<String>>>;

    struct Recording {
        name: &'static str,
        journal: Journal,
        pointcut: PointcutExpression,
        skip_target: bool,
    }

    impl Recording {
        fn new(name: &'static str, journal: &Journal) -> Arc<dyn Aspect> {
            Arc::new(Self {
                name,
                journal: Arc::clone(journal),
                pointcut: PointcutExpression::All,
                skip_target: false,
            })
        }

        fn log(&self, entry: &str) {
            self.journal.lock().push(format!("{}:{}", self.name, entry));
        }
    }

    #[async_trait]
    impl Aspect for Recording {
        fn name(&self) -> &str {
            self.name
        }

        fn pointcut(&self) -> &PointcutExpression {
            &self.pointcut
        }

        async fn before(&self, _join_point: &JoinPoint) {
            self.log("before");
        }

        async fn after(&self, _join_point: &JoinPoint) {
            self.log("after");
        }

        async fn after_returning(&self, _join_point: &JoinPoint, result: &mut ReturnValue) {
            self.log("after_returning");
            if let Some(n) = result.downcast_mut::<u32>() {
                *n += 1;
            }
        }

        async fn after_throwing(&self, _join_point: &JoinPoint, error: &ThrownError) {
            self.log(&format!("after_throwing({})", error));
        }

        async fn around(&self, pjp: ProceedingJoinPoint) -> Outcome {
            if self.skip_target {
                self.log("around-short-circuit");
                return Ok(ReturnValue::new(0_u32));
            }
            self.log("around-before");
            let outcome = pjp.proceed().await;
            self.log("around-after");
            outcome
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("boom")]
    struct Boom;

    struct Worker;

    fn join_point() -> Arc<JoinPoint> {
        Arc::new(JoinPoint::new(Target::new(Arc::new(Worker)), "work", args![7_u32]))
    }

    fn target(journal: &Journal, result: Result<u32, Boom>) -> Continuation {
        let journal = Arc::clone(journal);
        Box::new(move || {
            Box::pin(async move {
                journal.lock().push("target".to_string());
                result.map(ReturnValue::new).map_err(ThrownError::new)
            })
        })
    }

    #[tokio::test]
    async fn test_nested_ordering_on_success() {
        let journal: Journal = Arc::default();
        let chain = AdviceChain::new(
            join_point(),
            vec![Recording::new("outer", &journal), Recording::new("inner", &journal)],
        );

        let outcome = chain.proceed(target(&journal, Ok(40))).await;

        // 每个切面都给结果加一
        assert_eq!(outcome.unwrap().downcast::<u32>().unwrap(), 42);
        assert_eq!(
            *journal.lock(),
            vec![
                "outer:around-before",
                "outer:before",
                "inner:around-before",
                "inner:before",
                "target",
                "inner:after_returning",
                "inner:after",
                "inner:around-after",
                "outer:after_returning",
                "outer:after",
                "outer:around-after",
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_reaches_caller_unchanged() {
        let journal: Journal = Arc::default();
        let chain = AdviceChain::new(join_point(), vec![Recording::new("only", &journal)]);

        let thrown = chain.proceed(target(&journal, Err(Boom))).await.unwrap_err();

        assert!(thrown.is::<Boom>());
        assert_eq!(
            *journal.lock(),
            vec![
                "only:around-before",
                "only:before",
                "target",
                "only:after_throwing(Boom: boom)",
                "only:after",
                "only:around-after",
            ]
        );
    }

    #[tokio::test]
    async fn test_around_can_skip_target() {
        let journal: Journal = Arc::default();
        let aspect: Arc<dyn Aspect> = Arc::new(Recording {
            name: "guard",
            journal: Arc::clone(&journal),
            pointcut: PointcutExpression::All,
            skip_target: true,
        });
        let chain = AdviceChain::new(join_point(), vec![aspect]);

        let value = chain.proceed(target(&journal, Ok(1))).await.unwrap();

        assert_eq!(value.downcast::<u32>().unwrap(), 0);
        assert_eq!(*journal.lock(), vec!["guard:around-short-circuit"]);
    }

    #[tokio::test]
    async fn test_empty_chain_runs_target_only() {
        let journal: Journal = Arc::default();
        let chain = AdviceChain::new(join_point(), Vec::<Arc<dyn Aspect>>::new());
        assert!(chain.is_empty());

        let value = chain.proceed(target(&journal, Ok(5))).await.unwrap();
        assert_eq!(value.downcast::<u32>().unwrap(), 5);
        assert_eq!(*journal.lock(), vec!["target"]);
    }

    #[test]
    fn test_advice_type_display() {
        assert_eq!(AdviceType::AfterReturning.to_string(), "after-returning");
        assert_eq!(AdviceType::Around.to_string(), "around");
    }
}
