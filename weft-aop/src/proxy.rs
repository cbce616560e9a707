//! AOP 代理
//!
//! Rust 没有运行时动态代理，因此在服务注册时用 `AopProxy` 包装目标对象：
//! 调用方通过代理调用方法，代理负责构造连接点并执行匹配的通知链。
//!
//! ```ignore
//! let factory = ProxyFactory::from_environment(context.environment())?;
//! let members = context.register_advised(&factory, "memberService", MemberService::new(repo))?;
//!
//! let all = advised!(members => find_all_members()).await?;
//! let one = advised!(members => async fetch_member(id)).await?;
//! ```

use crate::advice::AdviceChain;
use crate::aspect::Aspect;
use crate::config::AopProperties;
use crate::error::{AopError, AopResult};
use crate::error_info::ThrownError;
use crate::joinpoint::{Arg, Continuation, JoinPoint, Outcome, ReturnValue, Target};
use crate::registry::{get_global_registry, AspectRegistry};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use weft_core::{ApplicationContext, Environment};

type AspectList = Arc<[Arc<dyn Aspect>]>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MethodKey {
    method: &'static str,
    params: Vec<&'static str>,
    returns: Option<&'static str>,
}

impl MethodKey {
    fn of(join_point: &JoinPoint) -> Self {
        let signature = join_point.signature();
        Self {
            method: signature.name(),
            params: signature.param_types().to_vec(),
            returns: signature.return_type(),
        }
    }
}

/// 代理工厂
pub struct ProxyFactory {
    registry: Arc<AspectRegistry>,
    properties: AopProperties,
}

impl ProxyFactory {
    pub fn new(registry: Arc<AspectRegistry>) -> Self {
        Self {
            registry,
            properties: AopProperties::default(),
        }
    }

    /// 使用全局注册表（inventory 注册的切面）
    pub fn global() -> Self {
        Self::new(Arc::clone(get_global_registry()))
    }

    /// 读取 `[aop]` 配置创建工厂
    pub fn from_environment(environment: &Environment) -> AopResult<Self> {
        let properties = AopProperties::from_environment(environment)?;
        let registry = if properties.autoload {
            Arc::clone(get_global_registry())
        } else {
            Arc::new(AspectRegistry::new())
        };

        tracing::info!(
            enabled = properties.enabled,
            autoload = properties.autoload,
            aspects = registry.len(),
            "AOP proxy factory ready"
        );
        Ok(Self {
            registry,
            properties,
        })
    }

    pub fn with_registry(mut self, registry: Arc<AspectRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_properties(mut self, properties: AopProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn registry(&self) -> &Arc<AspectRegistry> {
        &self.registry
    }

    pub fn properties(&self) -> &AopProperties {
        &self.properties
    }

    /// 为服务创建代理
    pub fn create_proxy<S>(&self, name: &str, service: S) -> AopProxy<S>
    where
        S: Any + Send + Sync,
    {
        self.wrap(name, Arc::new(service))
    }

    /// 为已共享的服务创建代理
    pub fn wrap<S>(&self, name: &str, service: Arc<S>) -> AopProxy<S>
    where
        S: Any + Send + Sync,
    {
        let target = Target::new(Arc::clone(&service)).with_bean_name(name);
        let candidates = if self.properties.enabled {
            self.registry.candidates_for(&target)
        } else {
            Vec::new()
        };

        if candidates.is_empty() {
            tracing::debug!("'{}' ({}) is not advised", name, target.type_path());
        } else {
            let names: Vec<&str> = candidates.iter().map(|aspect| aspect.name()).collect();
            tracing::info!(
                "Creating AOP proxy for '{}' ({}) with aspects {:?}",
                name,
                target.type_path(),
                names
            );
        }

        let cacheable = candidates.iter().all(|aspect| aspect.pointcut().is_static());
        AopProxy {
            service,
            target,
            candidates: candidates.into(),
            cacheable,
            cache: RwLock::new(HashMap::new()),
        }
    }
}

impl fmt::Debug for ProxyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyFactory")
            .field("registry", &self.registry)
            .field("properties", &self.properties)
            .finish()
    }
}

/// 被代理的服务
///
/// 没有可能匹配的切面时，`invoke` / `call` 直接调用目标方法。
pub struct AopProxy<S> {
    service: Arc<S>,
    target: Target,
    candidates: AspectList,
    cacheable: bool,
    /// 方法签名 -> 匹配的切面
    cache: RwLock<HashMap<MethodKey, AspectList>>,
}

impl<S> AopProxy<S>
where
    S: Any + Send + Sync,
{
    /// 目标对象（直接调用不经过通知）
    pub fn target(&self) -> &Arc<S> {
        &self.service
    }

    pub fn name(&self) -> Option<&str> {
        self.target.bean_name()
    }

    pub fn is_advised(&self) -> bool {
        !self.candidates.is_empty()
    }

    /// 通过通知链调用异步方法
    pub async fn invoke<T, E, F, Fut>(&self, method: &'static str, args: Vec<Arg>, body: F) -> Result<T, E>
    where
        T: Any + fmt::Debug + Send,
        E: Error + Send + Sync + From<AopError> + 'static,
        F: FnOnce(Arc<S>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let Some((join_point, aspects)) = self.advice_for::<T>(method, args) else {
            return body(service).await;
        };

        let invocation: Continuation = Box::new(move || {
            Box::pin(async move {
                body(service)
                    .await
                    .map(ReturnValue::new)
                    .map_err(ThrownError::new)
            })
        });
        restore(AdviceChain::new(join_point, aspects).proceed(invocation).await)
    }

    /// 通过通知链调用同步方法
    pub async fn call<T, E, F>(&self, method: &'static str, args: Vec<Arg>, body: F) -> Result<T, E>
    where
        T: Any + fmt::Debug + Send,
        E: Error + Send + Sync + From<AopError> + 'static,
        F: FnOnce(&S) -> Result<T, E> + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let Some((join_point, aspects)) = self.advice_for::<T>(method, args) else {
            return body(&*service);
        };

        let invocation: Continuation = Box::new(move || {
            Box::pin(async move { body(&*service).map(ReturnValue::new).map_err(ThrownError::new) })
        });
        restore(AdviceChain::new(join_point, aspects).proceed(invocation).await)
    }

    fn advice_for<T: Any>(&self, method: &'static str, args: Vec<Arg>) -> Option<(Arc<JoinPoint>, AspectList)> {
        if self.candidates.is_empty() {
            return None;
        }

        let join_point = JoinPoint::new(self.target.clone(), method, args)
            .with_return_type(std::any::type_name::<T>());
        let aspects = self.matching_aspects(&join_point);
        if aspects.is_empty() {
            None
        } else {
            Some((Arc::new(join_point), aspects))
        }
    }

    fn matching_aspects(&self, join_point: &JoinPoint) -> AspectList {
        let collect = || -> AspectList {
            self.candidates
                .iter()
                .filter(|aspect| aspect.pointcut().matches(join_point))
                .cloned()
                .collect()
        };

        if !self.cacheable {
            return collect();
        }

        let key = MethodKey::of(join_point);
        if let Some(hit) = self.cache.read().get(&key) {
            return Arc::clone(hit);
        }

        let matched = collect();
        tracing::trace!(
            method = key.method,
            aspects = matched.len(),
            "Caching advice for {}",
            join_point.signature()
        );
        self.cache.write().insert(key, Arc::clone(&matched));
        matched
    }
}

fn restore<T, E>(outcome: Outcome) -> Result<T, E>
where
    T: Any,
    E: Error + From<AopError> + 'static,
{
    match outcome {
        Ok(value) => value.downcast::<T>().map_err(E::from),
        Err(thrown) => Err(thrown.into_error()),
    }
}

impl<S> fmt::Debug for AopProxy<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let aspects: Vec<&str> = self.candidates.iter().map(|aspect| aspect.name()).collect();
        f.debug_struct("AopProxy")
            .field("target", &self.target)
            .field("aspects", &aspects)
            .finish()
    }
}

/// 通过代理调用方法
///
/// 参数必须是变量名，调用前会被克隆一份放入连接点。
///
/// ```ignore
/// advised!(proxy => count_members()).await?;          // 同步方法
/// advised!(proxy => async fetch_member(id)).await?;   // 异步方法
/// ```
#[macro_export]
macro_rules! advised {
    ($proxy:expr => async $method:ident ( $($arg:ident),* $(,)? )) => {
        $proxy.invoke(
            ::std::stringify!($method),
            $crate::args![$($arg),*],
            move |svc| async move { svc.$method($($arg),*).await },
        )
    };
    ($proxy:expr => $method:ident ( $($arg:ident),* $(,)? )) => {
        $proxy.call(
            ::std::stringify!($method),
            $crate::args![$($arg),*],
            move |svc| svc.$method($($arg),*),
        )
    };
}

/// 在应用上下文中注册 / 获取代理
pub trait AopContextExt {
    /// 创建代理并以 `name` 注册
    fn register_advised<S>(&self, factory: &ProxyFactory, name: &str, service: S) -> AopResult<Arc<AopProxy<S>>>
    where
        S: Any + Send + Sync;

    fn get_advised<S>(&self, name: &str) -> AopResult<Arc<AopProxy<S>>>
    where
        S: Any + Send + Sync;
}

impl AopContextExt for ApplicationContext {
    fn register_advised<S>(&self, factory: &ProxyFactory, name: &str, service: S) -> AopResult<Arc<AopProxy<S>>>
    where
        S: Any + Send + Sync,
    {
        let proxy = Arc::new(factory.create_proxy(name, service));
        self.register_singleton(name, Arc::clone(&proxy))?;
        Ok(proxy)
    }

    fn get_advised<S>(&self, name: &str) -> AopResult<Arc<AopProxy<S>>>
    where
        S: Any + Send + Sync,
    {
        Ok(self.get_bean::<AopProxy<S>>(name)?)
    }
}
