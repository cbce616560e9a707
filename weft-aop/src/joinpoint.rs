//! 连接点（JoinPoint）定义
//!
//! 连接点表示一次被拦截的方法调用。代理在每次调用时构造一个只读的
//! JoinPoint，并以引用的形式依次交给所有匹配的通知。

use crate::error::AopError;
use crate::error_info::ThrownError;
use futures::future::BoxFuture;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// 一次调用的结果：成功值或原始错误
pub type Outcome = Result<ReturnValue, ThrownError>;

/// 去掉类型名中的模块路径
///
/// `std::collections::HashMap<i64, demo::MemberDto>` -> `HashMap<i64, MemberDto>`
pub(crate) fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut ident = String::new();
    let mut chars = full.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_alphanumeric() || c == '_' {
            ident.push(c);
        } else if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            ident.clear();
        } else {
            out.push_str(&ident);
            ident.clear();
            out.push(c);
        }
    }
    out.push_str(&ident);
    out
}

/// 拆分完整类型路径为 (模块路径, 类型名)，类型名不含泛型参数
pub(crate) fn split_type_path(full: &'static str) -> (&'static str, &'static str) {
    let base = match full.find('<') {
        Some(idx) => &full[..idx],
        None => full,
    };
    match base.rfind("::") {
        Some(idx) => (&base[..idx], &base[idx + 2..]),
        None => ("", base),
    }
}

// ============================================================================
// Target
// ============================================================================

/// 被拦截的目标对象
#[derive(Clone)]
pub struct Target {
    instance: Arc<dyn Any + Send + Sync>,
    type_path: &'static str,
    module_path: &'static str,
    type_name: &'static str,
    bean_name: Option<Arc<str>>,
}

impl Target {
    pub fn new<S: Any + Send + Sync>(instance: Arc<S>) -> Self {
        let type_path = std::any::type_name::<S>();
        let (module_path, type_name) = split_type_path(type_path);
        Self {
            instance,
            type_path,
            module_path,
            type_name,
            bean_name: None,
        }
    }

    pub fn with_bean_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.bean_name = Some(name.into());
        self
    }

    /// 类型名（不含模块路径和泛型参数）
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn module_path(&self) -> &'static str {
        self.module_path
    }

    /// 完整类型路径
    pub fn type_path(&self) -> &'static str {
        self.type_path
    }

    pub fn bean_name(&self) -> Option<&str> {
        self.bean_name.as_deref()
    }

    pub fn downcast<S: Any + Send + Sync>(&self) -> Option<Arc<S>> {
        Arc::clone(&self.instance).downcast::<S>().ok()
    }

    fn address(&self) -> *const () {
        Arc::as_ptr(&self.instance) as *const ()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:p}", self.type_path, self.address())
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("type_path", &self.type_path)
            .field("bean_name", &self.bean_name)
            .field("address", &self.address())
            .finish()
    }
}

// ============================================================================
// Arguments
// ============================================================================

/// 可以作为连接点参数的值
pub trait ArgValue: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + fmt::Debug + Send + Sync> ArgValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 方法参数
#[derive(Clone)]
pub struct Arg {
    value: Arc<dyn ArgValue>,
    type_name: &'static str,
}

impl Arg {
    pub fn new<T: ArgValue>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.value).as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.value, f)
    }
}

/// 构造参数列表，参数值会被克隆
///
/// ```ignore
/// let args = weft_aop::args![id, name];
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Arg>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::Arg::new(::std::clone::Clone::clone(&$arg))),+]
    };
}

// ============================================================================
// Signature
// ============================================================================

/// 方法签名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    module_path: &'static str,
    declaring_type: &'static str,
    name: &'static str,
    param_types: Vec<&'static str>,
    return_type: Option<&'static str>,
}

impl Signature {
    pub fn new(target: &Target, name: &'static str, args: &[Arg]) -> Self {
        Self {
            module_path: target.module_path(),
            declaring_type: target.type_name(),
            name,
            param_types: args.iter().map(Arg::type_name).collect(),
            return_type: None,
        }
    }

    pub fn with_return_type(mut self, return_type: &'static str) -> Self {
        self.return_type = Some(return_type);
        self
    }

    /// 方法名
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn declaring_type(&self) -> &'static str {
        self.declaring_type
    }

    pub fn module_path(&self) -> &'static str {
        self.module_path
    }

    pub fn param_types(&self) -> &[&'static str] {
        &self.param_types
    }

    /// 成功返回值的完整类型名
    pub fn return_type(&self) -> Option<&'static str> {
        self.return_type
    }

    /// `Type::method`
    pub fn short_string(&self) -> String {
        format!("{}::{}", self.declaring_type, self.name)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ret) = self.return_type {
            write!(f, "{} ", short_type_name(ret))?;
        }
        write!(f, "{}::{}(", self.declaring_type, self.name)?;
        for (i, param) in self.param_types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&short_type_name(param))?;
        }
        f.write_str(")")
    }
}

// ============================================================================
// JoinPoint
// ============================================================================

/// 连接点信息
///
/// 包含方法调用时的上下文信息：目标对象、签名、实参。
#[derive(Clone)]
pub struct JoinPoint {
    target: Target,
    signature: Signature,
    args: Vec<Arg>,
    timestamp: Instant,
}

impl JoinPoint {
    pub fn new(target: Target, method_name: &'static str, args: Vec<Arg>) -> Self {
        let signature = Signature::new(&target, method_name, &args);
        Self {
            target,
            signature,
            args,
            timestamp: Instant::now(),
        }
    }

    pub fn with_return_type(mut self, return_type: &'static str) -> Self {
        self.signature = self.signature.with_return_type(return_type);
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn method_name(&self) -> &'static str {
        self.signature.name()
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn first_arg(&self) -> Option<&Arg> {
        self.args.first()
    }

    /// 按位置取参数并转换为具体类型
    pub fn arg<T: Any>(&self, index: usize) -> Option<&T> {
        self.args.get(index)?.downcast_ref::<T>()
    }

    pub fn timestamp(&self) -> &Instant {
        &self.timestamp
    }
}

impl fmt::Debug for JoinPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinPoint")
            .field("target", &self.target)
            .field("signature", &self.signature.to_string())
            .field("args", &self.args)
            .finish()
    }
}

impl fmt::Display for JoinPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature)
    }
}

// ============================================================================
// ReturnValue
// ============================================================================

/// 可以作为返回值在通知链中传递的类型
pub trait Returned: Any + fmt::Debug + Send {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
    fn type_name(&self) -> &'static str;
}

impl<T: Any + fmt::Debug + Send> Returned for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// 目标方法成功返回的值
///
/// after_returning 通知通过 `downcast_mut` 获得写权限，调用方最终看到的
/// 是修改后的值；值的类型在整个通知链中保持不变。
pub struct ReturnValue(Box<dyn Returned>);

impl ReturnValue {
    pub fn new<T: Returned>(value: T) -> Self {
        Self(Box::new(value))
    }

    pub fn type_name(&self) -> &'static str {
        (*self.0).type_name()
    }

    pub fn is<T: Any>(&self) -> bool {
        (*self.0).as_any().is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.0).as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        (*self.0).as_any_mut().downcast_mut::<T>()
    }

    /// 取回具体类型的值
    pub fn downcast<T: Any>(self) -> Result<T, AopError> {
        let found = self.type_name();
        self.0
            .into_any()
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| AopError::ReturnTypeMismatch {
                expected: std::any::type_name::<T>(),
                found,
            })
    }
}

impl fmt::Debug for ReturnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

// ============================================================================
// ProceedingJoinPoint
// ============================================================================

/// 剩余通知链与目标方法
pub type Continuation = Box<dyn FnOnce() -> BoxFuture<'static, Outcome> + Send>;

/// 环绕通知的执行链
///
/// `proceed` 消耗 self，因此继续执行最多发生一次；不调用则目标方法不会执行。
pub struct ProceedingJoinPoint {
    join_point: Arc<JoinPoint>,
    proceed_fn: Continuation,
}

impl ProceedingJoinPoint {
    pub fn new(join_point: Arc<JoinPoint>, proceed_fn: Continuation) -> Self {
        Self {
            join_point,
            proceed_fn,
        }
    }

    /// 继续执行目标方法（以及内层通知）
    pub async fn proceed(self) -> Outcome {
        (self.proceed_fn)().await
    }

    pub fn join_point(&self) -> &JoinPoint {
        &self.join_point
    }

    pub fn signature(&self) -> &Signature {
        self.join_point.signature()
    }

    pub fn args(&self) -> &[Arg] {
        self.join_point.args()
    }
}

impl fmt::Debug for ProceedingJoinPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProceedingJoinPoint")
            .field("join_point", &self.join_point)
            .finish_non_exhaustive()
    }
}
