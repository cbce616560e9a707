//! 日志切面 - 演示五种通知
//!
//! 拦截 `member` 模块中所有 `*Service` 类型的方法，把每个阶段打印到输出流
//! （默认标准输出），并在返回会员表时追加一条 id 为 50 的会员。

use crate::member::MemberDto;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;
use weft_aop::prelude::*;

pub const LOGGING_POINTCUT: &str = "execution(* member_demo::member::*Service.*(..))";

/// after_returning 追加的会员
pub const ASPECT_MEMBER_ID: i64 = 50;
pub const ASPECT_MEMBER_NAME: &str = "Aspect Member";

/// 以会员 id 为键的表
trait MemberTable {
    fn put(&mut self, member: MemberDto);
}

impl MemberTable for HashMap<i64, MemberDto> {
    fn put(&mut self, member: MemberDto) {
        self.insert(member.id, member);
    }
}

impl MemberTable for BTreeMap<i64, MemberDto> {
    fn put(&mut self, member: MemberDto) {
        self.insert(member.id, member);
    }
}

pub struct LoggingAspect {
    pointcut: PointcutExpression,
    out: Mutex<Box<dyn Write + Send>>,
}

impl LoggingAspect {
    pub fn new(out: impl Write + Send + 'static) -> AopResult<Self> {
        Ok(Self {
            pointcut: PointcutExpression::parse(LOGGING_POINTCUT)?,
            out: Mutex::new(Box::new(out)),
        })
    }

    pub fn stdout() -> AopResult<Self> {
        Self::new(io::stdout())
    }

    fn print(&self, line: fmt::Arguments<'_>) {
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            tracing::warn!("LoggingAspect could not write: {}", e);
        }
    }

    fn print_call(&self, phase: &str, jp: &JoinPoint) {
        self.print(format_args!("{} target : {}", phase, jp.target()));
        self.print(format_args!("{} signature : {}", phase, jp.signature()));
        if let Some(first) = jp.first_arg() {
            self.print(format_args!("{} first argument : {:?}", phase, first));
        }
    }
}

/// 返回值是会员表（HashMap / BTreeMap，或 Some(会员表)）时取得可写引用
fn member_table(result: &mut ReturnValue) -> Option<&mut dyn MemberTable> {
    if result.is::<HashMap<i64, MemberDto>>() {
        return table(result.downcast_mut::<HashMap<i64, MemberDto>>());
    }
    if result.is::<BTreeMap<i64, MemberDto>>() {
        return table(result.downcast_mut::<BTreeMap<i64, MemberDto>>());
    }
    if result.is::<Option<HashMap<i64, MemberDto>>>() {
        return table(result.downcast_mut::<Option<HashMap<i64, MemberDto>>>().and_then(Option::as_mut));
    }
    table(result.downcast_mut::<Option<BTreeMap<i64, MemberDto>>>().and_then(Option::as_mut))
}

fn table<T: MemberTable + 'static>(members: Option<&mut T>) -> Option<&mut dyn MemberTable> {
    members.map(|members| members as &mut dyn MemberTable)
}

#[async_trait]
impl Aspect for LoggingAspect {
    fn name(&self) -> &str {
        "LoggingAspect"
    }

    fn pointcut(&self) -> &PointcutExpression {
        &self.pointcut
    }

    async fn before(&self, jp: &JoinPoint) {
        self.print_call("Before", jp);
    }

    async fn after(&self, jp: &JoinPoint) {
        self.print_call("After", jp);
    }

    async fn after_returning(&self, _jp: &JoinPoint, result: &mut ReturnValue) {
        self.print(format_args!("After returning result : {:?}", result));

        if let Some(members) = member_table(result) {
            members.put(MemberDto::new(ASPECT_MEMBER_ID, ASPECT_MEMBER_NAME));
        }
    }

    async fn after_throwing(&self, _jp: &JoinPoint, error: &ThrownError) {
        self.print(format_args!("After throwing failure : {}", error));
    }

    async fn around(&self, pjp: ProceedingJoinPoint) -> Outcome {
        let method = pjp.signature().name();
        let started = Instant::now();

        self.print(format_args!("Around before : {}", method));
        let result = pjp.proceed().await?;
        self.print(format_args!("Around after : {}", method));
        let elapsed = started.elapsed();
        self.print(format_args!("Elapsed time : {}(ns)", elapsed.as_nanos()));

        Ok(result)
    }
}

// 自动注册到 AOP 系统
inventory::submit! {
    AspectRegistration::new(
        "LoggingAspect",
        LOGGING_POINTCUT,
        || Ok(Arc::new(LoggingAspect::stdout()?) as Arc<dyn Aspect>)
    )
}
