//! 切点（Pointcut）表达式系统
//!
//! 定义了如何匹配连接点的规则。字符串表达式在切面创建时解析一次，
//! 通配符被预编译为正则表达式。
//!
//! 支持的语法：
//!
//! ```text
//! execution(* app::service::*Service.*(..))     app::service 模块下以 Service 结尾的类型的所有方法
//! execution(* app..*Service.find*(*))          app 及其子模块，find 开头，恰好一个参数
//! execution(HashMap<*> *.*(i64, ..))           返回 HashMap，第一个参数为 i64
//! within(app::service::*)                      app::service 模块下的所有类型
//! bean(member*)                                注册名以 member 开头的服务
//! execution(...) && !within(...)               && / || / ! 以及括号（也可写作 and / or / not）
//! ```
//!
//! 参数列表：`..` 任意个参数，`*` 恰好一个参数，其它为参数类型名（可含 `*`）。
//! 模块路径分隔符可以是 `::` 或 `.`，`..` 表示任意层子模块。

use crate::error::{AopError, AopResult};
use crate::joinpoint::{short_type_name, JoinPoint, Target};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// ============================================================================
// 基础模式
// ============================================================================

/// 名称通配符模式（支持 `*`）
#[derive(Clone)]
pub struct NamePattern {
    raw: String,
    regex: Option<Regex>,
}

impl NamePattern {
    /// - `*` 匹配任意字符串
    /// - `User*` 以 User 开头
    /// - `*Service` 以 Service 结尾
    /// - 不含 `*` 时精确匹配
    pub fn new(raw: &str) -> Result<Self, regex::Error> {
        let regex = if raw.contains('*') && raw != "*" {
            let body: Vec<String> = raw.split('*').map(regex::escape).collect();
            Some(Regex::new(&format!("^{}$", body.join(".*")))?)
        } else {
            None
        };

        Ok(Self {
            raw: raw.to_string(),
            regex,
        })
    }

    pub fn is_wildcard(&self) -> bool {
        self.raw == "*"
    }

    pub fn matches(&self, candidate: &str) -> bool {
        if self.is_wildcard() {
            return true;
        }
        match &self.regex {
            Some(regex) => regex.is_match(candidate),
            None => self.raw == candidate,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Debug for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Clone, Debug)]
enum ModuleSegment {
    Name(NamePattern),
    /// `..`：零个或多个模块
    AnyDepth,
}

fn match_module(patterns: &[ModuleSegment], segments: &[&str]) -> bool {
    match patterns.split_first() {
        None => segments.is_empty(),
        Some((ModuleSegment::AnyDepth, rest)) => {
            (0..=segments.len()).any(|skip| match_module(rest, &segments[skip..]))
        }
        Some((ModuleSegment::Name(pattern), rest)) => match segments.split_first() {
            Some((first, tail)) => pattern.matches(first) && match_module(rest, tail),
            None => false,
        },
    }
}

/// 类型路径模式：`模块路径::类型名`
#[derive(Clone, Debug)]
pub struct TypePathPattern {
    /// 为空表示不限定模块
    module: Vec<ModuleSegment>,
    type_pattern: NamePattern,
}

impl TypePathPattern {
    pub fn matches(&self, module_path: &str, type_name: &str) -> bool {
        if !self.type_pattern.matches(type_name) {
            return false;
        }
        if self.module.is_empty() {
            return true;
        }
        let segments: Vec<&str> = module_path.split("::").filter(|s| !s.is_empty()).collect();
        match_module(&self.module, &segments)
    }

    fn matches_target(&self, target: &Target) -> bool {
        self.matches(target.module_path(), target.type_name())
    }
}

#[derive(Clone, Debug)]
enum ParamPattern {
    /// `..`
    AnyCount,
    /// `*`
    One,
    Type(NamePattern),
}

fn match_params(patterns: &[ParamPattern], params: &[&str]) -> bool {
    match patterns.split_first() {
        None => params.is_empty(),
        Some((ParamPattern::AnyCount, rest)) => {
            (0..=params.len()).any(|skip| match_params(rest, &params[skip..]))
        }
        Some((head, rest)) => match params.split_first() {
            Some((param, tail)) => {
                let ok = match head {
                    ParamPattern::Type(pattern) => pattern.matches(&normalize_type(param)),
                    _ => true,
                };
                ok && match_params(rest, tail)
            }
            None => false,
        },
    }
}

fn normalize_type(full: &str) -> String {
    short_type_name(full).chars().filter(|c| !c.is_whitespace()).collect()
}

// ============================================================================
// execution(...)
// ============================================================================

/// `execution([visibility] ret [module::]Type.method(params))`
#[derive(Clone)]
pub struct ExecutionPattern {
    raw: String,
    return_pattern: NamePattern,
    /// None 表示任意类型
    declaring: Option<TypePathPattern>,
    method: NamePattern,
    params: Vec<ParamPattern>,
}

const VISIBILITY_KEYWORDS: &[&str] = &["pub", "public", "private", "protected"];

impl ExecutionPattern {
    pub fn parse(body: &str) -> AopResult<Self> {
        let raw = body.trim();
        let invalid = |reason: &str| AopError::invalid_pointcut(&format!("execution({})", raw), reason);

        if !raw.ends_with(')') {
            return Err(invalid("missing parameter list"));
        }
        let open = matching_open_paren(raw).ok_or_else(|| invalid("unbalanced parentheses"))?;
        let params_src = &raw[open + 1..raw.len() - 1];
        let head = raw[..open].trim_end();

        let (prefix, decl) = match head.char_indices().rev().find(|(_, c)| c.is_whitespace()) {
            Some((idx, c)) => (head[..idx].trim(), &head[idx + c.len_utf8()..]),
            None => return Err(invalid("expected `<return pattern> <Type>.<method>(<params>)`")),
        };

        let return_src = strip_visibility(prefix);
        if return_src.is_empty() {
            return Err(invalid("missing return type pattern"));
        }
        let return_src: String = return_src.chars().filter(|c| !c.is_whitespace()).collect();
        let return_pattern = NamePattern::new(&return_src).map_err(|e| invalid(&e.to_string()))?;

        let mut tokens = tokenize_path(decl).map_err(|reason| invalid(&reason))?;
        let method = match tokens.pop() {
            Some(PathToken::Name(name)) => NamePattern::new(&name).map_err(|e| invalid(&e.to_string()))?,
            _ => return Err(invalid("missing method pattern")),
        };
        let declaring = if tokens.is_empty() {
            None
        } else {
            Some(type_path_from_tokens(tokens).map_err(|reason| invalid(&reason))?)
        };

        let params = parse_params(params_src).map_err(|reason| invalid(&reason))?;

        Ok(Self {
            raw: raw.to_string(),
            return_pattern,
            declaring,
            method,
            params,
        })
    }

    pub fn matches(&self, join_point: &JoinPoint) -> bool {
        let signature = join_point.signature();

        if !self.return_pattern.is_wildcard() {
            let returns = signature
                .return_type()
                .map(|ret| self.return_pattern.matches(&normalize_type(ret)))
                .unwrap_or(false);
            if !returns {
                return false;
            }
        }

        self.may_match_target(join_point.target())
            && self.method.matches(signature.name())
            && match_params(&self.params, signature.param_types())
    }

    fn may_match_target(&self, target: &Target) -> bool {
        self.declaring
            .as_ref()
            .map(|declaring| declaring.matches_target(target))
            .unwrap_or(true)
    }
}

impl fmt::Debug for ExecutionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "execution({})", self.raw)
    }
}

fn matching_open_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, c) in s.char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_visibility(mut prefix: &str) -> &str {
    loop {
        prefix = prefix.trim_start();
        if let Some(rest) = prefix.strip_prefix("pub(") {
            if let Some(close) = rest.find(')') {
                prefix = &rest[close + 1..];
                continue;
            }
        }
        let keyword = VISIBILITY_KEYWORDS.iter().find(|kw| {
            prefix
                .strip_prefix(**kw)
                .map(|rest| rest.starts_with(char::is_whitespace))
                .unwrap_or(false)
        });
        match keyword {
            Some(kw) => prefix = &prefix[kw.len()..],
            None => return prefix,
        }
    }
}

#[derive(Debug, PartialEq)]
enum PathToken {
    Name(String),
    AnyDepth,
}

fn tokenize_path(src: &str) -> Result<Vec<PathToken>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut rest = src;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("..") {
            if !current.is_empty() {
                tokens.push(PathToken::Name(std::mem::take(&mut current)));
            }
            tokens.push(PathToken::AnyDepth);
            rest = after
                .strip_prefix("::")
                .or_else(|| after.strip_prefix('.').filter(|r| !r.starts_with('.')))
                .unwrap_or(after);
            continue;
        }

        let after_separator = rest.strip_prefix("::").or_else(|| rest.strip_prefix('.'));
        if let Some(after) = after_separator {
            if current.is_empty() {
                return Err(format!("empty path segment in `{}`", src));
            }
            tokens.push(PathToken::Name(std::mem::take(&mut current)));
            rest = after;
            continue;
        }

        let mut chars = rest.chars();
        let c = chars.next().unwrap_or_default();
        if c.is_alphanumeric() || c == '_' || c == '*' {
            current.push(c);
            rest = chars.as_str();
        } else {
            return Err(format!("unexpected character `{}` in `{}`", c, src));
        }
    }

    if !current.is_empty() {
        tokens.push(PathToken::Name(current));
    } else if !matches!(tokens.last(), Some(PathToken::AnyDepth)) {
        return Err(format!("path `{}` ends with a separator", src));
    }
    Ok(tokens)
}

fn type_path_from_tokens(mut tokens: Vec<PathToken>) -> Result<TypePathPattern, String> {
    let type_pattern = match tokens.pop() {
        Some(PathToken::Name(name)) => NamePattern::new(&name).map_err(|e| e.to_string())?,
        _ => return Err("missing type pattern".to_string()),
    };

    let module = tokens
        .into_iter()
        .map(|token| match token {
            PathToken::AnyDepth => Ok(ModuleSegment::AnyDepth),
            PathToken::Name(name) => NamePattern::new(&name)
                .map(ModuleSegment::Name)
                .map_err(|e| e.to_string()),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TypePathPattern {
        module,
        type_pattern,
    })
}

fn parse_params(src: &str) -> Result<Vec<ParamPattern>, String> {
    if src.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut params = Vec::new();
    for piece in split_top_level(src, ',') {
        let piece: String = piece.chars().filter(|c| !c.is_whitespace()).collect();
        let param = match piece.as_str() {
            "" => return Err("empty parameter pattern".to_string()),
            ".." => ParamPattern::AnyCount,
            "*" => ParamPattern::One,
            other => ParamPattern::Type(NamePattern::new(other).map_err(|e| e.to_string())?),
        };
        params.push(param);
    }
    Ok(params)
}

/// 按分隔符切分，忽略 `<>`、`()` 内部的分隔符
fn split_top_level(src: &str, sep: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (idx, c) in src.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            c if c == sep && depth == 0 => {
                pieces.push(&src[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(&src[start..]);
    pieces
}

// ============================================================================
// 切点表达式
// ============================================================================

/// 切点表达式
///
/// 用于匹配连接点
#[derive(Clone)]
pub enum PointcutExpression {
    /// 匹配所有方法
    All,

    /// execution(* app::*Service.*(..))
    Execution(ExecutionPattern),

    /// within(app::service::*)
    Within(TypePathPattern),

    /// bean(memberService)
    Bean(NamePattern),

    /// 使用正则表达式匹配类型名
    TypeRegex(Regex),

    /// 使用正则表达式匹配方法名
    MethodRegex(Regex),

    /// 自定义匹配函数
    Custom(Arc<dyn Fn(&JoinPoint) -> bool + Send + Sync>),

    And(Box<PointcutExpression>, Box<PointcutExpression>),

    Or(Box<PointcutExpression>, Box<PointcutExpression>),

    Not(Box<PointcutExpression>),
}

impl PointcutExpression {
    /// 解析完整的切点表达式
    pub fn parse(expression: &str) -> AopResult<Self> {
        let mut parser = Parser {
            src: expression,
            pos: 0,
        };
        let expr = parser.parse_or()?;
        parser.skip_ws();
        if parser.pos != expression.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(expr)
    }

    /// 只解析 execution 的括号内部分
    ///
    /// 例如：`execution("* UserService.get_user(..)")`
    pub fn execution(body: &str) -> AopResult<Self> {
        ExecutionPattern::parse(body).map(PointcutExpression::Execution)
    }

    /// 检查连接点是否匹配
    pub fn matches(&self, join_point: &JoinPoint) -> bool {
        match self {
            PointcutExpression::All => true,
            PointcutExpression::Execution(pattern) => pattern.matches(join_point),
            PointcutExpression::Within(pattern) => pattern.matches_target(join_point.target()),
            PointcutExpression::Bean(pattern) => join_point
                .target()
                .bean_name()
                .map(|name| pattern.matches(name))
                .unwrap_or(false),
            PointcutExpression::TypeRegex(regex) => regex.is_match(join_point.target().type_name()),
            PointcutExpression::MethodRegex(regex) => regex.is_match(join_point.method_name()),
            PointcutExpression::Custom(func) => func(join_point),
            PointcutExpression::And(left, right) => left.matches(join_point) && right.matches(join_point),
            PointcutExpression::Or(left, right) => left.matches(join_point) || right.matches(join_point),
            PointcutExpression::Not(expr) => !expr.matches(join_point),
        }
    }

    /// 仅根据目标类型判断是否可能匹配
    ///
    /// 创建代理时调用；方法名、参数、返回值未知的部分视为可能匹配，
    /// 所以返回 false 时一定不会匹配任何调用。
    pub fn may_match_target(&self, target: &Target) -> bool {
        match self {
            PointcutExpression::All => true,
            PointcutExpression::Execution(pattern) => pattern.may_match_target(target),
            PointcutExpression::Within(pattern) => pattern.matches_target(target),
            PointcutExpression::Bean(pattern) => target
                .bean_name()
                .map(|name| pattern.matches(name))
                .unwrap_or(false),
            PointcutExpression::TypeRegex(regex) => regex.is_match(target.type_name()),
            PointcutExpression::MethodRegex(_) | PointcutExpression::Custom(_) => true,
            PointcutExpression::And(left, right) => {
                left.may_match_target(target) && right.may_match_target(target)
            }
            PointcutExpression::Or(left, right) => {
                left.may_match_target(target) || right.may_match_target(target)
            }
            PointcutExpression::Not(_) => true,
        }
    }

    /// 匹配结果是否只由目标类型和方法签名决定
    ///
    /// 自定义函数可能检查参数值，不能按签名缓存
    pub fn is_static(&self) -> bool {
        match self {
            PointcutExpression::Custom(_) => false,
            PointcutExpression::And(left, right) | PointcutExpression::Or(left, right) => {
                left.is_static() && right.is_static()
            }
            PointcutExpression::Not(expr) => expr.is_static(),
            _ => true,
        }
    }

    /// 与运算
    pub fn and(self, other: PointcutExpression) -> Self {
        PointcutExpression::And(Box::new(self), Box::new(other))
    }

    /// 或运算
    pub fn or(self, other: PointcutExpression) -> Self {
        PointcutExpression::Or(Box::new(self), Box::new(other))
    }

    /// 非运算
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        PointcutExpression::Not(Box::new(self))
    }
}

impl FromStr for PointcutExpression {
    type Err = AopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for PointcutExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointcutExpression::All => write!(f, "All"),
            PointcutExpression::Execution(p) => write!(f, "{:?}", p),
            PointcutExpression::Within(p) => write!(f, "Within({:?})", p),
            PointcutExpression::Bean(p) => write!(f, "Bean({:?})", p),
            PointcutExpression::TypeRegex(r) => write!(f, "TypeRegex({})", r.as_str()),
            PointcutExpression::MethodRegex(r) => write!(f, "MethodRegex({})", r.as_str()),
            PointcutExpression::Custom(_) => write!(f, "Custom(...)"),
            PointcutExpression::And(l, r) => write!(f, "And({:?}, {:?})", l, r),
            PointcutExpression::Or(l, r) => write!(f, "Or({:?}, {:?})", l, r),
            PointcutExpression::Not(e) => write!(f, "Not({:?})", e),
        }
    }
}

/// 递归下降解析器
struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn error(&self, reason: &str) -> AopError {
        AopError::invalid_pointcut(self.src, format!("{} at offset {}", reason, self.pos))
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    /// 关键字后必须是空白或括号
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        self.skip_ws();
        let rest = self.rest();
        let boundary = rest
            .strip_prefix(keyword)
            .map(|after| after.starts_with(|c: char| c.is_whitespace() || c == '(' || c == '!'))
            .unwrap_or(false);
        if boundary {
            self.pos += keyword.len();
        }
        boundary
    }

    fn parse_or(&mut self) -> AopResult<PointcutExpression> {
        let mut expr = self.parse_and()?;
        while self.eat("||") || self.eat_keyword("or") {
            let right = self.parse_and()?;
            expr = expr.or(right);
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> AopResult<PointcutExpression> {
        let mut expr = self.parse_unary()?;
        while self.eat("&&") || self.eat_keyword("and") {
            let right = self.parse_unary()?;
            expr = expr.and(right);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> AopResult<PointcutExpression> {
        if self.eat("!") || self.eat_keyword("not") {
            return Ok(self.parse_unary()?.not());
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> AopResult<PointcutExpression> {
        if self.eat("(") {
            let expr = self.parse_or()?;
            if !self.eat(")") {
                return Err(self.error("expected `)`"));
            }
            return Ok(expr);
        }
        if self.eat("*") {
            return Ok(PointcutExpression::All);
        }

        self.skip_ws();
        let rest = self.rest();
        let ident_len = rest
            .find(|c: char| !(c.is_ascii_alphabetic() || c == '_'))
            .unwrap_or(rest.len());
        let ident = &rest[..ident_len];
        if ident.is_empty() {
            return Err(self.error("expected a pointcut designator"));
        }
        self.pos += ident_len;

        if !self.eat("(") {
            return Err(self.error(&format!("expected `(` after `{}`", ident)));
        }
        let body = self.balanced_body()?;
        let invalid = |reason: String| AopError::invalid_pointcut(self.src, reason);

        match ident {
            "execution" => PointcutExpression::execution(body),
            "within" => {
                let tokens = tokenize_path(body.trim()).map_err(invalid)?;
                type_path_from_tokens(tokens)
                    .map(PointcutExpression::Within)
                    .map_err(invalid)
            }
            "bean" => NamePattern::new(body.trim())
                .map(PointcutExpression::Bean)
                .map_err(|e| invalid(e.to_string())),
            other => Err(self.error(&format!("unknown designator `{}`", other))),
        }
    }

    /// 读取到与已消费的 `(` 配对的 `)`，返回中间部分
    fn balanced_body(&mut self) -> AopResult<&'a str> {
        let start = self.pos;
        let mut depth = 1usize;
        for (offset, c) in self.rest().char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        let body = &self.src[start..start + offset];
                        self.pos = start + offset + 1;
                        return Ok(body);
                    }
                }
                _ => {}
            }
        }
        Err(self.error("unbalanced parentheses"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::joinpoint::Target;
    use std::collections::HashMap;

    mod shop {
        pub mod service {
            #[derive(Debug)]
            pub struct OrderService;

            #[derive(Debug)]
            pub struct OrderRepository;

            pub mod admin {
                #[derive(Debug)]
                pub struct AuditService;
            }
        }
    }

    use shop::service::admin::AuditService;
    use shop::service::{OrderRepository, OrderService};

    const SERVICE_MODULE: &str = "weft_aop::pointcut::tests::shop::service";

    fn jp<S: std::any::Any + Send + Sync>(target: S, method: &'static str, args: Vec<crate::Arg>) -> JoinPoint {
        JoinPoint::new(Target::new(Arc::new(target)), method, args)
    }

    fn parse(expr: &str) -> PointcutExpression {
        PointcutExpression::parse(expr).unwrap_or_else(|e| panic!("{expr}: {e}"))
    }

    #[test]
    fn test_name_pattern() {
        let p = NamePattern::new("*Service").unwrap();
        assert!(p.matches("OrderService"));
        assert!(!p.matches("OrderServiceImpl"));
        assert!(NamePattern::new("find*").unwrap().matches("find_all"));
        assert!(NamePattern::new("*").unwrap().matches(""));
        // 其它正则元字符按字面量处理
        assert!(NamePattern::new("Vec<*>").unwrap().matches("Vec<u8>"));
        assert!(!NamePattern::new("a.c").unwrap().matches("abc"));
    }

    #[test]
    fn test_service_suffix_in_exact_module() {
        let expr = parse(&format!("execution(* {}::*Service.*(..))", SERVICE_MODULE));

        assert!(expr.matches(&jp(OrderService, "place", args![])));
        assert!(expr.matches(&jp(OrderService, "place", args![1_u32, "x"])));
        assert!(!expr.matches(&jp(OrderRepository, "place", args![])));
        // 子模块不在范围内
        assert!(!expr.matches(&jp(AuditService, "audit", args![])));
    }

    #[test]
    fn test_any_depth_module() {
        let dotted = parse("execution(* weft_aop..*Service.*(..))");
        let coloned = parse("execution(* weft_aop::..::*Service.*(..))");

        for expr in [&dotted, &coloned] {
            assert!(expr.matches(&jp(OrderService, "place", args![])));
            assert!(expr.matches(&jp(AuditService, "audit", args![])));
            assert!(!expr.matches(&jp(OrderRepository, "save", args![])));
        }

        let other_crate = parse("execution(* other_crate..*Service.*(..))");
        assert!(!other_crate.matches(&jp(OrderService, "place", args![])));
    }

    #[test]
    fn test_type_without_module_matches_everywhere() {
        let expr = parse("execution(* *Service.*(..))");
        assert!(expr.matches(&jp(OrderService, "place", args![])));
        assert!(expr.matches(&jp(AuditService, "audit", args![])));

        let any_method = parse("execution(* *(..))");
        assert!(any_method.matches(&jp(OrderRepository, "save", args![])));
    }

    #[test]
    fn test_parameter_patterns() {
        let none = parse("execution(* *Service.*())");
        let one = parse("execution(* *Service.*(*))");
        let at_least_one = parse("execution(* *Service.*(*, ..))");
        let typed = parse("execution(* *Service.*(i64, ..))");
        let last_string = parse("execution(* *Service.*(.., String))");

        let zero = jp(OrderService, "m", args![]);
        let single = jp(OrderService, "m", args![5_i64]);
        let pair = jp(OrderService, "m", args![5_i64, String::from("s")]);

        assert!(none.matches(&zero) && !none.matches(&single));
        assert!(one.matches(&single) && !one.matches(&zero) && !one.matches(&pair));
        assert!(at_least_one.matches(&single) && at_least_one.matches(&pair) && !at_least_one.matches(&zero));
        assert!(typed.matches(&pair) && !typed.matches(&zero));
        assert!(!typed.matches(&jp(OrderService, "m", args![5_u8])));
        assert!(last_string.matches(&pair) && !last_string.matches(&single));
    }

    #[test]
    fn test_method_and_return_patterns() {
        let find = parse("execution(* *Service.find*(..))");
        assert!(find.matches(&jp(OrderService, "find_all", args![])));
        assert!(!find.matches(&jp(OrderService, "save", args![])));

        let returns_map = parse("execution(HashMap<i64, *> *Service.*(..))");
        let map_call = jp(OrderService, "find_all", args![])
            .with_return_type(std::any::type_name::<HashMap<i64, String>>());
        let unit_call = jp(OrderService, "save", args![]).with_return_type(std::any::type_name::<()>());
        assert!(returns_map.matches(&map_call));
        assert!(!returns_map.matches(&unit_call));
        // 返回类型未知时只有 `*` 能匹配
        assert!(!returns_map.matches(&jp(OrderService, "find_all", args![])));
    }

    #[test]
    fn test_visibility_is_accepted() {
        for expr in [
            "execution(public * *Service.*(..))",
            "execution(pub * *Service.*(..))",
            "execution(pub(crate) * *Service.*(..))",
            "execution(private * *Service.*(..))",
        ] {
            assert!(parse(expr).matches(&jp(OrderService, "place", args![])), "{expr}");
        }
    }

    #[test]
    fn test_combinators() {
        let expr = parse("execution(* *Service.*(..)) && !execution(* *.audit(..))");
        assert!(expr.matches(&jp(OrderService, "place", args![])));
        assert!(!expr.matches(&jp(AuditService, "audit", args![])));

        let either = parse("within(*Repository) or (execution(* *.audit(..)))");
        assert!(either.matches(&jp(OrderRepository, "save", args![])));
        assert!(either.matches(&jp(AuditService, "audit", args![])));
        assert!(!either.matches(&jp(OrderService, "place", args![])));

        assert!(parse("*").matches(&jp(OrderRepository, "save", args![])));
        assert!(parse("not within(*Service)").matches(&jp(OrderRepository, "save", args![])));
    }

    #[test]
    fn test_bean_designator() {
        let expr = parse("bean(order*)");
        let named = JoinPoint::new(Target::new(Arc::new(OrderService)).with_bean_name("orderService"), "place", args![]);
        assert!(expr.matches(&named));
        assert!(!expr.matches(&jp(OrderService, "place", args![])));
    }

    #[test]
    fn test_may_match_target() {
        let expr = parse(&format!("execution(* {}::*Service.find*(*))", SERVICE_MODULE));
        assert!(expr.may_match_target(&Target::new(Arc::new(OrderService))));
        assert!(!expr.may_match_target(&Target::new(Arc::new(OrderRepository))));

        let negated = parse("!within(*Service)");
        assert!(negated.may_match_target(&Target::new(Arc::new(OrderService))));

        let custom = PointcutExpression::Custom(Arc::new(|jp: &JoinPoint| jp.args().len() == 2));
        assert!(custom.may_match_target(&Target::new(Arc::new(OrderRepository))));
        assert!(!custom.matches(&jp(OrderRepository, "save", args![])));
    }

    #[test]
    fn test_programmatic_builders() {
        let expr = PointcutExpression::TypeRegex(Regex::new("^Order").unwrap())
            .and(PointcutExpression::MethodRegex(Regex::new("^place$").unwrap()))
            .or(PointcutExpression::execution("* AuditService.*(..)").unwrap());

        assert!(expr.matches(&jp(OrderService, "place", args![])));
        assert!(!expr.matches(&jp(OrderRepository, "save", args![])));
        assert!(expr.matches(&jp(AuditService, "audit", args![])));
    }

    #[test]
    fn test_invalid_expressions() {
        for expr in [
            "",
            "execution(* *Service.*(..)",
            "execution(*Service.*(..))",
            "execution(* *Service.*)",
            "execution(* a::::B.c(..))",
            "execution(* *Service.*(, ..))",
            "around(* *.*(..))",
            "execution(* *Service.*(..)) &&",
            "execution(* *Service.*(..)) extra",
            "execution(*\u{3000}a::::B.c(..))",
        ] {
            let err = PointcutExpression::parse(expr).unwrap_err();
            assert!(matches!(err, AopError::InvalidPointcut { .. }), "{expr}");
        }
    }

    #[test]
    fn test_unicode_whitespace_separates_return_pattern() {
        let expr = parse("execution(*\u{3000}*Service.*(..))");
        assert!(expr.matches(&jp(OrderService, "place", args![])));
        assert!(!expr.matches(&jp(OrderRepository, "save", args![])));
    }

    #[test]
    fn test_debug_output() {
        let expr = parse("execution(* *Service.*(..)) && bean(member*)");
        assert_eq!(format!("{:?}", expr), "And(execution(* *Service.*(..)), Bean(member*))");
    }
}
