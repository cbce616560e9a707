//! 会员服务与日志切面

pub mod aspect;
pub mod member;

pub use aspect::{LoggingAspect, LOGGING_POINTCUT};
pub use member::{MemberDto, MemberRepository, MemberService, ServiceError};
