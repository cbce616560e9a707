//! AOP 配置
//!
//! ```toml
//! [aop]
//! enabled = true    # false 时所有代理直接调用目标
//! autoload = true   # false 时忽略通过 inventory 注册的切面
//! ```

use crate::error::AopResult;
use serde::Deserialize;
use weft_core::Environment;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AopProperties {
    pub enabled: bool,
    pub autoload: bool,
}

impl AopProperties {
    pub const PREFIX: &'static str = "aop";

    pub fn from_environment(environment: &Environment) -> AopResult<Self> {
        Ok(environment.bind(Self::PREFIX)?)
    }
}

impl Default for AopProperties {
    fn default() -> Self {
        Self {
            enabled: true,
            autoload: true,
        }
    }
}
