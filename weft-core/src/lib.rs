// weft-core: 拦截框架的宿主部分
//
// 提供：
// - 分层配置（TOML 文件 / 环境变量 / 内存），支持强类型绑定
// - 基于 tracing 的日志初始化
// - 按名称注册的服务上下文（代理在注册时放入）

pub mod config;
pub mod context;
pub mod error;
pub mod logging;

pub use config::{
    ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource,
    TomlPropertySource,
};
pub use context::ApplicationContext;
pub use error::{ApplicationError, ApplicationResult, ContainerError, ContainerResult, Result};
pub use logging::{LogFormat, LogLevel, LoggingConfig};

/// Prelude 模块，包含常用的类型
pub mod prelude {
    pub use crate::config::{
        ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource,
        TomlPropertySource,
    };
    pub use crate::context::ApplicationContext;
    pub use crate::error::{
        ApplicationError, ApplicationResult, ContainerError, ContainerResult, Result,
    };
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use anyhow::{anyhow, Context};
}
