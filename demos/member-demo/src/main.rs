use anyhow::{Context, Result};
use member_demo::aspect::ASPECT_MEMBER_ID;
use member_demo::{MemberRepository, MemberService};
use std::path::Path;
use std::sync::Arc;
use weft_aop::prelude::*;
use weft_core::prelude::*;

const CONFIG_FILE: &str = "application.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let environment = Arc::new(load_environment()?);
    LoggingConfig::from_environment(&environment).init()?;

    let context = ApplicationContext::new(Arc::clone(&environment));
    let factory = ProxyFactory::from_environment(&environment)?;

    let repository = Arc::new(MemberRepository::with_sample_data());
    context.register_singleton("memberRepository", Arc::clone(&repository))?;
    let members = context.register_advised(&factory, "memberService", MemberService::new(repository))?;

    tracing::info!("🚀 {} started", environment.get_string_or("app.name", "member-demo"));

    println!("==================== find_all_members ====================");
    let all = advised!(members => find_all_members()).await?;
    println!(
        "caller received {} member(s), id {} present: {}",
        all.len(),
        ASPECT_MEMBER_ID,
        all.contains_key(&ASPECT_MEMBER_ID)
    );

    println!("==================== find_member_by ====================");
    let id = 1_i64;
    let member = advised!(members => async find_member_by(id)).await?;
    println!("caller received {:?}", member);

    println!("==================== find_member_by (missing) ====================");
    let missing = 99_i64;
    match advised!(members => async find_member_by(missing)).await {
        Ok(member) => println!("unexpected member {:?}", member),
        Err(e) => println!("caller received error: {}", e),
    }

    println!("==================== count_members ====================");
    let count = advised!(members => count_members()).await?;
    println!("caller received {}", count);

    context.shutdown();
    Ok(())
}

/// application.toml（可用 WEFT_CONFIG 指定）+ APP_ 前缀的环境变量
fn load_environment() -> Result<Environment> {
    let environment = Environment::new();

    let path = std::env::var("WEFT_CONFIG").unwrap_or_else(|_| CONFIG_FILE.to_string());
    if Path::new(&path).exists() {
        let source = TomlPropertySource::from_file(&path).with_context(|| format!("loading {}", path))?;
        environment.add_property_source(Box::new(source));
    }
    environment.add_property_source(Box::new(EnvironmentPropertySource::new("APP_")));

    Ok(environment)
}
