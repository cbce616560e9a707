//! 应用上下文 - 按名称登记的单例服务
//!
//! 只负责注册与查找，不做依赖装配。拦截代理由 weft-aop 在注册时包装后放入。

use crate::config::Environment;
use crate::error::{ContainerError, ContainerResult};
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

struct BeanEntry {
    instance: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
}

/// 应用上下文
pub struct ApplicationContext {
    environment: Arc<Environment>,
    beans: RwLock<HashMap<String, BeanEntry>>,
    /// 注册顺序（关闭时逆序释放）
    order: RwLock<Vec<String>>,
}

impl ApplicationContext {
    pub fn new(environment: Arc<Environment>) -> Self {
        Self {
            environment,
            beans: RwLock::new(HashMap::new()),
            order: RwLock::new(Vec::new()),
        }
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    /// 注册单例，名称重复时报错
    pub fn register_singleton<T>(&self, name: impl Into<String>, instance: Arc<T>) -> ContainerResult<()>
    where
        T: Any + Send + Sync,
    {
        let name = name.into();
        let mut beans = self.beans.write();
        if beans.contains_key(&name) {
            return Err(ContainerError::DuplicateBean(name));
        }

        let type_name = std::any::type_name::<T>();
        tracing::debug!("Registering bean '{}' ({})", name, type_name);
        beans.insert(
            name.clone(),
            BeanEntry {
                instance,
                type_id: TypeId::of::<T>(),
                type_name,
            },
        );
        self.order.write().push(name);
        Ok(())
    }

    /// 通过名称获取 Bean
    pub fn get_bean<T>(&self, name: &str) -> ContainerResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let beans = self.beans.read();
        let entry = beans
            .get(name)
            .ok_or_else(|| ContainerError::BeanNotFound(name.to_string()))?;

        Arc::clone(&entry.instance)
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
                actual: entry.type_name,
            })
    }

    /// 通过类型获取 Bean，要求该类型恰好注册了一个
    pub fn get_bean_by_type<T>(&self) -> ContainerResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let type_name = std::any::type_name::<T>();
        let beans = self.beans.read();
        let candidates: Vec<&String> = beans
            .iter()
            .filter(|(_, entry)| entry.type_id == TypeId::of::<T>())
            .map(|(name, _)| name)
            .collect();

        match candidates.len() {
            0 => Err(ContainerError::NoBeanOfType(type_name)),
            1 => {
                let name = candidates[0].clone();
                drop(candidates);
                drop(beans);
                self.get_bean(&name)
            }
            _ => {
                let mut names: Vec<String> = candidates.into_iter().cloned().collect();
                names.sort();
                Err(ContainerError::NoUniqueBean {
                    type_name,
                    candidates: names,
                })
            }
        }
    }

    pub fn contains_bean(&self, name: &str) -> bool {
        self.beans.read().contains_key(name)
    }

    pub fn bean_names(&self) -> Vec<String> {
        self.order.read().clone()
    }

    /// 按注册的逆序释放所有 Bean
    pub fn shutdown(&self) {
        let names: Vec<String> = self.order.write().drain(..).rev().collect();
        let mut beans = self.beans.write();
        for name in names {
            if beans.remove(&name).is_some() {
                tracing::debug!("Released bean '{}'", name);
            }
        }
        tracing::info!("ApplicationContext closed");
    }
}

impl Default for ApplicationContext {
    fn default() -> Self {
        Self::new(Arc::new(Environment::new()))
    }
}
