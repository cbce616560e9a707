//! 会员数据与服务

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use weft_aop::AopError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDto {
    pub id: i64,
    pub name: String,
}

impl MemberDto {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Member not found: {0}")]
    MemberNotFound(i64),

    #[error("Invalid member id: {0}")]
    InvalidId(i64),

    #[error(transparent)]
    Aop(#[from] AopError),
}

/// 内存中的会员存储
///
/// 类型名不以 Service 结尾，不会被日志切面拦截
#[derive(Debug, Default)]
pub struct MemberRepository {
    members: RwLock<BTreeMap<i64, MemberDto>>,
}

impl MemberRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample_data() -> Self {
        let repository = Self::new();
        repository.save(MemberDto::new(1, "Hong Gildong"));
        repository.save(MemberDto::new(2, "Yu Gwansun"));
        repository
    }

    pub fn save(&self, member: MemberDto) -> Option<MemberDto> {
        self.members.write().insert(member.id, member)
    }

    pub fn find_all(&self) -> HashMap<i64, MemberDto> {
        self.members
            .read()
            .iter()
            .map(|(id, member)| (*id, member.clone()))
            .collect()
    }

    pub fn find_all_sorted(&self) -> BTreeMap<i64, MemberDto> {
        self.members.read().clone()
    }

    pub fn find_by_id(&self, id: i64) -> Option<MemberDto> {
        self.members.read().get(&id).cloned()
    }

    pub fn count(&self) -> usize {
        self.members.read().len()
    }
}

pub struct MemberService {
    repository: Arc<MemberRepository>,
}

impl MemberService {
    pub fn new(repository: Arc<MemberRepository>) -> Self {
        Self { repository }
    }

    pub fn find_all_members(&self) -> Result<HashMap<i64, MemberDto>, ServiceError> {
        Ok(self.repository.find_all())
    }

    pub async fn find_member_by(&self, id: i64) -> Result<MemberDto, ServiceError> {
        if id <= 0 {
            return Err(ServiceError::InvalidId(id));
        }
        self.repository
            .find_by_id(id)
            .ok_or(ServiceError::MemberNotFound(id))
    }

    /// 按 id 排序的全部会员
    pub fn find_all_members_sorted(&self) -> Result<BTreeMap<i64, MemberDto>, ServiceError> {
        Ok(self.repository.find_all_sorted())
    }

    /// 名字以 `prefix` 开头的会员，没有时返回 None
    pub fn find_members_named(&self, prefix: String) -> Result<Option<HashMap<i64, MemberDto>>, ServiceError> {
        let found: HashMap<i64, MemberDto> = self
            .repository
            .find_all()
            .into_iter()
            .filter(|(_, member)| member.name.starts_with(&prefix))
            .collect();

        Ok(if found.is_empty() { None } else { Some(found) })
    }

    pub fn count_members(&self) -> Result<usize, ServiceError> {
        Ok(self.repository.count())
    }
}
