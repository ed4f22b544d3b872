//! 存储接口
//!
//! 参与者与消息两个集合的抽象，由基础设施层提供 Postgres 与内存实现。

use async_trait::async_trait;

use crate::{errors::RepositoryResult, message::Message, participant::Participant};

#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    /// 名称已存在时返回 `RepositoryError::Conflict`
    async fn insert(&self, participant: Participant) -> RepositoryResult<()>;

    async fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Participant>>;

    async fn list_all(&self) -> RepositoryResult<Vec<Participant>>;

    /// 把 `last_status` 推进到 `at`；参与者不存在时返回 `false`
    async fn touch(&self, name: &str, at: i64) -> RepositoryResult<bool>;

    /// 仅当 `last_status` 仍等于扫描时看到的值才删除，返回是否删除
    async fn delete_if_stale(&self, name: &str, observed_last_status: i64)
        -> RepositoryResult<bool>;
}

#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn insert(&self, message: Message) -> RepositoryResult<()>;

    /// 按写入顺序返回对 `user` 可见的消息
    async fn list_visible_to(&self, user: &str) -> RepositoryResult<Vec<Message>>;
}
