//! 内存存储实现（用于测试与本地调试）

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use domain::{
    Message, MessageRepository, Participant, ParticipantRepository, RepositoryError,
    RepositoryResult,
};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryParticipantRepository {
    participants: RwLock<BTreeMap<String, Participant>>,
}

impl InMemoryParticipantRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ParticipantRepository for InMemoryParticipantRepository {
    async fn insert(&self, participant: Participant) -> RepositoryResult<()> {
        let mut guard = self.participants.write().await;
        if guard.contains_key(&participant.name) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(participant.name.clone(), participant);
        Ok(())
    }

    async fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Participant>> {
        let guard = self.participants.read().await;
        Ok(guard.get(name).cloned())
    }

    async fn list_all(&self) -> RepositoryResult<Vec<Participant>> {
        let guard = self.participants.read().await;
        Ok(guard.values().cloned().collect())
    }

    async fn touch(&self, name: &str, at: i64) -> RepositoryResult<bool> {
        let mut guard = self.participants.write().await;
        match guard.get_mut(name) {
            Some(participant) => {
                participant.touch(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_if_stale(
        &self,
        name: &str,
        observed_last_status: i64,
    ) -> RepositoryResult<bool> {
        let mut guard = self.participants.write().await;
        let unchanged = guard
            .get(name)
            .is_some_and(|participant| participant.last_status == observed_last_status);
        if unchanged {
            guard.remove(name);
        }
        Ok(unchanged)
    }
}

#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: RwLock<Vec<Message>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 全部消息（按写入顺序），测试断言用
    pub async fn snapshot(&self) -> Vec<Message> {
        self.messages.read().await.clone()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn insert(&self, message: Message) -> RepositoryResult<()> {
        self.messages.write().await.push(message);
        Ok(())
    }

    async fn list_visible_to(&self, user: &str) -> RepositoryResult<Vec<Message>> {
        let guard = self.messages.read().await;
        Ok(guard
            .iter()
            .filter(|message| message.is_visible_to(user))
            .cloned()
            .collect())
    }
}

/// 内存存储集合
#[derive(Clone, Default)]
pub struct MemoryStorage {
    pub participant_repository: Arc<InMemoryParticipantRepository>,
    pub message_repository: Arc<InMemoryMessageRepository>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}
