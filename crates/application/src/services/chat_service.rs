use std::{sync::Arc, time::Duration};

use domain::{
    take_last, DomainError, Message, MessageRepository, Participant, ParticipantRepository,
    RegisterParticipant, RepositoryError, SendMessage,
};

use crate::{
    clock::Clock, dto::RegisteredParticipant, error::ApplicationError, store::bounded,
    sweeper::InactivitySweeper,
};

pub struct ChatServiceDependencies {
    pub participant_repository: Arc<dyn ParticipantRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub clock: Arc<dyn Clock>,
    pub sweeper: Arc<InactivitySweeper>,
    pub store_timeout: Duration,
}

/// 聊天室用例：注册、参与者列表、消息列表、发消息、心跳
pub struct ChatService {
    deps: ChatServiceDependencies,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn register(
        &self,
        request: RegisterParticipant,
    ) -> Result<RegisteredParticipant, ApplicationError> {
        let name = request.into_valid_name()?;
        let timeout = self.deps.store_timeout;

        if bounded(timeout, self.deps.participant_repository.find_by_name(&name))
            .await?
            .is_some()
        {
            return Err(DomainError::name_taken(name).into());
        }

        let now = self.deps.clock.now();
        let participant = Participant::join(name.as_str(), now.timestamp_millis());

        // 并发注册同名时由存储层的唯一约束兜底
        match bounded(timeout, self.deps.participant_repository.insert(participant)).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict) => return Err(DomainError::name_taken(name).into()),
            Err(err) => return Err(err.into()),
        }

        self.deps.sweeper.ensure_running();

        let arrival = bounded(
            timeout,
            self.deps
                .message_repository
                .insert(Message::arrival(name.as_str(), now)),
        )
        .await;

        if let Err(err) = arrival {
            // 撤销注册，保证参与者与加入消息同时存在
            let rollback = bounded(
                timeout,
                self.deps
                    .participant_repository
                    .delete_if_stale(&name, now.timestamp_millis()),
            )
            .await;
            if let Err(rollback_err) = rollback {
                tracing::error!(
                    participant = %name,
                    error = %rollback_err,
                    "failed to roll back participant after arrival message failure"
                );
            }
            return Err(err.into());
        }

        tracing::info!(participant = %name, "参与者加入聊天室");
        Ok(RegisteredParticipant { name })
    }

    pub async fn list_participants(&self) -> Result<Vec<Participant>, ApplicationError> {
        let participants = bounded(
            self.deps.store_timeout,
            self.deps.participant_repository.list_all(),
        )
        .await?;
        Ok(participants)
    }

    /// 返回 `user` 可见的消息；给出 `limit` 时只保留最后 `limit` 条
    pub async fn list_messages(
        &self,
        user: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Message>, ApplicationError> {
        let visible = bounded(
            self.deps.store_timeout,
            self.deps.message_repository.list_visible_to(user),
        )
        .await?;
        Ok(take_last(visible, limit))
    }

    pub async fn send_message(
        &self,
        user: &str,
        request: SendMessage,
    ) -> Result<Message, ApplicationError> {
        let outgoing = request.into_outgoing()?;
        let timeout = self.deps.store_timeout;

        if bounded(timeout, self.deps.participant_repository.find_by_name(user))
            .await?
            .is_none()
        {
            return Err(DomainError::sender_not_registered(user).into());
        }

        let message = Message::new(
            user,
            outgoing.to,
            outgoing.text,
            outgoing.kind,
            self.deps.clock.now(),
        );
        bounded(timeout, self.deps.message_repository.insert(message.clone())).await?;

        tracing::debug!(from = %message.from, to = %message.to, kind = %message.kind, "Message stored");
        Ok(message)
    }

    pub async fn heartbeat(&self, user: &str) -> Result<(), ApplicationError> {
        let now_millis = self.deps.clock.now_millis();
        let found = bounded(
            self.deps.store_timeout,
            self.deps.participant_repository.touch(user, now_millis),
        )
        .await?;

        if !found {
            return Err(DomainError::participant_not_found(user).into());
        }
        Ok(())
    }
}
