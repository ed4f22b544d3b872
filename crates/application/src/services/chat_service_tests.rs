//! 聊天服务单元测试
//!
//! 使用 mockall 生成的存储替身，覆盖注册、发消息、消息列表与心跳的业务规则。

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::{TimeZone, Utc};
use domain::{
    DomainError, Message, MessageKind, MockMessageRepository, MockParticipantRepository,
    Participant, RegisterParticipant, RepositoryError, SendMessage, ARRIVAL_TEXT,
};

use crate::{
    clock::ManualClock,
    error::ApplicationError,
    services::{ChatService, ChatServiceDependencies},
    sweeper::{InactivitySweeper, SweeperDependencies, SweeperSettings},
};

fn build_service(
    participants: MockParticipantRepository,
    messages: MockMessageRepository,
) -> (ChatService, Arc<InactivitySweeper>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    ));
    // 清理任务使用独立的空替身，首个周期在测试结束前不会触发
    let sweeper = Arc::new(InactivitySweeper::new(SweeperDependencies {
        participant_repository: Arc::new(MockParticipantRepository::new()),
        message_repository: Arc::new(MockMessageRepository::new()),
        clock: clock.clone(),
        settings: SweeperSettings::default(),
    }));

    let service = ChatService::new(ChatServiceDependencies {
        participant_repository: Arc::new(participants),
        message_repository: Arc::new(messages),
        clock,
        sweeper: sweeper.clone(),
        store_timeout: Duration::from_secs(1),
    });
    (service, sweeper)
}

fn recording_messages() -> (MockMessageRepository, Arc<Mutex<Vec<Message>>>) {
    let written = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&written);
    let mut messages = MockMessageRepository::new();
    messages.expect_insert().returning(move |message| {
        sink.lock().unwrap().push(message);
        Ok(())
    });
    (messages, written)
}

#[tokio::test]
async fn register_creates_participant_and_arrival_message() {
    let mut participants = MockParticipantRepository::new();
    participants.expect_find_by_name().times(1).returning(|name| {
        assert_eq!(name, "alice");
        Ok(None)
    });
    participants
        .expect_insert()
        .times(1)
        .returning(|participant| {
            assert_eq!(participant.name, "alice");
            Ok(())
        });
    let (messages, written) = recording_messages();

    let (service, sweeper) = build_service(participants, messages);
    let registered = service
        .register(RegisterParticipant::new(" alice "))
        .await
        .unwrap();

    assert_eq!(registered.name, "alice");
    let written = written.lock().unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].text, ARRIVAL_TEXT);
    assert_eq!(written[0].kind, MessageKind::Status);
    assert!(written[0].is_broadcast());
    assert!(sweeper.is_running());
    sweeper.shutdown();
}

#[tokio::test]
async fn register_existing_name_is_a_conflict() {
    let mut participants = MockParticipantRepository::new();
    participants
        .expect_find_by_name()
        .returning(|name| Ok(Some(Participant::join(name, 0))));
    participants.expect_insert().never();
    let mut messages = MockMessageRepository::new();
    messages.expect_insert().never();

    let (service, sweeper) = build_service(participants, messages);
    let err = service
        .register(RegisterParticipant::new("alice"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::NameTaken { ref name }) if name == "alice"
    ));
    assert!(!sweeper.is_running());
}

#[tokio::test]
async fn register_race_lost_at_insert_is_a_conflict() {
    let mut participants = MockParticipantRepository::new();
    participants.expect_find_by_name().returning(|_| Ok(None));
    participants
        .expect_insert()
        .returning(|_| Err(RepositoryError::Conflict));
    let mut messages = MockMessageRepository::new();
    messages.expect_insert().never();

    let (service, _sweeper) = build_service(participants, messages);
    let err = service
        .register(RegisterParticipant::new("alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApplicationError::Domain(DomainError::NameTaken { .. })));
}

#[tokio::test]
async fn arrival_failure_rolls_back_registration() {
    let stored: Arc<Mutex<Option<Participant>>> = Arc::new(Mutex::new(None));

    let mut participants = MockParticipantRepository::new();
    let lookup = Arc::clone(&stored);
    participants
        .expect_find_by_name()
        .returning(move |_| Ok(lookup.lock().unwrap().clone()));
    let insert = Arc::clone(&stored);
    participants.expect_insert().times(2).returning(move |participant| {
        *insert.lock().unwrap() = Some(participant);
        Ok(())
    });
    let removal = Arc::clone(&stored);
    participants
        .expect_delete_if_stale()
        .times(1)
        .returning(move |name, observed| {
            let mut guard = removal.lock().unwrap();
            assert_eq!(name, "alice");
            assert_eq!(guard.as_ref().map(|p| p.last_status), Some(observed));
            *guard = None;
            Ok(true)
        });

    let attempts = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&attempts);
    let mut messages = MockMessageRepository::new();
    messages.expect_insert().times(2).returning(move |_| {
        let mut count = counter.lock().unwrap();
        *count += 1;
        if *count == 1 {
            Err(RepositoryError::storage("down"))
        } else {
            Ok(())
        }
    });

    let (service, sweeper) = build_service(participants, messages);

    let err = service
        .register(RegisterParticipant::new("alice"))
        .await
        .unwrap_err();
    assert!(err.is_internal());
    assert!(stored.lock().unwrap().is_none());
    assert!(sweeper.is_running());

    let registered = service
        .register(RegisterParticipant::new("alice"))
        .await
        .unwrap();
    assert_eq!(registered.name, "alice");
    assert!(stored.lock().unwrap().is_some());
    sweeper.shutdown();
}

#[tokio::test]
async fn invalid_name_never_reaches_the_store() {
    let (service, _sweeper) = build_service(
        MockParticipantRepository::new(),
        MockMessageRepository::new(),
    );

    for name in ["", "no spaces", "abcdefghijklmnopqrstu", "ação"] {
        let err = service
            .register(RegisterParticipant::new(name))
            .await
            .unwrap_err();
        assert!(
            matches!(err, ApplicationError::Domain(DomainError::Validation { .. })),
            "name: {name:?}"
        );
    }
}

#[tokio::test]
async fn unregistered_sender_creates_no_message() {
    let mut participants = MockParticipantRepository::new();
    participants.expect_find_by_name().returning(|_| Ok(None));
    let mut messages = MockMessageRepository::new();
    messages.expect_insert().never();

    let (service, _sweeper) = build_service(participants, messages);
    let err = service
        .send_message("ghost", SendMessage::new("Todos", "boo", None))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::SenderNotRegistered { ref name }) if name == "ghost"
    ));
}

#[tokio::test]
async fn invalid_body_is_rejected_before_sender_lookup() {
    let (service, _sweeper) = build_service(
        MockParticipantRepository::new(),
        MockMessageRepository::new(),
    );

    let err = service
        .send_message("alice", SendMessage::new("Todos", "oi", Some("status")))
        .await
        .unwrap_err();
    assert!(matches!(err, ApplicationError::Domain(DomainError::Validation { .. })));
}

#[tokio::test]
async fn sent_message_is_sanitized_and_attributed() {
    let mut participants = MockParticipantRepository::new();
    participants
        .expect_find_by_name()
        .returning(|name| Ok(Some(Participant::join(name, 0))));
    let (messages, written) = recording_messages();

    let (service, _sweeper) = build_service(participants, messages);
    let stored = service
        .send_message(
            "alice",
            SendMessage::new("bob", "<b>hi</b>", Some("private_message")),
        )
        .await
        .unwrap();

    assert_eq!(stored.from, "alice");
    assert_eq!(stored.to, "bob");
    assert_eq!(stored.text, "hi");
    assert_eq!(stored.kind, MessageKind::PrivateMessage);
    assert_eq!(written.lock().unwrap().as_slice(), &[stored]);
}

#[tokio::test]
async fn list_messages_keeps_the_most_recent() {
    let mut messages = MockMessageRepository::new();
    messages.expect_list_visible_to().returning(|user| {
        assert_eq!(user, "bob");
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Ok((0..60)
            .map(|i| Message::new("alice", "Todos", format!("m{i}"), MessageKind::Message, at))
            .collect())
    });

    let (service, _sweeper) = build_service(MockParticipantRepository::new(), messages);

    let page = service.list_messages("bob", Some(10)).await.unwrap();
    assert_eq!(page.len(), 10);
    assert_eq!(page.first().unwrap().text, "m50");
    assert_eq!(page.last().unwrap().text, "m59");

    let all = service.list_messages("bob", None).await.unwrap();
    assert_eq!(all.len(), 60);
}

#[tokio::test]
async fn heartbeat_for_unknown_user_is_not_found() {
    let mut participants = MockParticipantRepository::new();
    participants.expect_touch().returning(|_, _| Ok(false));

    let (service, _sweeper) = build_service(participants, MockMessageRepository::new());
    let err = service.heartbeat("nobody").await.unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::ParticipantNotFound { .. })
    ));
}

#[tokio::test]
async fn heartbeat_touches_with_current_time() {
    let expected = Utc
        .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
        .unwrap()
        .timestamp_millis();
    let mut participants = MockParticipantRepository::new();
    participants
        .expect_touch()
        .times(1)
        .returning(move |name, at| {
            assert_eq!(name, "alice");
            assert_eq!(at, expected);
            Ok(true)
        });

    let (service, _sweeper) = build_service(participants, MockMessageRepository::new());
    service.heartbeat("alice").await.unwrap();
}

#[tokio::test]
async fn store_failure_is_internal() {
    let mut participants = MockParticipantRepository::new();
    participants
        .expect_list_all()
        .returning(|| Err(RepositoryError::storage("connection refused")));

    let (service, _sweeper) = build_service(participants, MockMessageRepository::new());
    let err = service.list_participants().await.unwrap_err();
    assert!(err.is_internal());
}

#[tokio::test]
async fn timeout_applies_to_store_calls() {
    struct SlowMessages;

    #[async_trait::async_trait]
    impl domain::MessageRepository for SlowMessages {
        async fn insert(&self, _message: Message) -> domain::RepositoryResult<()> {
            Ok(())
        }

        async fn list_visible_to(&self, _user: &str) -> domain::RepositoryResult<Vec<Message>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }
    }

    let clock = Arc::new(ManualClock::default());
    let sweeper = Arc::new(InactivitySweeper::new(SweeperDependencies {
        participant_repository: Arc::new(MockParticipantRepository::new()),
        message_repository: Arc::new(MockMessageRepository::new()),
        clock: clock.clone(),
        settings: SweeperSettings::default(),
    }));
    let service = ChatService::new(ChatServiceDependencies {
        participant_repository: Arc::new(MockParticipantRepository::new()),
        message_repository: Arc::new(SlowMessages),
        clock,
        sweeper,
        store_timeout: Duration::from_millis(20),
    });

    let err = service.list_messages("bob", None).await.unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::Repository(RepositoryError::Timeout(_))
    ));
}
