#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use application::{
    ChatService, ChatServiceDependencies, InactivitySweeper, ManualClock, SweeperDependencies,
    SweeperSettings,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use domain::{
    Message, MessageRepository, Participant, ParticipantRepository, RepositoryError,
    RepositoryResult,
};
use infrastructure::MemoryStorage;
use serde_json::{json, Value};
use tower::ServiceExt;
use web_api::{router, AppState};

/// 基于内存存储与手动时钟的完整应用
pub struct TestApp {
    pub router: Router,
    pub storage: MemoryStorage,
    pub clock: Arc<ManualClock>,
    pub sweeper: Arc<InactivitySweeper>,
}

impl TestApp {
    pub fn new() -> Self {
        let storage = MemoryStorage::new();
        Self::with_repositories(
            storage.clone(),
            storage.participant_repository.clone(),
            storage.message_repository.clone(),
        )
    }

    /// 所有存储调用都失败的应用
    pub fn with_failing_store() -> Self {
        let store = Arc::new(FailingStore);
        Self::with_repositories(MemoryStorage::new(), store.clone(), store)
    }

    fn with_repositories(
        storage: MemoryStorage,
        participants: Arc<dyn ParticipantRepository>,
        messages: Arc<dyn MessageRepository>,
    ) -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ));

        let sweeper = Arc::new(InactivitySweeper::new(SweeperDependencies {
            participant_repository: participants.clone(),
            message_repository: messages.clone(),
            clock: clock.clone(),
            settings: SweeperSettings::default(),
        }));

        let chat_service = Arc::new(ChatService::new(ChatServiceDependencies {
            participant_repository: participants,
            message_repository: messages,
            clock: clock.clone(),
            sweeper: sweeper.clone(),
            store_timeout: Duration::from_secs(1),
        }));

        Self {
            router: router(AppState::new(chat_service)),
            storage,
            clock,
            sweeper,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("request");
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));
        (status, body)
    }

    pub async fn register(&self, name: &str) -> StatusCode {
        let (status, _) = self
            .send(json_request("POST", "/participants", None, json!({ "name": name })))
            .await;
        status
    }

    pub async fn post_message(&self, user: &str, body: Value) -> StatusCode {
        let (status, _) = self
            .send(json_request("POST", "/messages", Some(user), body))
            .await;
        status
    }

    pub async fn messages(&self, user: &str, query: &str) -> Vec<Value> {
        let (status, body) = self
            .send(empty_request("GET", &format!("/messages{query}"), Some(user)))
            .await;
        assert_eq!(status, StatusCode::OK);
        body.as_array().cloned().expect("message array")
    }

    pub async fn participant_names(&self) -> Vec<String> {
        let (status, body) = self.send(empty_request("GET", "/participants", None)).await;
        assert_eq!(status, StatusCode::OK);
        body.as_array()
            .expect("participant array")
            .iter()
            .map(|p| p["name"].as_str().expect("name").to_string())
            .collect()
    }
}

pub fn json_request(method: &str, uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header("User", user);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub fn empty_request(method: &str, uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("User", user);
    }
    builder.body(Body::empty()).expect("request")
}

pub fn texts(messages: &[Value]) -> Vec<String> {
    messages
        .iter()
        .map(|m| m["text"].as_str().expect("text").to_string())
        .collect()
}

pub const STORE_FAILURE_DETAIL: &str = "connection refused by db-internal-7";

fn store_down<T>() -> RepositoryResult<T> {
    Err(RepositoryError::storage(STORE_FAILURE_DETAIL))
}

/// 模拟不可用的数据库
pub struct FailingStore;

#[async_trait]
impl ParticipantRepository for FailingStore {
    async fn insert(&self, _participant: Participant) -> RepositoryResult<()> {
        store_down()
    }

    async fn find_by_name(&self, _name: &str) -> RepositoryResult<Option<Participant>> {
        store_down()
    }

    async fn list_all(&self) -> RepositoryResult<Vec<Participant>> {
        store_down()
    }

    async fn touch(&self, _name: &str, _at: i64) -> RepositoryResult<bool> {
        store_down()
    }

    async fn delete_if_stale(&self, _name: &str, _observed: i64) -> RepositoryResult<bool> {
        store_down()
    }
}

#[async_trait]
impl MessageRepository for FailingStore {
    async fn insert(&self, _message: Message) -> RepositoryResult<()> {
        store_down()
    }

    async fn list_visible_to(&self, _user: &str) -> RepositoryResult<Vec<Message>> {
        store_down()
    }
}
