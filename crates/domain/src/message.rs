use std::{fmt, str::FromStr};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// 广播收件人，所有参与者可见
pub const BROADCAST_RECIPIENT: &str = "Todos";
pub const ARRIVAL_TEXT: &str = "entra na sala...";
pub const DEPARTURE_TEXT: &str = "sai da sala...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Message,
    PrivateMessage,
    /// 系统生成的进出房间通知
    Status,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Message => "message",
            MessageKind::PrivateMessage => "private_message",
            MessageKind::Status => "status",
        }
    }

    /// 客户端只能发送普通消息和私聊消息
    pub fn is_sendable(&self) -> bool {
        matches!(self, MessageKind::Message | MessageKind::PrivateMessage)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "message" => Ok(MessageKind::Message),
            "private_message" => Ok(MessageKind::PrivateMessage),
            "status" => Ok(MessageKind::Status),
            other => Err(DomainError::validation_error(
                "type",
                format!("unknown message type `{other}`"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// 本地时间 `HH:mm:ss`
    pub time: String,
}

impl Message {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        text: impl Into<String>,
        kind: MessageKind,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            text: text.into(),
            kind,
            time: format_clock_time(at),
        }
    }

    pub fn arrival(name: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(
            name,
            BROADCAST_RECIPIENT,
            ARRIVAL_TEXT,
            MessageKind::Status,
            at,
        )
    }

    pub fn departure(name: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(
            name,
            BROADCAST_RECIPIENT,
            DEPARTURE_TEXT,
            MessageKind::Status,
            at,
        )
    }

    pub fn is_broadcast(&self) -> bool {
        self.to == BROADCAST_RECIPIENT
    }

    /// 广播消息、发给该用户或由该用户发出的消息可见
    pub fn is_visible_to(&self, user: &str) -> bool {
        self.is_broadcast() || self.to == user || self.from == user
    }
}

pub fn format_clock_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

/// 解析 `limit` 查询参数；非数字、零或缺省时返回 `None`，表示不分页
pub fn parse_limit(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|limit| *limit > 0)
}

/// 保留存储顺序的最后 `limit` 条
pub fn take_last(mut messages: Vec<Message>, limit: Option<usize>) -> Vec<Message> {
    match limit {
        Some(limit) if messages.len() > limit => messages.split_off(messages.len() - limit),
        _ => messages,
    }
}
