//! 请求体校验
//!
//! 先清洗再校验：名称、收件人与正文都会去掉标签与首尾空白，
//! 清洗后为空的正文同样视为校验失败。

use std::borrow::Cow;

use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::{
    errors::{DomainError, DomainResult},
    message::MessageKind,
    sanitize::sanitize_text,
};

fn alphanumeric(value: &str) -> Result<(), ValidationError> {
    if value.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(ValidationError::new("alphanumeric")
            .with_message(Cow::Borrowed("must contain only letters and digits")))
    }
}

fn sendable_kind(value: &str) -> Result<(), ValidationError> {
    match value.parse::<MessageKind>() {
        Ok(kind) if kind.is_sendable() => Ok(()),
        _ => Err(ValidationError::new("message_type")
            .with_message(Cow::Borrowed("must be `message` or `private_message`"))),
    }
}

/// `POST /participants` 请求体
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RegisterParticipant {
    #[validate(
        required(message = "name is required"),
        length(min = 1, max = 20, message = "must be between 1 and 20 characters"),
        custom(function = "alphanumeric")
    )]
    pub name: Option<String>,
}

impl RegisterParticipant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    /// 返回清洗并校验后的名称
    pub fn into_valid_name(self) -> DomainResult<String> {
        let candidate = Self {
            name: self.name.map(|name| sanitize_text(&name)),
        };
        candidate.validate().map_err(DomainError::from)?;
        Ok(candidate.name.unwrap_or_default())
    }
}

/// `POST /messages` 请求体
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SendMessage {
    #[validate(
        required(message = "to is required"),
        length(min = 1, max = 20, message = "must be between 1 and 20 characters"),
        custom(function = "alphanumeric")
    )]
    pub to: Option<String>,

    #[validate(
        required(message = "text is required"),
        length(min = 1, message = "must not be empty")
    )]
    pub text: Option<String>,

    #[serde(rename = "type")]
    #[validate(custom(function = "sendable_kind"))]
    pub kind: Option<String>,
}

/// 通过校验的待发送消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub to: String,
    pub text: String,
    pub kind: MessageKind,
}

impl SendMessage {
    pub fn new(to: impl Into<String>, text: impl Into<String>, kind: Option<&str>) -> Self {
        Self {
            to: Some(to.into()),
            text: Some(text.into()),
            kind: kind.map(str::to_string),
        }
    }

    pub fn into_outgoing(self) -> DomainResult<OutgoingMessage> {
        let candidate = Self {
            to: self.to.map(|to| sanitize_text(&to)),
            text: self.text.map(|text| sanitize_text(&text)),
            kind: self.kind,
        };
        candidate.validate().map_err(DomainError::from)?;

        let kind = match candidate.kind.as_deref() {
            Some(raw) => raw.parse()?,
            None => MessageKind::Message,
        };

        Ok(OutgoingMessage {
            to: candidate.to.unwrap_or_default(),
            text: candidate.text.unwrap_or_default(),
            kind,
        })
    }
}
