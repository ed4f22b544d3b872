//! 领域模型错误定义
//!
//! 区分校验失败、名称冲突、参与者不存在与存储失败，
//! 由 web 层统一映射为 HTTP 状态码。

use std::time::Duration;

use thiserror::Error;
use validator::ValidationErrors;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 请求体字段不符合规则
    #[error("validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    /// 名称已被在线参与者占用
    #[error("participant `{name}` already exists")]
    NameTaken { name: String },

    /// 参与者不存在（未注册或已被清理）
    #[error("participant `{name}` not found")]
    ParticipantNotFound { name: String },

    /// 发送者未注册
    #[error("sender `{name}` is not a registered participant")]
    SenderNotRegistered { name: String },
}

impl DomainError {
    /// 创建验证错误
    pub fn validation_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn name_taken(name: impl Into<String>) -> Self {
        Self::NameTaken { name: name.into() }
    }

    pub fn participant_not_found(name: impl Into<String>) -> Self {
        Self::ParticipantNotFound { name: name.into() }
    }

    pub fn sender_not_registered(name: impl Into<String>) -> Self {
        Self::SenderNotRegistered { name: name.into() }
    }
}

impl From<ValidationErrors> for DomainError {
    /// 只取第一个出错字段（按字段名排序，保证输出稳定）
    fn from(errors: ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let mut fields: Vec<_> = field_errors.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));

        match fields.first() {
            Some((field, errs)) => {
                let message = errs
                    .first()
                    .map(|err| {
                        err.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| err.code.to_string())
                    })
                    .unwrap_or_else(|| "invalid value".to_string());
                DomainError::validation_error(field.to_string(), message)
            }
            None => DomainError::validation_error("body", "invalid payload"),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;

/// 存储层错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error("storage error: {message}")]
    Storage { message: String },
    #[error("storage operation timed out after {0:?}")]
    Timeout(Duration),
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
