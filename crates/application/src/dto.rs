use serde::Serialize;

/// `POST /participants` 的响应体
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredParticipant {
    pub name: String,
}
