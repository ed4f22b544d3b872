//! 聊天室核心领域模型
//!
//! 包含参与者、消息实体，请求体校验与文本清洗，以及存储接口。

pub mod errors;
pub mod message;
pub mod participant;
pub mod repository;
pub mod sanitize;
pub mod validation;

// 重新导出常用类型
pub use errors::*;
pub use message::{
    format_clock_time, parse_limit, take_last, Message, MessageKind, ARRIVAL_TEXT,
    BROADCAST_RECIPIENT, DEPARTURE_TEXT,
};
pub use participant::Participant;
pub use repository::{MessageRepository, ParticipantRepository};
#[cfg(feature = "testing")]
pub use repository::{MockMessageRepository, MockParticipantRepository};
pub use sanitize::sanitize_text;
pub use validation::{OutgoingMessage, RegisterParticipant, SendMessage};
