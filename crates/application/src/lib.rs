//! 应用层实现。
//!
//! 围绕领域模型的用例服务：请求校验与清洗、注册/心跳规则、消息可见性与分页，
//! 以及后台的不活跃参与者清理任务。

pub mod clock;
pub mod dto;
pub mod error;
pub mod services;
mod store;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dto::RegisteredParticipant;
pub use error::ApplicationError;
pub use services::{ChatService, ChatServiceDependencies};
pub use sweeper::{InactivitySweeper, SweepReport, SweeperDependencies, SweeperSettings};
