//! 基础设施层实现。
//!
//! 提供 Postgres 与内存两种仓储适配器，实现领域层定义的存储接口。

pub mod builder;
pub mod memory;
pub mod migrations;
pub mod repository;

pub use builder::{InfrastructureError, Storage};
pub use memory::{InMemoryMessageRepository, InMemoryParticipantRepository, MemoryStorage};
pub use migrations::MIGRATOR;
pub use repository::{create_pg_pool, PgMessageRepository, PgParticipantRepository, PgStorage};
