use std::sync::Arc;

use config::{DatabaseConfig, StorageBackend};
use domain::{MessageRepository, ParticipantRepository};
use thiserror::Error;

use crate::{
    memory::MemoryStorage,
    migrations::MIGRATOR,
    repository::{create_pg_pool, PgStorage},
};

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// 按配置选出的存储后端
#[derive(Clone)]
pub struct Storage {
    pub participants: Arc<dyn ParticipantRepository>,
    pub messages: Arc<dyn MessageRepository>,
}

impl Storage {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, InfrastructureError> {
        match config.backend {
            StorageBackend::Postgres => {
                let pool = create_pg_pool(config).await?;
                MIGRATOR.run(&pool).await?;
                tracing::info!("Postgres storage ready, migrations applied");
                Ok(Self::from(PgStorage::new(pool)))
            }
            StorageBackend::Memory => {
                tracing::warn!("使用内存存储，进程退出后数据丢失");
                Ok(Self::from(MemoryStorage::new()))
            }
        }
    }
}

impl From<PgStorage> for Storage {
    fn from(storage: PgStorage) -> Self {
        Self {
            participants: storage.participant_repository,
            messages: storage.message_repository,
        }
    }
}

impl From<MemoryStorage> for Storage {
    fn from(storage: MemoryStorage) -> Self {
        Self {
            participants: storage.participant_repository,
            messages: storage.message_repository,
        }
    }
}
