use std::{str::FromStr, sync::Arc, time::Duration};

use async_trait::async_trait;
use config::DatabaseConfig;
use domain::{
    Message, MessageKind, MessageRepository, Participant, ParticipantRepository, RepositoryError,
    RepositoryResult, BROADCAST_RECIPIENT,
};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    FromRow, PgPool,
};

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict;
        }
    }
    RepositoryError::storage(err.to_string())
}

/// 建立连接池；配置了 `name` 时覆盖连接串里的数据库名
pub async fn create_pg_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let mut options = PgConnectOptions::from_str(&config.url)?;
    if let Some(name) = config.name.as_deref().filter(|name| !name.is_empty()) {
        options = options.database(name);
    }

    let mut pool_options = PgPoolOptions::new().max_connections(config.max_connections);
    if config.acquire_timeout_seconds > 0 {
        pool_options =
            pool_options.acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds));
    }

    pool_options.connect_with(options).await
}

#[derive(Debug, FromRow)]
struct ParticipantRecord {
    name: String,
    last_status: i64,
}

impl From<ParticipantRecord> for Participant {
    fn from(value: ParticipantRecord) -> Self {
        Participant {
            name: value.name,
            last_status: value.last_status,
        }
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    sender: String,
    recipient: String,
    text: String,
    message_type: String,
    time: String,
}

impl TryFrom<MessageRecord> for Message {
    type Error = RepositoryError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let kind = MessageKind::from_str(&value.message_type)
            .map_err(|err| RepositoryError::storage(err.to_string()))?;

        Ok(Message {
            from: value.sender,
            to: value.recipient,
            text: value.text,
            kind,
            time: value.time,
        })
    }
}

#[derive(Clone)]
pub struct PgParticipantRepository {
    pool: PgPool,
}

impl PgParticipantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ParticipantRepository for PgParticipantRepository {
    async fn insert(&self, participant: Participant) -> RepositoryResult<()> {
        sqlx::query("INSERT INTO participants (name, last_status) VALUES ($1, $2)")
            .bind(&participant.name)
            .bind(participant.last_status)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Participant>> {
        let record = sqlx::query_as::<_, ParticipantRecord>(
            "SELECT name, last_status FROM participants WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(Participant::from))
    }

    async fn list_all(&self) -> RepositoryResult<Vec<Participant>> {
        let records = sqlx::query_as::<_, ParticipantRecord>(
            "SELECT name, last_status FROM participants ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Participant::from).collect())
    }

    async fn touch(&self, name: &str, at: i64) -> RepositoryResult<bool> {
        // GREATEST 保证 last_status 单调不减
        let result = sqlx::query(
            "UPDATE participants SET last_status = GREATEST(last_status, $2) WHERE name = $1",
        )
        .bind(name)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_if_stale(
        &self,
        name: &str,
        observed_last_status: i64,
    ) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM participants WHERE name = $1 AND last_status = $2")
            .bind(name)
            .bind(observed_last_status)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn insert(&self, message: Message) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (sender, recipient, text, message_type, time)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&message.from)
        .bind(&message.to)
        .bind(&message.text)
        .bind(message.kind.as_str())
        .bind(&message.time)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn list_visible_to(&self, user: &str) -> RepositoryResult<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT sender, recipient, text, message_type, time
            FROM messages
            WHERE recipient = $1 OR recipient = $2 OR sender = $2
            ORDER BY id ASC
            "#,
        )
        .bind(BROADCAST_RECIPIENT)
        .bind(user)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Message::try_from).collect()
    }
}

/// Postgres 存储集合
#[derive(Clone)]
pub struct PgStorage {
    pub participant_repository: Arc<PgParticipantRepository>,
    pub message_repository: Arc<PgMessageRepository>,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            participant_repository: Arc::new(PgParticipantRepository::new(pool.clone())),
            message_repository: Arc::new(PgMessageRepository::new(pool)),
        }
    }
}
