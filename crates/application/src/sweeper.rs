//! 不活跃参与者清理
//!
//! 周期性读取全部参与者，删除超过阈值未发心跳的参与者，并为每个被删除者
//! 写入一条离开房间的广播消息。扫描与请求处理之间不加锁，也不使用事务；
//! 删除以扫描时看到的 `last_status` 为条件，扫描期间发过心跳的参与者会被保留。

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use domain::{Message, MessageRepository, Participant, ParticipantRepository, RepositoryError};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{clock::Clock, error::ApplicationError, store::bounded};

#[derive(Debug, Clone, Copy)]
pub struct SweeperSettings {
    pub interval: Duration,
    pub stale_after: Duration,
    pub store_timeout: Duration,
}

impl Default for SweeperSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            stale_after: Duration::from_secs(10),
            store_timeout: Duration::from_secs(5),
        }
    }
}

pub struct SweeperDependencies {
    pub participant_repository: Arc<dyn ParticipantRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub clock: Arc<dyn Clock>,
    pub settings: SweeperSettings,
}

/// 单次扫描结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    /// 按处理顺序排列的被清理参与者
    pub evicted: Vec<String>,
    /// 扫描后又发过心跳或已被删除，跳过
    pub skipped: usize,
    pub failed: usize,
}

pub struct InactivitySweeper {
    deps: SweeperDependencies,
    running: AtomicBool,
    shutdown: CancellationToken,
}

impl InactivitySweeper {
    pub fn new(deps: SweeperDependencies) -> Self {
        Self {
            deps,
            running: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// 启动后台清理任务；已在运行、已关闭或不在 tokio 运行时中时不做任何事。
    /// 返回本次调用是否启动了任务。
    pub fn ensure_running(self: &Arc<Self>) -> bool {
        if self.shutdown.is_cancelled() {
            return false;
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(err) => {
                tracing::warn!(error = %err, "no tokio runtime, inactivity sweeper not started");
                return false;
            }
        };

        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let sweeper = Arc::clone(self);
        handle.spawn(async move { sweeper.run().await });

        tracing::info!(
            interval_secs = self.deps.settings.interval.as_secs(),
            stale_after_secs = self.deps.settings.stale_after.as_secs(),
            "Inactivity sweeper started"
        );
        true
    }

    /// 通知后台任务退出
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    async fn run(self: Arc<Self>) {
        let period = self.deps.settings.interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    match self.sweep_once().await {
                        Ok(report) => tracing::debug!(
                            scanned = report.scanned,
                            evicted = report.evicted.len(),
                            skipped = report.skipped,
                            failed = report.failed,
                            "Sweep cycle finished"
                        ),
                        Err(err) => tracing::error!(error = %err, "Sweep cycle failed to read participants"),
                    }
                }
            }
        }

        self.running.store(false, Ordering::Release);
        tracing::info!("Inactivity sweeper stopped");
    }

    /// 执行一次扫描。读取参与者失败时返回错误；单个参与者的失败只记录日志。
    pub async fn sweep_once(&self) -> Result<SweepReport, ApplicationError> {
        let timeout = self.deps.settings.store_timeout;
        let now = self.deps.clock.now();
        let now_millis = now.timestamp_millis();

        let participants = bounded(timeout, self.deps.participant_repository.list_all()).await?;

        let mut report = SweepReport {
            scanned: participants.len(),
            ..SweepReport::default()
        };

        let stale = participants
            .iter()
            .filter(|participant| participant.is_stale(now_millis, self.deps.settings.stale_after));

        for participant in stale {
            match self.evict(participant, now).await {
                Ok(true) => report.evicted.push(participant.name.clone()),
                Ok(false) => report.skipped += 1,
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(
                        participant = %participant.name,
                        error = %err,
                        "Failed to evict inactive participant"
                    );
                }
            }
        }

        Ok(report)
    }

    async fn evict(&self, participant: &Participant, at: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let timeout = self.deps.settings.store_timeout;

        let removed = bounded(
            timeout,
            self.deps
                .participant_repository
                .delete_if_stale(&participant.name, participant.last_status),
        )
        .await?;

        if !removed {
            tracing::debug!(participant = %participant.name, "Participant refreshed during sweep, kept");
            return Ok(false);
        }

        bounded(
            timeout,
            self.deps
                .message_repository
                .insert(Message::departure(participant.name.as_str(), at)),
        )
        .await?;

        tracing::info!(
            participant = %participant.name,
            last_status = participant.last_status,
            "参与者因不活跃被移出聊天室"
        );
        Ok(true)
    }
}
