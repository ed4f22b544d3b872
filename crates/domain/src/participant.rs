use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 聊天室参与者
///
/// `last_status` 为最近一次注册或心跳的时间（毫秒级 Unix 时间戳）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub name: String,
    pub last_status: i64,
}

impl Participant {
    pub fn join(name: impl Into<String>, now_millis: i64) -> Self {
        Self {
            name: name.into(),
            last_status: now_millis,
        }
    }

    /// 心跳只会把时间往前推
    pub fn touch(&mut self, now_millis: i64) {
        self.last_status = self.last_status.max(now_millis);
    }

    /// 距离上次心跳超过阈值即视为过期
    pub fn is_stale(&self, now_millis: i64, stale_after: Duration) -> bool {
        let threshold = i64::try_from(stale_after.as_millis()).unwrap_or(i64::MAX);
        now_millis.saturating_sub(self.last_status) > threshold
    }
}
