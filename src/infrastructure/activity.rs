//! Activity Sinks
//!
//! Fire-and-forget recording of user activity. `LogActivitySink` writes a
//! structured log line; `RedisActivitySink` appends to a capped Redis stream
//! from a detached task.

use redis::aio::ConnectionManager;

use crate::domain::{Activity, ActivitySink};

/// Writes each activity as an `info` event on the `activity` target.
#[derive(Debug, Default, Clone)]
pub struct LogActivitySink;

impl ActivitySink for LogActivitySink {
    fn record(&self, activity: Activity) {
        tracing::info!(
            target: "activity",
            user_id = activity.user_id,
            activity = activity.kind.label(),
            ip_address = activity.client.ip_address.as_deref().unwrap_or("-"),
            user_agent = activity.client.user_agent.as_deref().unwrap_or("-"),
            timestamp = %activity.timestamp.to_rfc3339(),
            "User activity"
        );
    }
}

/// Appends activities to a Redis stream trimmed to roughly `max_len` entries.
#[derive(Clone)]
pub struct RedisActivitySink {
    redis: ConnectionManager,
    stream: String,
    max_len: usize,
}

impl RedisActivitySink {
    pub fn new(redis: ConnectionManager, stream: impl Into<String>, max_len: usize) -> Self {
        Self {
            redis,
            stream: stream.into(),
            max_len,
        }
    }
}

impl ActivitySink for RedisActivitySink {
    fn record(&self, activity: Activity) {
        let mut conn = self.redis.clone();
        let stream = self.stream.clone();
        let max_len = self.max_len;

        tokio::spawn(async move {
            let result = redis::cmd("XADD")
                .arg(&stream)
                .arg("MAXLEN")
                .arg("~")
                .arg(max_len)
                .arg("*")
                .arg("user_id")
                .arg(activity.user_id)
                .arg("activity")
                .arg(activity.kind.label())
                .arg("ip_address")
                .arg(activity.client.ip_address.as_deref().unwrap_or(""))
                .arg("user_agent")
                .arg(activity.client.user_agent.as_deref().unwrap_or(""))
                .arg("timestamp")
                .arg(activity.timestamp.to_rfc3339())
                .query_async::<String>(&mut conn)
                .await;

            if let Err(e) = result {
                tracing::debug!(error = %e, stream = %stream, "Failed to record user activity");
            }
        });
    }
}
