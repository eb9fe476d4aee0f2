//! Redis-backed tube.
//!
//! Layout per tube, under `{prefix}:{tube}`:
//! - `ready`   zset, score = priority, member = zero-padded id (FIFO within a priority)
//! - `delayed` zset, score = due time in ms
//! - `taken`   zset, score = claim deadline in ms
//! - `data`    hash id -> JSON payload
//! - `pri`     hash id -> priority
//! - `claims`  hash id -> claim token of the current holder
//! - `buried`  set of ids
//! - `seq`     id and claim token counter
//!
//! State transitions run as Lua scripts so a task is never in two states.
//! Ack and bury only succeed for the token issued by the latest take.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Script;
use tokio::time::Instant;
use tokio_retry::Retry;

use super::task::{PutOptions, Task, TaskMeta};
use super::Tube;
use crate::config::{Config, QUEUE_POLL_INTERVAL};
use crate::error_handling::{get_retry_strategy, InitializationError, QueueError};
use crate::models::Payload;

static TAKE_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
local function promote(source)
  local due = redis.call('ZRANGEBYSCORE', source, '-inf', ARGV[1])
  for _, id in ipairs(due) do
    redis.call('ZREM', source, id)
    redis.call('ZADD', KEYS[1], tonumber(redis.call('HGET', KEYS[5], id) or '0'), id)
  end
end
promote(KEYS[2])
promote(KEYS[3])
local popped = redis.call('ZPOPMIN', KEYS[1])
if #popped == 0 then
  return false
end
local id = popped[1]
local claim = redis.call('INCR', KEYS[6])
redis.call('ZADD', KEYS[3], ARGV[2], id)
redis.call('HSET', KEYS[7], id, claim)
return {id, redis.call('HGET', KEYS[4], id) or false, redis.call('HGET', KEYS[5], id) or false, claim}
",
    )
});

static ACK_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
if redis.call('HGET', KEYS[2], ARGV[1]) ~= ARGV[2] then
  return 0
end
if redis.call('ZREM', KEYS[1], ARGV[1]) == 0 then
  return 0
end
redis.call('HDEL', KEYS[2], ARGV[1])
redis.call('HDEL', KEYS[3], ARGV[1])
redis.call('HDEL', KEYS[4], ARGV[1])
return 1
",
    )
});

static BURY_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
if redis.call('HGET', KEYS[2], ARGV[1]) ~= ARGV[2] then
  return 0
end
if redis.call('ZREM', KEYS[1], ARGV[1]) == 0 then
  return 0
end
redis.call('HDEL', KEYS[2], ARGV[1])
redis.call('SADD', KEYS[3], ARGV[1])
return 1
",
    )
});

/// Redis key names of one tube.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TubeKeys {
    ready: String,
    delayed: String,
    taken: String,
    data: String,
    pri: String,
    claims: String,
    buried: String,
    seq: String,
}

impl TubeKeys {
    fn new(prefix: &str, tube: &str) -> Self {
        let key = |suffix: &str| format!("{}:{}:{}", prefix, tube, suffix);
        Self {
            ready: key("ready"),
            delayed: key("delayed"),
            taken: key("taken"),
            data: key("data"),
            pri: key("pri"),
            claims: key("claims"),
            buried: key("buried"),
            seq: key("seq"),
        }
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// Durable tube shared between processes through Redis.
#[derive(Clone)]
pub struct RedisTube {
    name: String,
    keys: TubeKeys,
    claim_timeout: Duration,
    conn: MultiplexedConnection,
}

impl RedisTube {
    /// Connects to `config.queue_url` and binds to the tube `name`.
    ///
    /// Connection attempts are retried with exponential backoff.
    ///
    /// # Errors
    ///
    /// `InitializationError::QueueConnectError` if the URL is invalid or every
    /// attempt fails.
    pub async fn connect(config: &Config, name: &str) -> Result<Self, InitializationError> {
        let client = redis::Client::open(config.queue_url.as_str()).map_err(QueueError::from)?;

        let conn = Retry::spawn(get_retry_strategy(), || async {
            client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| {
                    log::warn!("Failed to connect to queue at {}: {}", config.queue_url, e);
                    e
                })
        })
        .await
        .map_err(QueueError::from)?;

        log::info!("Connected to tube {} at {}", name, config.queue_url);
        Ok(Self {
            name: name.to_string(),
            keys: TubeKeys::new(&config.queue_prefix, name),
            claim_timeout: config.queue_claim_timeout(),
            conn,
        })
    }

    async fn try_take(&self) -> Result<Option<Task>, QueueError> {
        let mut conn = self.conn.clone();
        let now = now_ms();
        let claimed: Option<(String, Option<String>, Option<u32>, u64)> = TAKE_SCRIPT
            .key(&self.keys.ready)
            .key(&self.keys.delayed)
            .key(&self.keys.taken)
            .key(&self.keys.data)
            .key(&self.keys.pri)
            .key(&self.keys.seq)
            .key(&self.keys.claims)
            .arg(now)
            .arg(now.saturating_add(millis(self.claim_timeout)))
            .invoke_async(&mut conn)
            .await?;

        let Some((id, data, priority, claim)) = claimed else {
            return Ok(None);
        };
        let data = data.ok_or_else(|| QueueError::UnknownTask(id.clone()))?;
        let data: Payload = serde_json::from_str(&data)?;
        Ok(Some(Task::new(
            id,
            data,
            TaskMeta {
                priority: priority.unwrap_or(super::DEFAULT_PRIORITY),
            },
        )
        .with_claim(claim)))
    }

    /// Runs a release script against the claim of `task`.
    async fn release(&self, script: &Script, keys: &[&str], task: &Task) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let mut invocation = script.prepare_invoke();
        for key in keys {
            invocation.key(*key);
        }
        let released: i64 = invocation
            .arg(task.id())
            .arg(task.claim())
            .invoke_async(&mut conn)
            .await?;
        if released == 0 {
            return Err(QueueError::UnknownTask(task.id().to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Tube for RedisTube {
    fn name(&self) -> &str {
        &self.name
    }

    async fn take(&self, timeout: Duration) -> Result<Option<Task>, QueueError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(task) = self.try_take().await? {
                return Ok(Some(task));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(QUEUE_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn put(&self, data: Payload, options: PutOptions) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let encoded = serde_json::to_string(&data)?;
        let seq: u64 = redis::cmd("INCR")
            .arg(&self.keys.seq)
            .query_async(&mut conn)
            .await?;
        let id = format!("{:020}", seq);

        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("HSET")
            .arg(&self.keys.data)
            .arg(&id)
            .arg(encoded)
            .ignore()
            .cmd("HSET")
            .arg(&self.keys.pri)
            .arg(&id)
            .arg(options.priority)
            .ignore();
        if options.delay.is_zero() {
            pipe.cmd("ZADD")
                .arg(&self.keys.ready)
                .arg(options.priority)
                .arg(&id)
                .ignore();
        } else {
            pipe.cmd("ZADD")
                .arg(&self.keys.delayed)
                .arg(now_ms().saturating_add(millis(options.delay)))
                .arg(&id)
                .ignore();
        }
        pipe.query_async::<_, ()>(&mut conn).await?;
        log::debug!("Put task {} on tube {}", id, self.name);
        Ok(())
    }

    async fn ack(&self, task: Task) -> Result<(), QueueError> {
        let keys = [
            self.keys.taken.as_str(),
            &self.keys.claims,
            &self.keys.data,
            &self.keys.pri,
        ];
        self.release(&ACK_SCRIPT, &keys, &task).await
    }

    async fn bury(&self, task: Task) -> Result<(), QueueError> {
        let keys = [self.keys.taken.as_str(), &self.keys.claims, &self.keys.buried];
        self.release(&BURY_SCRIPT, &keys, &task).await?;
        log::info!("Buried task {} on tube {}", task.id(), self.name);
        Ok(())
    }
}
