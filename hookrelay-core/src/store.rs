use crate::Result;

/// The key/value+list store the retry tiers are built on.
///
/// The surface is deliberately narrow: a FIFO list per tier (`rpush` to the
/// tail, `lrange_head`/`lpop` at the head) and one hash per parked event,
/// with an absolute expiry. The three writes a tier advance performs are
/// independent; no atomicity across keys is assumed.
///
/// Implementations are shared across delivery tasks and must be safe for
/// concurrent use.
#[async_trait::async_trait]
pub trait RetryStore: Send + Sync {
    /// Append `value` to the tail of the list at `key`.
    async fn rpush(&self, key: &str, value: &str) -> Result<()>;

    /// The head element of the list at `key`, without removing it.
    async fn lrange_head(&self, key: &str) -> Result<Option<String>>;

    /// Remove and return the head element of the list at `key`.
    async fn lpop(&self, key: &str) -> Result<Option<String>>;

    /// Write `fields` into the hash at `key`, overwriting existing values.
    async fn hset(&self, key: &str, fields: &[(&str, String)]) -> Result<()>;

    /// Read one field of the hash at `key`. A missing key or field is an
    /// error: callers only look up hashes they expect to exist.
    async fn hget(&self, key: &str, field: &str) -> Result<String>;

    /// Expire the key at `key` at the given Unix second.
    async fn expire_at(&self, key: &str, deadline: i64) -> Result<()>;

    /// Liveness probe; returns the server's reply.
    async fn ping(&self) -> Result<String>;
}
