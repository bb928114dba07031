use hookrelay_core::{Error, Result, RetryStore};
use anyhow::anyhow;

/// Per-event retry bookkeeping, persisted as a store hash.
///
/// `offset` and `partition` locate the original record in the log;
/// `attempts` counts completed delivery attempts across tiers and only ever
/// grows; `next_time` is the earliest Unix second the next attempt may run.
/// The default value doubles as the "no prior retry" sentinel passed to
/// fresh deliveries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryRecord {
    pub offset: i64,
    pub partition: i32,
    pub attempts: i32,
    pub next_time: i64,
}

impl RetryRecord {
    /// Whether this is the zero record of a first delivery attempt.
    pub fn is_fresh(&self) -> bool {
        *self == RetryRecord::default()
    }

    /// The hash fields written on every tier advance.
    pub fn fields(&self) -> [(&'static str, String); 4] {
        [
            ("offset", self.offset.to_string()),
            ("partition", self.partition.to_string()),
            ("attempts", self.attempts.to_string()),
            ("next_time", self.next_time.to_string()),
        ]
    }

    /// Reassemble a record from its store hash.
    ///
    /// `offset` comes from the tier list entry; the remaining fields are
    /// read back individually. A hash with missing or unparseable fields is
    /// a store-level problem and surfaces as such.
    pub async fn load<S>(store: &S, key: &str, offset: i64) -> Result<Self>
    where
        S: RetryStore + ?Sized,
    {
        let attempts = read_int(store, key, "attempts").await? as i32;
        let next_time = read_int(store, key, "next_time").await?;
        let partition = read_int(store, key, "partition").await? as i32;
        Ok(RetryRecord {
            offset,
            partition,
            attempts,
            next_time,
        })
    }
}

async fn read_int<S>(store: &S, key: &str, field: &str) -> Result<i64>
where
    S: RetryStore + ?Sized,
{
    let raw = store.hget(key, field).await?;
    raw.parse().map_err(|err| {
        Error::store(anyhow!("hash {key} field {field} holds {raw:?}: {err}"))
    })
}
