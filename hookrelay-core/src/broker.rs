use std::str::FromStr;

use crate::Result;

/// One record consumed from the partitioned log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub value: Vec<u8>,
}

/// Where a partition consumer starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOffset {
    Oldest,
    Newest,
    At(i64),
}

impl FromStr for StartOffset {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "oldest" => Ok(StartOffset::Oldest),
            "newest" => Ok(StartOffset::Newest),
            numeric => numeric.parse().map(StartOffset::At),
        }
    }
}

/// A stream of records from a single partition, in offset order.
#[async_trait::async_trait]
pub trait PartitionStream: Send {
    /// The next record, or `Ok(None)` once the stream has ended.
    async fn next(&mut self) -> Result<Option<LogRecord>>;

    /// Release the underlying consumer.
    async fn close(self: Box<Self>);
}

/// The partitioned, ordered log the pipeline consumes events from.
///
/// Implementations must hand out independent [`PartitionStream`]s; the
/// pipeline opens one per partition in the listener and a short-lived one
/// per replayed event in the retry driver.
#[async_trait::async_trait]
pub trait LogBroker: Send + Sync {
    /// All partition ids currently assigned to `topic`.
    async fn partitions(&self, topic: &str) -> Result<Vec<i32>>;

    /// Open a consumer over one partition starting at `start`.
    async fn consume(
        &self,
        topic: &str,
        partition: i32,
        start: StartOffset,
    ) -> Result<Box<dyn PartitionStream>>;
}
