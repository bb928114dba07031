use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use hookrelay_core::{Error, LogBroker, PartitionStream, Result, RetryStore, StartOffset};
use tracing::{error, info, trace};

use crate::engine::DeliveryEngine;
use crate::record::RetryRecord;
use crate::schedule;

/// How a due event is handed back to delivery. The driver stays agnostic of
/// brokers so sweeps can be exercised without one.
#[async_trait::async_trait]
pub trait RetryDispatch: Send + Sync + 'static {
    /// Replay one due event. `dest` is the next tier's list key, or `None`
    /// when the event is on its last chance.
    async fn dispatch(&self, topic: &str, dest: Option<String>, retry: RetryRecord) -> Result<()>;
}

/// The production dispatcher: read the original record back from the log at
/// `(partition, offset)` and fire it with the tier-advance target.
pub struct BrokerDispatch<B, S> {
    broker: B,
    engine: Arc<DeliveryEngine<S>>,
}

impl<B, S> BrokerDispatch<B, S> {
    pub fn new(broker: B, engine: Arc<DeliveryEngine<S>>) -> Self {
        Self { broker, engine }
    }
}

#[async_trait::async_trait]
impl<B, S> RetryDispatch for BrokerDispatch<B, S>
where
    B: LogBroker + 'static,
    S: RetryStore + Send + Sync + 'static,
{
    async fn dispatch(&self, topic: &str, dest: Option<String>, retry: RetryRecord) -> Result<()> {
        let mut stream = self
            .broker
            .consume(topic, retry.partition, StartOffset::At(retry.offset))
            .await?;
        let record = stream.next().await;
        stream.close().await;

        let record = match record {
            Ok(Some(record)) => record,
            Ok(None) => {
                return Err(Error::broker(anyhow!(
                    "partition {} ended before offset {} was read",
                    retry.partition,
                    retry.offset
                )))
            }
            Err(err) => return Err(err),
        };

        self.engine.fire(&record, dest.as_deref(), retry).await
    }
}

/// Sweeps the retry tiers and replays whatever has fallen due.
///
/// Each sweep walks the seven tier lists lowest first. Within a tier the
/// head is peeked, its record loaded, and, if due, dispatch is spawned
/// *before* the head is popped: a crash in between replays the event rather
/// than losing it. FIFO order makes the first not-yet-due head a stop
/// signal for the whole tier.
pub struct RetryDriver<S, D> {
    store: S,
    dispatch: Arc<D>,
    topic: String,
    sweep_gap: Duration,
}

impl<S, D> RetryDriver<S, D>
where
    S: RetryStore,
    D: RetryDispatch,
{
    pub fn new(store: S, dispatch: D, topic: impl Into<String>) -> Self {
        Self {
            store,
            dispatch: Arc::new(dispatch),
            topic: topic.into(),
            sweep_gap: Duration::from_secs(60),
        }
    }

    /// Sweep forever. Dispatched replays run on their own tasks; the loop
    /// never waits for them.
    pub async fn run(&self) {
        info!(topic = %self.topic, "retry driver started");
        loop {
            self.sweep().await;
            tokio::time::sleep(self.sweep_gap).await;
        }
    }

    /// One pass over all tiers. Store problems abort the affected tier and
    /// move on to the next; the sweep itself never fails.
    pub async fn sweep(&self) {
        let lists = schedule::tier_lists(&self.topic);
        for index in 0..lists.len() {
            trace!(key = %lists[index], "scanning tier list");
            loop {
                match self.replay_head(&lists, index).await {
                    Ok(true) => continue,
                    Ok(false) => break,
                    Err(err) => {
                        error!(key = %lists[index], topic = %self.topic, error = %err, "tier scan aborted");
                        break;
                    }
                }
            }
        }
    }

    /// Replay the head of one tier list if it is due. Returns `Ok(true)`
    /// when an element was consumed and the head should be re-examined.
    async fn replay_head(&self, lists: &[String], index: usize) -> Result<bool> {
        let list = &lists[index];

        let head = match self.store.lrange_head(list).await? {
            Some(head) => head,
            None => return Ok(false),
        };
        let offset: i64 = head
            .parse()
            .map_err(|err| Error::store(anyhow!("list {list} head {head:?} is not an offset: {err}")))?;

        let hash = schedule::hash_key(&self.topic, offset);
        let retry = RetryRecord::load(&self.store, &hash, offset).await?;

        if retry.next_time > schedule::unix_now() {
            return Ok(false);
        }

        let dest = lists.get(index + 1).cloned();
        let dispatch = Arc::clone(&self.dispatch);
        let topic = self.topic.clone();
        tokio::spawn(async move {
            if let Err(err) = dispatch.dispatch(&topic, dest, retry).await {
                error!(
                    topic = %topic,
                    partition = retry.partition,
                    offset = retry.offset,
                    error = %err,
                    "retry dispatch failed"
                );
            }
        });

        let popped = self.store.lpop(list).await?;
        if popped.as_deref() != Some(head.as_str()) {
            error!(
                key = %list,
                expected = %head,
                popped = ?popped,
                "popped head differs from peeked head, leaving tier to the other consumer"
            );
            return Ok(false);
        }
        Ok(true)
    }
}
