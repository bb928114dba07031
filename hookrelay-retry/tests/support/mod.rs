#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use hookrelay_core::{
    Error, LogBroker, LogRecord, PartitionStream, Result, RetryStore, StartOffset,
};

/// In-memory stand-in for the key/value+list store.
#[derive(Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    lists: HashMap<String, VecDeque<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
    expiries: HashMap<String, i64>,
    lpop_hijack: Option<String>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self, key: &str) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .lists
            .get(key)
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn hash(&self, key: &str) -> Option<HashMap<String, String>> {
        self.inner.lock().unwrap().hashes.get(key).cloned()
    }

    pub fn expiry(&self, key: &str) -> Option<i64> {
        self.inner.lock().unwrap().expiries.get(key).copied()
    }

    /// True when nothing has ever been written.
    pub fn is_untouched(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.lists.is_empty() && inner.hashes.is_empty() && inner.expiries.is_empty()
    }

    pub fn seed_list(&self, key: &str, items: &[&str]) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .lists
            .insert(key.to_owned(), items.iter().map(|s| (*s).to_owned()).collect());
    }

    pub fn seed_hash(&self, key: &str, fields: &[(&str, &str)]) {
        let mut inner = self.inner.lock().unwrap();
        inner.hashes.insert(
            key.to_owned(),
            fields
                .iter()
                .map(|(f, v)| ((*f).to_owned(), (*v).to_owned()))
                .collect(),
        );
    }

    /// Make the next `lpop` report this value instead of the real head,
    /// simulating a concurrent consumer winning the race.
    pub fn hijack_next_lpop(&self, value: &str) {
        self.inner.lock().unwrap().lpop_hijack = Some(value.to_owned());
    }

    /// Make every write fail from now on.
    pub fn fail_writes(&self) {
        self.inner.lock().unwrap().fail_writes = true;
    }
}

#[async_trait::async_trait]
impl RetryStore for MemoryStore {
    async fn rpush(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err(Error::store(anyhow!("store is down")));
        }
        inner
            .lists
            .entry(key.to_owned())
            .or_default()
            .push_back(value.to_owned());
        Ok(())
    }

    async fn lrange_head(&self, key: &str) -> Result<Option<String>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.lists.get(key).and_then(|l| l.front().cloned()))
    }

    async fn lpop(&self, key: &str) -> Result<Option<String>> {
        let mut inner = self.inner.lock().unwrap();
        let popped = inner.lists.get_mut(key).and_then(|l| l.pop_front());
        if let Some(hijacked) = inner.lpop_hijack.take() {
            return Ok(Some(hijacked));
        }
        Ok(popped)
    }

    async fn hset(&self, key: &str, fields: &[(&str, String)]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err(Error::store(anyhow!("store is down")));
        }
        let hash = inner.hashes.entry(key.to_owned()).or_default();
        for (field, value) in fields {
            hash.insert((*field).to_owned(), value.clone());
        }
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .hashes
            .get(key)
            .and_then(|h| h.get(field).cloned())
            .ok_or_else(|| Error::store(anyhow!("hash {key} has no field {field}")))
    }

    async fn expire_at(&self, key: &str, deadline: i64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err(Error::store(anyhow!("store is down")));
        }
        inner.expiries.insert(key.to_owned(), deadline);
        Ok(())
    }

    async fn ping(&self) -> Result<String> {
        Ok("PONG".to_owned())
    }
}

/// A broker that serves pre-seeded records by `(partition, offset)`.
#[derive(Default, Clone)]
pub struct StaticBroker {
    records: Arc<Mutex<HashMap<(i32, i64), LogRecord>>>,
}

impl StaticBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: LogRecord) {
        self.records
            .lock()
            .unwrap()
            .insert((record.partition, record.offset), record);
    }
}

#[async_trait::async_trait]
impl LogBroker for StaticBroker {
    async fn partitions(&self, _topic: &str) -> Result<Vec<i32>> {
        Ok(vec![0])
    }

    async fn consume(
        &self,
        _topic: &str,
        partition: i32,
        start: StartOffset,
    ) -> Result<Box<dyn PartitionStream>> {
        let offset = match start {
            StartOffset::At(offset) => offset,
            other => {
                return Err(Error::broker(anyhow!("static broker cannot start at {other:?}")))
            }
        };
        let record = self.records.lock().unwrap().get(&(partition, offset)).cloned();
        Ok(Box::new(OneShotStream { record }))
    }
}

struct OneShotStream {
    record: Option<LogRecord>,
}

#[async_trait::async_trait]
impl PartitionStream for OneShotStream {
    async fn next(&mut self) -> Result<Option<LogRecord>> {
        Ok(self.record.take())
    }

    async fn close(self: Box<Self>) {}
}

/// Build the wire form of an event payload.
pub fn event_value(content: &str, url: &str, headers: &str) -> Vec<u8> {
    serde_json::json!({
        "content": content,
        "meta": {
            "url": url,
            "headers": headers,
            "attempts": 0,
            "max_attempts": 0,
        }
    })
    .to_string()
    .into_bytes()
}

/// Build a log record carrying an event payload.
pub fn event_record(topic: &str, partition: i32, offset: i64, value: Vec<u8>) -> LogRecord {
    LogRecord {
        topic: topic.to_owned(),
        partition,
        offset,
        value,
    }
}
