use std::time::Duration;

use hookrelay_core::{Error, LogBroker, LogRecord, PartitionStream, Result, StartOffset};
use rdkafka::config::RDKafkaLogLevel;
use rdkafka::consumer::{BaseConsumer, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::{ClientConfig, Message, Offset, TopicPartitionList};
use tracing::debug;

const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// [`LogBroker`] over a Kafka cluster.
///
/// Every consumer is created with auto-commit disabled: the pipeline never
/// commits offsets, and re-delivery after a restart is covered by the
/// at-least-once discipline of the retry store.
pub struct KafkaBroker {
    brokers: String,
    verbose: bool,
}

impl KafkaBroker {
    pub fn new(brokers: impl Into<String>, verbose: bool) -> Self {
        Self {
            brokers: brokers.into(),
            verbose,
        }
    }

    fn consumer_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", "hookrelay")
            .set("enable.auto.commit", "false")
            .set("enable.partition.eof", "false");
        config.set_log_level(if self.verbose {
            RDKafkaLogLevel::Debug
        } else {
            RDKafkaLogLevel::Warning
        });
        config
    }
}

#[async_trait::async_trait]
impl LogBroker for KafkaBroker {
    async fn partitions(&self, topic: &str) -> Result<Vec<i32>> {
        let config = self.consumer_config();
        let topic = topic.to_owned();
        // Metadata fetching in the client library is blocking.
        let ids = tokio::task::spawn_blocking(
            move || -> std::result::Result<Vec<i32>, KafkaError> {
                let consumer: BaseConsumer = config.create()?;
                let metadata = consumer.fetch_metadata(Some(&topic), METADATA_TIMEOUT)?;
                Ok(metadata
                    .topics()
                    .iter()
                    .filter(|t| t.name() == topic)
                    .flat_map(|t| t.partitions().iter().map(|p| p.id()))
                    .collect())
            },
        )
        .await
        .map_err(Error::broker)?
        .map_err(Error::broker)?;
        debug!(partitions = ?ids, "resolved partition list");
        Ok(ids)
    }

    async fn consume(
        &self,
        topic: &str,
        partition: i32,
        start: StartOffset,
    ) -> Result<Box<dyn PartitionStream>> {
        let offset = match start {
            StartOffset::Oldest => Offset::Beginning,
            StartOffset::Newest => Offset::End,
            StartOffset::At(at) => Offset::Offset(at),
        };
        let consumer: StreamConsumer = self.consumer_config().create().map_err(Error::broker)?;
        let mut assignment = TopicPartitionList::new();
        assignment
            .add_partition_offset(topic, partition, offset)
            .map_err(Error::broker)?;
        consumer.assign(&assignment).map_err(Error::broker)?;
        debug!(topic, partition, ?start, "partition consumer assigned");
        Ok(Box::new(KafkaPartitionStream { consumer }))
    }
}

struct KafkaPartitionStream {
    consumer: StreamConsumer,
}

#[async_trait::async_trait]
impl PartitionStream for KafkaPartitionStream {
    async fn next(&mut self) -> Result<Option<LogRecord>> {
        match self.consumer.recv().await {
            Ok(message) => Ok(Some(LogRecord {
                topic: message.topic().to_owned(),
                partition: message.partition(),
                offset: message.offset(),
                value: message.payload().unwrap_or_default().to_vec(),
            })),
            Err(KafkaError::PartitionEOF(_)) => Ok(None),
            Err(err) => Err(Error::broker(err)),
        }
    }

    async fn close(self: Box<Self>) {
        // Dropping the consumer tears the connection down.
    }
}
