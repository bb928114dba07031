//! The listener process: consumes a topic across its partitions and hands
//! every record to the delivery engine, one task per record.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use hookrelay_core::{LogBroker, LogRecord, PartitionStream, RetryStore, StartOffset};
use hookrelay_retry::{DeliveryEngine, RetryRecord};
use hookrelay_service::cli::{self, exit_unavailable, exit_usage_error};
use hookrelay_service::config::Config;
use hookrelay_service::kafka::KafkaBroker;
use hookrelay_service::redis_store::RedisStore;
use hookrelay_service::telemetry;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{error, info};

/// Consume notification events and deliver each one as a webhook POST.
#[derive(Debug, Parser)]
#[command(name = "listener", version)]
struct Args {
    /// The comma separated list of brokers in the Kafka cluster.
    #[arg(long, env = "KAFKA_PEERS")]
    brokers: Option<String>,
    /// The topic to consume. Required.
    #[arg(long)]
    topic: Option<String>,
    /// The partitions to consume: 'all' or comma-separated ids.
    #[arg(long, default_value = "all")]
    partitions: String,
    /// The offset to start with: 'oldest', 'newest', or a number.
    #[arg(long, default_value = "newest")]
    offset: String,
    /// The buffer size of the message channel.
    #[arg(long, default_value_t = 256)]
    buffer_size: usize,
    /// Turn on broker client logging.
    #[arg(long)]
    verbose: bool,
    /// Config file's path.
    #[arg(long, default_value = "config/config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let args = cli::parse_or_exit::<Args>();
    telemetry::init(args.verbose);

    let brokers = match args.brokers.as_deref().filter(|b| !b.is_empty()) {
        Some(brokers) => brokers.to_owned(),
        None => exit_usage_error(
            "you have to provide --brokers as a comma-separated list, or set the KAFKA_PEERS environment variable",
        ),
    };
    let topic = match args.topic.filter(|t| !t.is_empty()) {
        Some(topic) => topic,
        None => exit_usage_error("--topic is required"),
    };
    let start = match args.offset.parse::<StartOffset>() {
        Ok(start) => start,
        Err(_) => exit_usage_error("--offset must be 'oldest', 'newest' or a number"),
    };

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(err) => exit_unavailable(&format!("reload config failed, err={err:#}")),
    };
    let store = match RedisStore::connect(&config.redis).await {
        Ok(store) => store,
        Err(err) => exit_unavailable(&format!("connect to redis failed, err={err:#}")),
    };
    match store.ping().await {
        Ok(reply) => info!(reply = %reply, "PING redis"),
        Err(err) => exit_unavailable(&format!("connect to redis failed, err={err}")),
    }

    let broker = KafkaBroker::new(brokers, args.verbose);
    let partitions = match args.partitions.as_str() {
        "all" => match broker.partitions(&topic).await {
            Ok(partitions) => partitions,
            Err(err) => {
                exit_unavailable(&format!("failed to get the list of partitions: {err}"))
            }
        },
        list => match cli::parse_partition_list(list) {
            Ok(partitions) => partitions,
            Err(err) => exit_unavailable(&format!("failed to get the list of partitions: {err}")),
        },
    };

    let engine = Arc::new(DeliveryEngine::new(store));
    let (records_tx, mut records_rx) = mpsc::channel::<LogRecord>(args.buffer_size);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        cli::shutdown_signal().await;
        info!("initiating shutdown of consumer...");
        let _ = shutdown_tx.send(true);
    });

    let mut readers = JoinSet::new();
    for partition in partitions {
        let stream = match broker.consume(&topic, partition, start).await {
            Ok(stream) => stream,
            Err(err) => {
                exit_unavailable(&format!(
                    "failed to start consumer for partition {partition}: {err}"
                ))
            }
        };
        readers.spawn(read_partition(
            stream,
            partition,
            records_tx.clone(),
            shutdown_rx.clone(),
        ));
    }
    drop(records_tx);

    // Deliveries race on purpose; only the per-partition read order is
    // defined.
    let dispatcher = tokio::spawn(async move {
        while let Some(record) = records_rx.recv().await {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                if let Err(err) = engine.fire(&record, None, RetryRecord::default()).await {
                    error!(
                        topic = %record.topic,
                        partition = record.partition,
                        offset = record.offset,
                        error = %err,
                        "delivery failed"
                    );
                }
            });
        }
    });

    while readers.join_next().await.is_some() {}
    info!(topic = %topic, "done consuming topic");
    let _ = dispatcher.await;
}

async fn read_partition(
    mut stream: Box<dyn PartitionStream>,
    partition: i32,
    records: mpsc::Sender<LogRecord>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            next = stream.next() => match next {
                Ok(Some(record)) => {
                    if records.send(record).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    error!(partition, error = %err, "partition read failed");
                    break;
                }
            },
        }
    }
    stream.close().await;
}
