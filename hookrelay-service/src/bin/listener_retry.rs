//! The retry driver process: sweeps the retry tiers once a minute and
//! replays due events through the delivery engine.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use hookrelay_core::RetryStore;
use hookrelay_retry::{BrokerDispatch, DeliveryEngine, RetryDriver};
use hookrelay_service::cli::{self, exit_unavailable, exit_usage_error};
use hookrelay_service::config::Config;
use hookrelay_service::kafka::KafkaBroker;
use hookrelay_service::redis_store::RedisStore;
use hookrelay_service::telemetry;
use tracing::info;

/// Replay parked notification events as their retry deadlines pass.
#[derive(Debug, Parser)]
#[command(name = "listener-retry", version)]
struct Args {
    /// The comma separated list of brokers in the Kafka cluster.
    #[arg(long, env = "KAFKA_PEERS")]
    brokers: Option<String>,
    /// The topic the parked events were consumed from. Required.
    #[arg(long)]
    topic: Option<String>,
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
    let engine = Arc::new(DeliveryEngine::new(store.clone()));
    let dispatch = BrokerDispatch::new(broker, engine);

    RetryDriver::new(store, dispatch, topic).run().await;
}
