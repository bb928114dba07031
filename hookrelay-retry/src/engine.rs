use std::time::Duration;

use hookrelay_core::{needs_retry, Event, LogRecord, Result, RetryStore, WebhookClient};
use rquest::Url;
use tracing::{debug, error, info, warn};

use crate::advance::{advance, AdvanceError};
use crate::record::RetryRecord;
use crate::schedule;

/// How often a single delivery retries the transport layer before giving
/// the event to the scheduler, and how long it waits in between.
const TRANSPORT_ATTEMPTS: u32 = 3;
const TRANSPORT_GAP: Duration = Duration::from_secs(1);

/// Drives one delivery attempt end to end: parse, validate, POST, interpret,
/// and on failure promote into the retry tiers.
///
/// The engine only delivers; it never rewrites the event body. It is shared
/// behind an `Arc` by whatever spawns delivery tasks.
pub struct DeliveryEngine<S> {
    webhook: WebhookClient,
    store: S,
}

impl<S: RetryStore> DeliveryEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            webhook: WebhookClient::new(),
            store,
        }
    }

    /// Deliver one log record.
    ///
    /// `dest` is the tier list this attempt falls into if it fails; `None`
    /// on the last tier means a failure is capped. Fresh deliveries pass
    /// `None` together with the default [`RetryRecord`] and are routed to
    /// the first tier automatically.
    ///
    /// Records whose value is not a valid event, or whose target URL does
    /// not parse, are dropped: a producer bug is not a transient condition
    /// and must not reach the retry store. Capped events are logged and
    /// also reported as success. Only store failures during promotion
    /// surface as errors.
    pub async fn fire(
        &self,
        msg: &LogRecord,
        dest: Option<&str>,
        retry_data: RetryRecord,
    ) -> Result<()> {
        debug!(
            topic = %msg.topic,
            partition = msg.partition,
            offset = msg.offset,
            "delivering log record"
        );

        let event: Event = match serde_json::from_slice(&msg.value) {
            Ok(event) => event,
            Err(err) => {
                error!(
                    topic = %msg.topic,
                    partition = msg.partition,
                    offset = msg.offset,
                    error = %err,
                    "record value is not an event, dropping"
                );
                return Ok(());
            }
        };

        if let Err(err) = Url::parse(&event.meta.url) {
            info!(
                url = %event.meta.url,
                offset = msg.offset,
                error = %err,
                "target url does not parse, dropping"
            );
            return Ok(());
        }

        let result = self.post_with_transport_retry(&event).await;

        if !needs_retry(&result) {
            info!(offset = msg.offset, url = %event.meta.url, "webhook delivered");
            return Ok(());
        }
        info!(
            offset = msg.offset,
            url = %event.meta.url,
            response = %result,
            "webhook not acknowledged, scheduling retry"
        );

        let mut retry = retry_data;
        let mut dest = dest.map(str::to_owned);
        if retry.is_fresh() {
            retry = RetryRecord {
                offset: msg.offset,
                partition: msg.partition,
                attempts: 0,
                next_time: 0,
            };
            dest = Some(schedule::list_key(&msg.topic, 2, "4m"));
        }

        match advance(&self.store, &msg.topic, &mut retry, dest.as_deref()).await {
            Ok(()) => Ok(()),
            Err(AdvanceError::Capped) => {
                warn!(
                    topic = %msg.topic,
                    offset = msg.offset,
                    response = %result,
                    "retry attempts capped, giving up on event"
                );
                Ok(())
            }
            Err(AdvanceError::Store(err)) => {
                error!(
                    topic = %msg.topic,
                    partition = msg.partition,
                    offset = msg.offset,
                    dest = ?dest,
                    error = %err,
                    "tier advance failed"
                );
                Err(err)
            }
        }
    }

    /// POST the event, riding out short transport blips.
    ///
    /// Only transport-level failures are retried here; any received
    /// response ends the loop and is judged by the caller. Exhaustion
    /// leaves an empty body, which never passes the success predicate.
    async fn post_with_transport_retry(&self, event: &Event) -> String {
        for attempt in 1..=TRANSPORT_ATTEMPTS {
            match self
                .webhook
                .post(&event.content, &event.meta.url, &event.meta.headers)
                .await
            {
                Ok(body) => return body,
                Err(err) => {
                    info!(
                        attempt,
                        url = %event.meta.url,
                        error = %err,
                        "webhook post attempt failed"
                    );
                    if attempt < TRANSPORT_ATTEMPTS {
                        tokio::time::sleep(TRANSPORT_GAP).await;
                    }
                }
            }
        }
        String::new()
    }
}
