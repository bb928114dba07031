use hookrelay_core::RetryStore;
use thiserror::Error;
use tracing::error;

use crate::record::RetryRecord;
use crate::schedule;

/// Why a tier advance did not complete.
#[derive(Debug, Error)]
pub enum AdvanceError {
    /// The event already failed out of the last tier; nothing was written.
    #[error("the attempts has been capped")]
    Capped,
    /// One of the three store writes failed. Earlier writes are not rolled
    /// back; the record's TTL bounds how long the partial state lives.
    #[error(transparent)]
    Store(#[from] hookrelay_core::Error),
}

/// Move a failed event into its next retry tier.
///
/// `dest` names the tier list this failure was bound for; `None` means the
/// event just failed its last chance and is capped without touching the
/// store. Otherwise the attempt counter is incremented, the next deadline
/// computed from the schedule, the offset appended to the target tier list,
/// and the full record rewritten with a fresh 7-day expiry.
///
/// The list key is derived from the incremented counter plus one: lists are
/// named for the tier the event belongs to when it is next consumed, one
/// ahead of its attempt counter.
pub async fn advance<S>(
    store: &S,
    topic: &str,
    retry: &mut RetryRecord,
    dest: Option<&str>,
) -> Result<(), AdvanceError>
where
    S: RetryStore + ?Sized,
{
    if dest.is_none() {
        return Err(AdvanceError::Capped);
    }

    retry.attempts += 1;
    let (next_time, label) = schedule::next_time(retry.attempts);
    retry.next_time = next_time;

    let list_key = schedule::list_key(topic, retry.attempts + 1, label);
    let hash_key = schedule::hash_key(topic, retry.offset);

    if let Err(err) = store.rpush(&list_key, &retry.offset.to_string()).await {
        error!(key = %list_key, offset = retry.offset, error = %err, "rpush into tier list failed");
        return Err(err.into());
    }
    if let Err(err) = store.hset(&hash_key, &retry.fields()).await {
        error!(key = %hash_key, offset = retry.offset, error = %err, "retry record write failed");
        return Err(err.into());
    }
    let deadline = schedule::unix_now() + schedule::RECORD_TTL.as_secs() as i64;
    if let Err(err) = store.expire_at(&hash_key, deadline).await {
        error!(key = %hash_key, deadline, error = %err, "retry record expiry failed");
        return Err(err.into());
    }
    Ok(())
}
