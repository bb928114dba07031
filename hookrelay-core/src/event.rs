use serde::{Deserialize, Serialize};

/// One webhook delivery request, parsed from the value of a log record.
///
/// `content` is delivered verbatim as the request body; how it is encoded
/// depends on the headers carried in [`EventMeta`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub content: String,
    pub meta: EventMeta,
}

/// Delivery metadata attached to an [`Event`].
///
/// `headers` is a JSON-encoded string-to-string map applied on top of the
/// default request headers. `attempts` and `max_attempts` are advisory
/// counters written by producers; the authoritative retry accounting lives
/// in the retry store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    pub url: String,
    #[serde(default)]
    pub headers: String,
    #[serde(default)]
    pub attempts: i32,
    #[serde(default)]
    pub max_attempts: i32,
}
