use std::collections::HashMap;

use rquest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{Error, Result};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Sends one event body to its webhook target.
///
/// The body is POSTed as `application/json` by default. If the caller's
/// header map declares `Content-Type: application/x-www-form-urlencoded`
/// the body is re-parsed as a flat string map and sent URL-form-encoded
/// instead. Caller headers are applied last, so they win over defaults.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: rquest::Client,
}

impl WebhookClient {
    pub fn new() -> Self {
        Self {
            client: rquest::Client::new(),
        }
    }

    /// POST `content` to `url` and return the full response body.
    ///
    /// `headers` is the JSON-encoded header map from the event metadata;
    /// an empty string means no extra headers. Any transport failure, and
    /// any failure to interpret `headers` or a form-encoded `content`,
    /// comes back as `Err` with the body never sent.
    pub async fn post(&self, content: &str, url: &str, headers: &str) -> Result<String> {
        debug!(url, content, headers, "posting webhook");

        let extra = parse_headers(headers)?;

        let request = if wants_form_encoding(&extra) {
            let form: HashMap<String, String> =
                serde_json::from_str(content).map_err(Error::payload)?;
            self.client.post(url).form(&form)
        } else {
            self.client
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .body(content.to_owned())
        };

        let response = request.headers(header_map(&extra)?).send().await?;
        let body = response.text().await?;
        debug!(url, body = %body, "webhook target responded");
        Ok(body)
    }
}

fn parse_headers(headers: &str) -> Result<HashMap<String, String>> {
    if headers.is_empty() {
        return Ok(HashMap::new());
    }
    serde_json::from_str(headers).map_err(Error::payload)
}

// The original producers spell the header both ways; nothing else is
// treated as case-insensitive.
fn wants_form_encoding(headers: &HashMap<String, String>) -> bool {
    ["Content-Type", "content-type"]
        .iter()
        .any(|name| headers.get(*name).map(String::as_str) == Some(FORM_URLENCODED))
}

fn header_map(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(Error::payload)?;
        let value = HeaderValue::from_str(value).map_err(Error::payload)?;
        map.insert(name, value);
    }
    Ok(map)
}

/// The acknowledgement shape some targets answer with instead of the
/// literal `success` body.
#[derive(Debug, Default, Deserialize)]
struct Acknowledgement {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    request_id: String,
}

/// Whether a response body fails the success predicate and the event has
/// to be retried.
///
/// Exactly two bodies count as delivered: the literal string `success`,
/// and a JSON record whose `code` field is `"0000"`. Everything else,
/// including the empty body left behind by transport exhaustion, requires
/// a retry.
pub fn needs_retry(body: &str) -> bool {
    if body == "success" {
        debug!("webhook acknowledged with literal body");
        return false;
    }

    match serde_json::from_str::<Acknowledgement>(body) {
        Ok(ack) if ack.code == "0000" => {
            debug!(
                message = %ack.message,
                request_id = %ack.request_id,
                "webhook acknowledged with code 0000"
            );
            false
        }
        Ok(ack) => {
            debug!(code = %ack.code, "webhook response carries a non-success code");
            true
        }
        Err(err) => {
            warn!(body, error = %err, "webhook response is not an acknowledgement");
            true
        }
    }
}
