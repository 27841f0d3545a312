#[cfg(test)]
#[path = "envelope_test.rs"]
mod tests;

use anyhow::bail;
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;

/// What a finished transport task hands to its completion callback. The
/// status is informational only, success is decided by the envelope.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub error: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    Accepted(T),
    Rejected(String),
}

impl<T> Envelope<T> {
    pub fn reply(self) -> Result<Reply<T>> {
        if let Some(err) = self.error {
            return Ok(Reply::Rejected(err));
        }

        if let Some(data) = self.data {
            return Ok(Reply::Accepted(data));
        }

        bail!("Response envelope carried neither data nor an error")
    }
}

impl RawResponse {
    pub fn new(status: u16, body: &str) -> RawResponse {
        return RawResponse {
            status,
            body: body.to_string(),
        };
    }

    pub fn envelope<T: DeserializeOwned>(&self) -> Result<Envelope<T>> {
        match serde_json::from_str::<Envelope<T>>(&self.body) {
            Ok(envelope) => return Ok(envelope),
            Err(err) => {
                bail!(format!(
                    "Unexpected response body with status {}: {err}",
                    self.status
                ))
            }
        }
    }

    pub fn reply<T: DeserializeOwned>(&self) -> Result<Reply<T>> {
        return self.envelope::<T>()?.reply();
    }
}
