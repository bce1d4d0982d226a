//! The slice of the snowbudget REST API the home page reads from.

use crate::error::{BudgetError, Result};
use crate::schema::Envelope;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Classes,
    ResetDates,
    Savings,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Classes => "/get/all",
            Self::ResetDates => "/get/resets",
            Self::Savings => "/get/savings",
        }
    }

    /// Requests with a body go out as POST; `/get/all` is the only endpoint
    /// that accepts one.
    pub fn method(&self, has_body: bool) -> Method {
        match self {
            Self::Classes if has_body => Method::Post,
            _ => Method::Get,
        }
    }

    /// The line shown to the user when this fetch fails.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::Classes => "Failed to retrieve data from server.",
            Self::ResetDates => "Failed to retrieve reset dates from the server.",
            Self::Savings => "Failed to retrieve savings categories from the server.",
        }
    }
}

/// Sends one request and hands back the parsed JSON body.
///
/// Implementations report network and body-decoding problems as
/// [`BudgetError::Transport`] or [`BudgetError::Parse`]; envelope checks are
/// left to [`fetch_payload`].
#[allow(async_fn_in_trait)]
pub trait Backend {
    async fn request(&self, endpoint: &str, method: Method, payload: Option<&Value>) -> Result<Value>;
}

/// Fetches `endpoint` and unwraps its envelope into a list of raw records.
pub async fn fetch_payload<B: Backend>(
    backend: &B,
    endpoint: Endpoint,
    body: Option<&Value>,
) -> Result<Vec<Value>> {
    let path = endpoint.path();
    let raw = backend
        .request(path, endpoint.method(body.is_some()), body)
        .await?;
    let envelope: Envelope<Vec<Value>> =
        serde_json::from_value(raw).map_err(|source| BudgetError::Parse {
            endpoint: path.to_string(),
            source,
        })?;
    envelope.into_payload(path)
}

#[cfg(feature = "http")]
pub use http::HttpBackend;

#[cfg(feature = "http")]
mod http {
    use super::{Backend, Method};
    use crate::config::ClientConfig;
    use crate::error::{BudgetError, Result};
    use reqwest::Client;
    use serde_json::Value;

    #[derive(Clone)]
    pub struct HttpBackend {
        client: Client,
        config: ClientConfig,
    }

    impl HttpBackend {
        pub fn new(config: ClientConfig) -> Self {
            Self {
                client: Client::new(),
                config,
            }
        }
    }

    impl Backend for HttpBackend {
        async fn request(
            &self,
            endpoint: &str,
            method: Method,
            payload: Option<&Value>,
        ) -> Result<Value> {
            let url = self.config.url_for(endpoint);
            let mut request = match method {
                Method::Get => self.client.get(&url),
                Method::Post => self.client.post(&url),
            };
            if let Some(body) = payload {
                request = request.json(body);
            }

            let res = request.send().await?;
            let status = res.status();
            let text = res.text().await?;

            match serde_json::from_str(&text) {
                Ok(value) => Ok(value),
                Err(_) if !status.is_success() => Err(BudgetError::Transport(format!(
                    "{} {} failed (status {}): {}",
                    method, endpoint, status, text
                ))),
                Err(source) => Err(BudgetError::Parse {
                    endpoint: endpoint.to_string(),
                    source,
                }),
            }
        }
    }
}
