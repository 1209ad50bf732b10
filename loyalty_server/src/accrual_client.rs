//! HTTP client for the accrual system.
//!
//! The accrual system answers `GET {address}/api/orders/{number}` with
//! * `200` and a JSON body `{"order": "...", "status": "...", "accrual": 500}` (`accrual` only once processed),
//! * `204` if it has never heard of the order,
//! * `429` with a `Retry-After` header when we call it too often.
//!
//! Anything else means the accrual system is unavailable for now.
use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use log::*;
use loyalty_engine::{
    accrual::{Accrual, AccrualClient, AccrualClientError, AccrualStatus},
    db_types::{OrderNumber, Points},
};
use reqwest::{
    header::{HeaderMap, RETRY_AFTER},
    Client,
    StatusCode,
    Url,
};
use serde::Deserialize;

use crate::errors::ServerError;

/// How long to back off when a 429 response does not say.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct AccrualResponse {
    order: String,
    status: AccrualStatus,
    #[serde(default)]
    accrual: Option<f64>,
}

impl TryFrom<AccrualResponse> for Accrual {
    type Error = AccrualClientError;

    fn try_from(value: AccrualResponse) -> Result<Self, Self::Error> {
        let amount = value
            .accrual
            .map(Points::try_from)
            .transpose()
            .map_err(|e| AccrualClientError::Unavailable(format!("Accrual for order [{}] rejected. {e}", value.order)))?;
        Ok(Accrual { order: OrderNumber::from(value.order), status: value.status, amount })
    }
}

#[derive(Clone)]
pub struct HttpAccrualClient {
    base_url: String,
    client: Arc<Client>,
}

impl HttpAccrualClient {
    /// Creates a client for the accrual system at `address`. Every request is abandoned after `request_timeout`.
    pub fn new(address: &str, request_timeout: Duration) -> Result<Self, ServerError> {
        let base = Url::parse(address)
            .map_err(|e| ServerError::ConfigurationError(format!("Invalid accrual system address {address}. {e}")))?;
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        let base_url = base.as_str().trim_end_matches('/').to_string();
        Ok(Self { base_url, client: Arc::new(client) })
    }

    pub fn url(&self, order: &OrderNumber) -> String {
        format!("{}/api/orders/{}", self.base_url, order.as_str())
    }
}

impl AccrualClient for HttpAccrualClient {
    async fn get_accrual(&self, order: &OrderNumber) -> Result<Accrual, AccrualClientError> {
        let url = self.url(order);
        trace!("🧮️ Querying {url}");
        let response =
            self.client.get(url).send().await.map_err(|e| AccrualClientError::Unavailable(e.to_string()))?;
        match response.status() {
            StatusCode::OK => {
                let body = response
                    .json::<AccrualResponse>()
                    .await
                    .map_err(|e| AccrualClientError::Unavailable(format!("Could not read accrual response. {e}")))?;
                trace!("🧮️ Order {order} is {} with accrual {:?}", body.status, body.accrual);
                Accrual::try_from(body)
            },
            StatusCode::NO_CONTENT => Err(AccrualClientError::NotRegistered(order.clone())),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = parse_retry_after(response.headers(), Utc::now());
                Err(AccrualClientError::TooManyRequests { retry_after })
            },
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(AccrualClientError::Unavailable(format!("Unexpected response ({status}). {message}")))
            },
        }
    }
}

/// `Retry-After` is either a number of seconds, or an HTTP date.
fn parse_retry_after(headers: &HeaderMap, now: DateTime<Utc>) -> Duration {
    let Some(value) = headers.get(RETRY_AFTER).and_then(|v| v.to_str().ok()).map(str::trim) else {
        return DEFAULT_RETRY_AFTER;
    };
    if let Ok(secs) = value.parse::<u64>() {
        return Duration::from_secs(secs);
    }
    match DateTime::parse_from_rfc2822(value) {
        Ok(at) => (at.with_timezone(&Utc) - now).to_std().unwrap_or(Duration::ZERO),
        Err(_) => {
            warn!("🧮️ Could not make sense of Retry-After: {value}. Backing off for {}s", DEFAULT_RETRY_AFTER.as_secs());
            DEFAULT_RETRY_AFTER
        },
    }
}
