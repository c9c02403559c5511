use std::thread;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use rayon::prelude::*;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::DigestConfig;
use crate::domain::{ActivityRecord, DayRecordSet};
use crate::error::DigestError;

/// Source of per-day activity snapshots.
///
/// Each call returns everything the archive has accumulated up to and including
/// `day`, not only what happened on that day.
pub trait ArchiveClient: Send + Sync {
    fn fetch_day(&self, day: NaiveDate) -> Result<DayRecordSet, DigestError>;
}

#[derive(Debug, Deserialize)]
struct ActivitiesPayload {
    items: Vec<ActivityItem>,
}

#[derive(Debug, Deserialize)]
struct ActivityItem {
    key: String,
    count: f64,
}

/// Parses an `/api/activities` response body into the day's record set.
pub fn parse_activities(day: NaiveDate, body: &str) -> Result<DayRecordSet, DigestError> {
    let payload: ActivitiesPayload =
        serde_json::from_str(body).map_err(|err| DigestError::ArchivePayload {
            day,
            message: err.to_string(),
        })?;
    let records = payload
        .items
        .into_iter()
        .map(|item| ActivityRecord::from_raw(item.key, item.count))
        .collect();
    Ok(DayRecordSet::new(day, records))
}

#[derive(Clone)]
pub struct ArchiveHttpClient {
    client: Client,
    base_url: String,
    access_token: String,
    collection: String,
    max_retries: usize,
    retry_base_delay_ms: u64,
}

impl ArchiveHttpClient {
    pub fn new(config: &DigestConfig) -> Result<Self, DigestError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("activity-digest/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| DigestError::Config(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|err| DigestError::Config(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            collection: config.collection.clone(),
            max_retries: config.max_retries,
            retry_base_delay_ms: config.retry_base_delay_ms,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/activities", self.base_url)
    }

    /// Request URL with the token masked, for logs.
    pub fn redacted_url(&self, day: NaiveDate) -> String {
        format!(
            "{}?access_token=***&set={}&toDate={}",
            self.endpoint(),
            self.collection,
            day.format("%Y-%m-%d")
        )
    }

    fn handle_status(
        day: NaiveDate,
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, DigestError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "archive request failed".to_string());
        Err(DigestError::ArchiveStatus {
            day,
            status,
            message,
        })
    }

    fn send_with_retries<F>(
        &self,
        day: NaiveDate,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, DigestError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < self.max_retries && is_retryable_status(status) {
                        warn!(%day, status, attempt = attempt + 1, "retrying archive request");
                        self.backoff(attempt);
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    // the URL carries the access token
                    let err = err.without_url();
                    if attempt < self.max_retries && is_retryable_error(&err) {
                        warn!(%day, error = %err, attempt = attempt + 1, "retrying archive request");
                        self.backoff(attempt);
                        attempt += 1;
                        continue;
                    }
                    return Err(DigestError::ArchiveHttp {
                        day,
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    fn backoff(&self, attempt: usize) {
        let delay = self.retry_base_delay_ms * (attempt as u64 + 1);
        thread::sleep(Duration::from_millis(delay));
    }
}

impl ArchiveClient for ArchiveHttpClient {
    fn fetch_day(&self, day: NaiveDate) -> Result<DayRecordSet, DigestError> {
        let url = self.endpoint();
        let to_date = day.format("%Y-%m-%d").to_string();
        debug!(url = %self.redacted_url(day), "archive.request");
        let start = Instant::now();
        let response = self.send_with_retries(day, || {
            self.client.get(&url).query(&[
                ("access_token", self.access_token.as_str()),
                ("set", self.collection.as_str()),
                ("toDate", to_date.as_str()),
            ])
        })?;
        let response = Self::handle_status(day, response)?;
        let body = response.text().map_err(|err| DigestError::ArchiveHttp {
            day,
            message: err.without_url().to_string(),
        })?;
        let records = parse_activities(day, &body)?;
        debug!(
            %day,
            items = records.records().len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "archive.response"
        );
        Ok(records)
    }
}

/// Fetches every day on a bounded pool and returns the sets in day order.
///
/// All requests run to completion. If any failed, the error for the earliest
/// day is returned.
pub fn fetch_window<C: ArchiveClient>(
    client: &C,
    days: &[NaiveDate],
    max_parallel: usize,
) -> Result<Vec<DayRecordSet>, DigestError> {
    let threads = max_parallel.min(days.len()).max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|idx| format!("archive-fetch-{idx}"))
        .build()
        .map_err(|err| DigestError::Config(err.to_string()))?;

    let results: Vec<Result<DayRecordSet, DigestError>> =
        pool.install(|| days.par_iter().map(|day| client.fetch_day(*day)).collect());

    results.into_iter().collect()
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_token() {
        let mut config = DigestConfig::with_token("secret-token");
        config.base_url = "https://archive.example/".to_string();
        let client = ArchiveHttpClient::new(&config).unwrap();
        let day = NaiveDate::from_ymd_opt(2021, 3, 8).unwrap();
        let url = client.redacted_url(day);
        assert_eq!(
            url,
            "https://archive.example/api/activities?access_token=***&set=slnsw&toDate=2021-03-08"
        );
        assert!(!url.contains("secret-token"));
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(429));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(401));
    }
}
