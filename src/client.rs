//! SportMonks football API client
//!
//! Every request carries `api_token`, `tz` and `page`. The `data` member of
//! the envelope is unwrapped, further pages are appended, and include
//! wrappers are removed before the value is handed out.

use std::num::NonZeroU32;
use std::time::Duration;

use chrono::NaiveDate;
use governor::{Quota, RateLimiter};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{ApiError, IngestError};
use crate::models::{Fixture, Market, Payload};
use crate::unnest::unnest_response;

pub const DEFAULT_BASE_URL: &str = "https://soccer.sportmonks.com/api/v2.0/";

type DirectRateLimiter =
    RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

/// Includes and filters for one request
#[derive(Debug, Clone, Default)]
pub struct Query {
    includes: Vec<String>,
    params: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, include: &str) -> Self {
        self.includes.push(include.to_string());
        self
    }

    pub fn includes(self, includes: &[&str]) -> Self {
        includes.iter().fold(self, |q, i| q.include(i))
    }

    /// Comma-joined id filter; empty lists are left out.
    pub fn ids(mut self, key: &str, ids: &[i64]) -> Self {
        if !ids.is_empty() {
            self.params.push((key.to_string(), join_ids(ids)));
        }
        self
    }

    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",")
}

/// Reference data endpoints stored as lookup tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Continents,
    Countries,
    Leagues,
    Seasons,
    Bookmakers,
    Markets,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 6] = [
        ReferenceKind::Continents,
        ReferenceKind::Countries,
        ReferenceKind::Leagues,
        ReferenceKind::Seasons,
        ReferenceKind::Bookmakers,
        ReferenceKind::Markets,
    ];

    pub fn endpoint(self) -> &'static str {
        match self {
            ReferenceKind::Continents => "continents",
            ReferenceKind::Countries => "countries",
            ReferenceKind::Leagues => "leagues",
            ReferenceKind::Seasons => "seasons",
            ReferenceKind::Bookmakers => "bookmakers",
            ReferenceKind::Markets => "markets",
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ReferenceItem {
    pub id: i64,
    pub name: String,
    pub league_id: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Envelope {
    data: Option<Value>,
    error: Option<ErrorBody>,
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Meta {
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Pagination {
    current_page: u32,
    total_pages: u32,
}

pub struct SportMonksClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
    timezone: String,
    rate_limiter: DirectRateLimiter,
}

impl SportMonksClient {
    pub fn new(
        base_url: &str,
        api_token: &str,
        timezone: &str,
        requests_per_minute: u32,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(5)
            .build()?;

        let quota = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            timezone: timezone.to_string(),
            rate_limiter: RateLimiter::direct(Quota::per_minute(quota)),
        })
    }

    pub fn endpoint_url(&self, segments: &[String]) -> String {
        format!("{}/{}", self.base_url, segments.join("/"))
    }

    /// GET an endpoint, following pagination, and return the unnested `data`.
    pub async fn get(&self, segments: &[String], query: &Query) -> Result<Value, ApiError> {
        let url = self.endpoint_url(segments);

        let mut params: Vec<(String, String)> = vec![
            ("api_token".to_string(), self.api_token.clone()),
            ("tz".to_string(), self.timezone.clone()),
        ];
        if !query.includes.is_empty() {
            params.push(("include".to_string(), query.includes.join(",")));
        }
        params.extend(query.params.iter().cloned());

        let first = self.fetch_page(&url, &params, 1).await?;
        let mut data = first.data.ok_or(ApiError::MissingData)?;

        let total_pages = first
            .meta
            .and_then(|m| m.pagination)
            .filter(|p| p.current_page <= 1)
            .map(|p| p.total_pages)
            .unwrap_or(1);

        if total_pages > 1 {
            info!(endpoint = %segments.join("/"), total_pages, "response is paginated");
            for page in 2..=total_pages {
                let next = self.fetch_page(&url, &params, page).await?;
                match (&mut data, next.data) {
                    (Value::Array(items), Some(Value::Array(more))) => items.extend(more),
                    (_, None) => warn!(page, "page returned no data"),
                    (_, Some(_)) => {
                        return Err(IngestError::InvalidShape(format!(
                            "page {} of {} is not a list",
                            page,
                            segments.join("/")
                        ))
                        .into())
                    }
                }
            }
        }

        Ok(unnest_response(data)?)
    }

    async fn fetch_page(
        &self,
        url: &str,
        params: &[(String, String)],
        page: u32,
    ) -> Result<Envelope, ApiError> {
        self.rate_limiter.until_ready().await;

        let response = self
            .http
            .get(url)
            .query(params)
            .query(&[("page", page)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(url, page, status = status.as_u16(), "SportMonks response");

        let envelope: Envelope = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ApiError::from_status(status.as_u16(), body));
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(error) = &envelope.error {
            let message = error.message.clone().unwrap_or_default();
            warn!(url, status = status.as_u16(), message = %message, "SportMonks error");
            return Err(ApiError::from_status(status.as_u16(), message));
        }
        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16(), body));
        }

        Ok(envelope)
    }

    /// Fixtures kicking off between two dates (inclusive).
    pub async fn fixtures_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        league_ids: &[i64],
        markets: &[i64],
        bookmakers: &[i64],
        includes: &[&str],
    ) -> Result<Payload<Fixture>, ApiError> {
        let segments = vec![
            "fixtures".to_string(),
            "between".to_string(),
            start.format("%Y-%m-%d").to_string(),
            end.format("%Y-%m-%d").to_string(),
        ];
        let query = Query::new()
            .includes(includes)
            .ids("leagues", league_ids)
            .ids("markets", markets)
            .ids("bookmakers", bookmakers);

        let data = self.get(&segments, &query).await?;
        let fixtures = Payload::from_value(data)?;
        info!(start = %start, end = %end, fixtures = fixtures.len(), "fetched fixtures");
        Ok(fixtures)
    }

    pub async fn fixtures_by_ids(
        &self,
        fixture_ids: &[i64],
        markets: &[i64],
        bookmakers: &[i64],
        includes: &[&str],
    ) -> Result<Payload<Fixture>, ApiError> {
        let segments = vec![
            "fixtures".to_string(),
            "multi".to_string(),
            join_ids(fixture_ids),
        ];
        let query = Query::new()
            .includes(includes)
            .ids("markets", markets)
            .ids("bookmakers", bookmakers);

        Ok(Payload::from_value(self.get(&segments, &query).await?)?)
    }

    /// Odds of one fixture, optionally narrowed to a bookmaker or a market.
    pub async fn fixture_odds(
        &self,
        fixture_id: i64,
        bookmaker_id: Option<i64>,
        market_id: Option<i64>,
    ) -> Result<Vec<Market>, ApiError> {
        let mut segments = vec![
            "odds".to_string(),
            "fixture".to_string(),
            fixture_id.to_string(),
        ];
        match (bookmaker_id, market_id) {
            (Some(b), _) => segments.extend(["bookmaker".to_string(), b.to_string()]),
            (None, Some(m)) => segments.extend(["market".to_string(), m.to_string()]),
            (None, None) => {}
        }

        let data = self.get(&segments, &Query::new()).await?;
        Ok(Payload::from_value(data)?.into_vec())
    }

    pub async fn reference(&self, kind: ReferenceKind) -> Result<Vec<ReferenceItem>, ApiError> {
        let data = self
            .get(&[kind.endpoint().to_string()], &Query::new())
            .await?;
        let items = Payload::from_value(data)?.into_vec();
        info!(endpoint = kind.endpoint(), count = items.len(), "fetched reference data");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_joins_ids_and_skips_empty_lists() {
        let q = Query::new()
            .include("localTeam")
            .includes(&["visitorTeam", "odds"])
            .ids("markets", &[1, 12, 976105])
            .ids("bookmakers", &[]);
        assert_eq!(q.includes, vec!["localTeam", "visitorTeam", "odds"]);
        assert_eq!(q.params, vec![("markets".to_string(), "1,12,976105".to_string())]);
    }

    #[test]
    fn endpoint_url_joins_segments() {
        let client = SportMonksClient::new(DEFAULT_BASE_URL, "key", "UTC", 60).unwrap();
        let url = client.endpoint_url(&["fixtures".into(), "multi".into(), "1,2".into()]);
        assert_eq!(url, "https://soccer.sportmonks.com/api/v2.0/fixtures/multi/1,2");
    }

    #[test]
    fn zero_rate_limit_is_clamped() {
        assert!(SportMonksClient::new(DEFAULT_BASE_URL, "key", "UTC", 0).is_ok());
    }
}
