use anyhow::{Context, Result};
use chrono::{Days, NaiveDate, Utc};
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::client::{ReferenceKind, SportMonksClient};
use crate::config::Config;
use crate::health::HealthState;
use crate::markets::market_rows;
use crate::publish::OddsPublisher;
use crate::store::{lineup_rows, FixtureRow, OddsStore};

/// Includes requested with every fixtures call
pub const FIXTURE_INCLUDES: [&str; 5] = ["localTeam", "visitorTeam", "stats", "lineup", "odds"];

/// Summary of one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    pub fixtures: usize,
    pub rows: usize,
}

/// Fixture and odds ingestion service
pub struct IngestionService {
    config: Config,
    client: SportMonksClient,
    store: OddsStore,
    publisher: Option<OddsPublisher>,
    health: HealthState,
}

impl IngestionService {
    pub async fn new(config: Config) -> Result<Self> {
        let store = OddsStore::connect_with_retry(&config.database_url, 5).await?;

        let publisher = match &config.redis_url {
            Some(url) => Some(OddsPublisher::connect_with_retry(url, 5).await?),
            None => {
                info!("REDIS_URL not set; stream publication disabled");
                None
            }
        };

        let client = SportMonksClient::new(
            &config.base_url,
            &config.api_key,
            &config.timezone,
            config.requests_per_minute,
        )
        .context("Failed to create SportMonks client")?;

        Ok(Self {
            config,
            client,
            store,
            publisher,
            health: HealthState::new(),
        })
    }

    pub fn health(&self) -> HealthState {
        self.health.clone()
    }

    /// Refresh lookup tables; a failing endpoint does not stop the others.
    pub async fn sync_reference_data(&self) -> Result<()> {
        for kind in ReferenceKind::ALL {
            match self.client.reference(kind).await {
                Ok(items) => self.store.upsert_reference(kind, &items).await?,
                Err(e) => warn!("Failed to fetch {}: {}", kind.endpoint(), e),
            }
        }
        Ok(())
    }

    /// Fetch, canonicalize and store one date window.
    pub async fn poll_once(&self) -> Result<PollSummary> {
        let today = Utc::now().date_naive();
        let end = fixture_window_end(today, self.config.lookahead_days);
        let run_id = Uuid::new_v4();

        let fixtures = self
            .client
            .fixtures_between(
                today,
                end,
                &self.config.league_ids,
                &self.config.market_ids,
                &self.config.bookmaker_ids,
                &FIXTURE_INCLUDES,
            )
            .await
            .context("Failed to fetch fixtures")?
            .into_vec();

        let fixture_rows: Vec<FixtureRow> = fixtures.iter().map(FixtureRow::from).collect();
        self.store.upsert_fixtures(&fixture_rows).await?;
        self.store.upsert_lineups(&lineup_rows(&fixtures)).await?;

        let rows = market_rows(&fixtures, &self.config.market_ids);
        self.store.upsert_market_rows(run_id, &rows).await?;

        if let Some(publisher) = &self.publisher {
            publisher.publish(run_id, &rows).await?;
        }

        info!(%run_id, fixtures = fixtures.len(), rows = rows.len(), "poll stored");
        Ok(PollSummary {
            fixtures: fixtures.len(),
            rows: rows.len(),
        })
    }

    /// Main polling loop
    pub async fn run(&self) -> Result<()> {
        info!(
            "Starting ingestion loop (poll interval: {}s)",
            self.config.poll_interval_seconds
        );

        loop {
            let start = std::time::Instant::now();

            match self.poll_once().await {
                Ok(summary) => {
                    self.health.record_success(summary).await;
                    info!(
                        "Poll completed: {} fixtures, {} odds rows in {:?}",
                        summary.fixtures,
                        summary.rows,
                        start.elapsed()
                    );
                }
                Err(e) => {
                    self.health.record_error().await;
                    error!("Poll failed: {:?}", e);
                }
            }

            tokio::time::sleep(Duration::from_secs(self.config.poll_interval_seconds)).await;
        }
    }
}

fn fixture_window_end(start: NaiveDate, lookahead_days: u32) -> NaiveDate {
    start
        .checked_add_days(Days::new(u64::from(lookahead_days)))
        .unwrap_or(start)
}
