//! PostgreSQL persistence
//!
//! Tables are expected to exist; `sql/schema.sql` describes them.

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::{ReferenceItem, ReferenceKind};
use crate::markets::MarketRow;
use crate::models::Fixture;

/// Flat fixture record, odds and lineups excluded
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureRow {
    pub id: i64,
    pub league_id: Option<i64>,
    pub season_id: Option<i64>,
    pub starting_at: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub home_team_id: Option<i64>,
    pub home_team: Option<String>,
    pub home_short: Option<String>,
    pub away_team_id: Option<i64>,
    pub away_team: Option<String>,
    pub away_short: Option<String>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub home_stats: Value,
    pub away_stats: Value,
}

impl From<&Fixture> for FixtureRow {
    fn from(fixture: &Fixture) -> Self {
        // Stats only split cleanly when both teams are present.
        let (home_stats, away_stats) = match fixture.stats.as_slice() {
            [home, away] => (home.clone(), away.clone()),
            other => {
                if !other.is_empty() {
                    info!(fixture_id = fixture.id, len = other.len(), "unexpected statistics length");
                }
                (Value::Object(Default::default()), Value::Object(Default::default()))
            }
        };

        let starting_at = fixture.time.as_ref().and_then(|t| t.starting_at.as_ref());
        let starting_at = starting_at
            .and_then(|s| s.timestamp)
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .or_else(|| {
                starting_at
                    .and_then(|s| s.date_time.as_deref())
                    .and_then(|dt| NaiveDateTime::parse_from_str(dt, "%Y-%m-%d %H:%M:%S").ok())
                    .map(|naive| naive.and_utc())
            });

        let home = fixture.local_team.as_ref();
        let away = fixture.visitor_team.as_ref();

        Self {
            id: fixture.id,
            league_id: fixture.league_id,
            season_id: fixture.season_id,
            starting_at,
            status: fixture.time.as_ref().and_then(|t| t.status.clone()),
            home_team_id: home.map(|t| t.id),
            home_team: home.map(|t| t.name.clone()),
            home_short: home.and_then(|t| t.short_code.clone()),
            away_team_id: away.map(|t| t.id),
            away_team: away.map(|t| t.name.clone()),
            away_short: away.and_then(|t| t.short_code.clone()),
            home_score: fixture.scores.as_ref().and_then(|s| s.localteam_score),
            away_score: fixture.scores.as_ref().and_then(|s| s.visitorteam_score),
            home_stats,
            away_stats,
        }
    }
}

/// One player of a fixture lineup
#[derive(Debug, Clone, PartialEq)]
pub struct LineupRow {
    pub fixture_id: i64,
    pub player_id: i64,
    pub team_id: Option<i64>,
    pub player_name: Option<String>,
    pub number: Option<i32>,
    pub position: Option<String>,
    pub formation_position: Option<i32>,
    pub captain: bool,
    pub stats: Value,
}

/// Lineup rows of every fixture; players without an id are skipped.
pub fn lineup_rows(fixtures: &[Fixture]) -> Vec<LineupRow> {
    let mut rows = Vec::new();
    for fixture in fixtures {
        for player in &fixture.lineup {
            let Some(player_id) = player.player_id else {
                debug!(fixture_id = fixture.id, name = ?player.player_name, "lineup entry without player id");
                continue;
            };
            rows.push(LineupRow {
                fixture_id: player.fixture_id.unwrap_or(fixture.id),
                player_id,
                team_id: player.team_id,
                player_name: player.player_name.clone(),
                number: player.number,
                position: player.position.clone(),
                formation_position: player.formation_position,
                captain: player.captain.unwrap_or(false),
                stats: player
                    .stats
                    .clone()
                    .unwrap_or_else(|| Value::Object(Default::default())),
            });
        }
    }
    rows
}

fn reference_table(kind: ReferenceKind) -> &'static str {
    match kind {
        ReferenceKind::Continents => "continents",
        ReferenceKind::Countries => "countries",
        ReferenceKind::Leagues => "leagues",
        ReferenceKind::Seasons => "seasons",
        ReferenceKind::Bookmakers => "bookmakers",
        ReferenceKind::Markets => "markets",
    }
}

pub struct OddsStore {
    db: PgPool,
}

impl OddsStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn connect_with_retry(url: &str, max_retries: u32) -> Result<Self> {
        let mut attempt = 0;
        loop {
            match PgPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(Duration::from_secs(10))
                .connect(url)
                .await
            {
                Ok(pool) => {
                    info!("Connected to PostgreSQL");
                    return Ok(Self::new(pool));
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_retries {
                        return Err(anyhow!(
                            "Failed to connect to database after {} attempts: {}",
                            max_retries,
                            e
                        ));
                    }
                    warn!("Database connection attempt {} failed: {}. Retrying...", attempt, e);
                    tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                }
            }
        }
    }

    /// Fixtures go in before their odds rows, which reference them.
    pub async fn upsert_fixtures(&self, rows: &[FixtureRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.db.begin().await?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO fixtures (
                    id, league_id, season_id, starting_at, status,
                    home_team_id, home_team, home_short,
                    away_team_id, away_team, away_short,
                    home_score, away_score, home_stats, away_stats
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                ON CONFLICT (id) DO UPDATE SET
                    league_id = EXCLUDED.league_id,
                    season_id = EXCLUDED.season_id,
                    starting_at = EXCLUDED.starting_at,
                    status = EXCLUDED.status,
                    home_team_id = EXCLUDED.home_team_id,
                    home_team = EXCLUDED.home_team,
                    home_short = EXCLUDED.home_short,
                    away_team_id = EXCLUDED.away_team_id,
                    away_team = EXCLUDED.away_team,
                    away_short = EXCLUDED.away_short,
                    home_score = EXCLUDED.home_score,
                    away_score = EXCLUDED.away_score,
                    home_stats = EXCLUDED.home_stats,
                    away_stats = EXCLUDED.away_stats
                "#,
            )
            .bind(row.id)
            .bind(row.league_id)
            .bind(row.season_id)
            .bind(row.starting_at)
            .bind(&row.status)
            .bind(row.home_team_id)
            .bind(&row.home_team)
            .bind(&row.home_short)
            .bind(row.away_team_id)
            .bind(&row.away_team)
            .bind(&row.away_short)
            .bind(row.home_score)
            .bind(row.away_score)
            .bind(&row.home_stats)
            .bind(&row.away_stats)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!("Stored {} fixtures", rows.len());
        Ok(())
    }

    /// Lineups reference their fixture, so they follow `upsert_fixtures`.
    pub async fn upsert_lineups(&self, rows: &[LineupRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.db.begin().await?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO fixture_players (
                    fixture_id, player_id, team_id, player_name, number,
                    position, formation_position, captain, stats
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (fixture_id, player_id) DO UPDATE SET
                    team_id = EXCLUDED.team_id,
                    player_name = EXCLUDED.player_name,
                    number = EXCLUDED.number,
                    position = EXCLUDED.position,
                    formation_position = EXCLUDED.formation_position,
                    captain = EXCLUDED.captain,
                    stats = EXCLUDED.stats
                "#,
            )
            .bind(row.fixture_id)
            .bind(row.player_id)
            .bind(row.team_id)
            .bind(&row.player_name)
            .bind(row.number)
            .bind(&row.position)
            .bind(row.formation_position)
            .bind(row.captain)
            .bind(&row.stats)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!("Stored {} lineup players", rows.len());
        Ok(())
    }

    /// Upsert wide odds rows; price columns are merged so newer values win.
    pub async fn upsert_market_rows(&self, run_id: Uuid, rows: &[MarketRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.db.begin().await?;

        for row in rows {
            let prices = serde_json::to_value(&row.prices)?;
            sqlx::query(
                r#"
                INSERT INTO fixture_odds (fixture_id, market_id, market, prices, ingest_run_id, ingested_at)
                VALUES ($1, $2, $3, $4, $5, NOW())
                ON CONFLICT (fixture_id, market_id) DO UPDATE SET
                    market = EXCLUDED.market,
                    prices = fixture_odds.prices || EXCLUDED.prices,
                    ingest_run_id = EXCLUDED.ingest_run_id,
                    ingested_at = EXCLUDED.ingested_at
                "#,
            )
            .bind(row.fixture_id)
            .bind(row.market_id)
            .bind(&row.market)
            .bind(prices)
            .bind(run_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!("Stored {} odds rows", rows.len());
        Ok(())
    }

    pub async fn upsert_reference(&self, kind: ReferenceKind, items: &[ReferenceItem]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let table = reference_table(kind);
        let statement = format!(
            r#"
            INSERT INTO {table} (id, name, league_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                league_id = EXCLUDED.league_id
            "#
        );

        let mut tx = self.db.begin().await?;
        for item in items {
            sqlx::query(&statement)
                .bind(item.id)
                .bind(&item.name)
                .bind(item.league_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        info!("Stored {} {}", items.len(), table);
        Ok(())
    }
}
