//! Redis Stream publication of canonical odds rows

use anyhow::{anyhow, Result};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::markets::MarketRow;

pub const ODDS_STREAM: &str = "odds.canonical";

pub struct OddsPublisher {
    redis: redis::aio::ConnectionManager,
}

impl OddsPublisher {
    pub async fn connect_with_retry(url: &str, max_retries: u32) -> Result<Self> {
        let mut attempt = 0;
        loop {
            let result = match redis::Client::open(url) {
                Ok(client) => redis::aio::ConnectionManager::new(client).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(redis) => {
                    info!("Connected to Redis");
                    return Ok(Self { redis });
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_retries {
                        return Err(anyhow!(
                            "Failed to connect to Redis after {} attempts: {}",
                            max_retries,
                            e
                        ));
                    }
                    warn!("Redis connection attempt {} failed: {}. Retrying...", attempt, e);
                    tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                }
            }
        }
    }

    pub async fn publish(&self, run_id: Uuid, rows: &[MarketRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut conn = self.redis.clone();

        for row in rows {
            let _: String = conn.xadd(ODDS_STREAM, "*", &stream_fields(run_id, row)?).await?;
        }

        info!("Published {} odds rows to Redis", rows.len());
        Ok(())
    }
}

fn stream_fields(run_id: Uuid, row: &MarketRow) -> Result<[(&'static str, String); 4]> {
    Ok([
        ("fixture_id", row.fixture_id.to_string()),
        ("market_id", row.market_id.to_string()),
        ("run_id", run_id.to_string()),
        ("data", serde_json::to_string(row)?),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn stream_fields_carry_row_json() {
        let row = MarketRow {
            fixture_id: 5,
            market_id: 12,
            market: "Over/Under".to_string(),
            prices: BTreeMap::from([("bet365_Over2.5".to_string(), "1.90".to_string())]),
        };
        let run_id = Uuid::nil();
        let fields = stream_fields(run_id, &row).unwrap();
        assert_eq!(fields[0], ("fixture_id", "5".to_string()));
        assert_eq!(fields[2].1, Uuid::nil().to_string());
        let data: serde_json::Value = serde_json::from_str(&fields[3].1).unwrap();
        assert_eq!(data["prices"]["bet365_Over2.5"], "1.90");
    }
}
