//! Market validity rules and wide odds rows
//!
//! After canonicalization each bookmaker's odds are checked against the rules
//! of the market they belong to, then folded into one row per fixture and
//! market with a column per `<bookmaker>_<label>[<total>]`.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::canon::{canonicalize, CanonicalOdds, AWAY, DRAW, HOME};
use crate::models::{Fixture, Market};

pub const OVER_UNDER: i64 = 12;
pub const BOTH_TEAMS_TO_SCORE: i64 = 976105;
pub const RESULT_BOTH_TEAMS_TO_SCORE: i64 = 976316;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketRule {
    /// Every label must be `Yes` or `No`, or the bookmaker is dropped
    BothTeamsToScore,
    /// Labels other than `Over` / `Under` are dropped
    OverUnder,
    /// Labels must combine a result and a `Yes` / `No`
    ResultBothTeamsToScore,
    Unrestricted,
}

impl MarketRule {
    pub fn for_market(market_id: i64) -> Self {
        match market_id {
            BOTH_TEAMS_TO_SCORE => Self::BothTeamsToScore,
            OVER_UNDER => Self::OverUnder,
            RESULT_BOTH_TEAMS_TO_SCORE => Self::ResultBothTeamsToScore,
            _ => Self::Unrestricted,
        }
    }

    fn accepts_group(self, odds: &[CanonicalOdds]) -> bool {
        match self {
            Self::BothTeamsToScore => odds.iter().all(|o| o.label == "Yes" || o.label == "No"),
            _ => true,
        }
    }

    fn accepts(self, label: &str) -> bool {
        match self {
            Self::OverUnder => label == "Over" || label == "Under",
            Self::ResultBothTeamsToScore => {
                ["Yes", "No"].iter().any(|q| label.contains(q))
                    && [HOME, DRAW, AWAY].iter().any(|r| label.contains(r))
            }
            _ => true,
        }
    }
}

/// Lines are only kept on the half-goal convention (`2.5`, not `2.0` or `2`).
pub fn is_half_line(total: &str) -> bool {
    match total.trim().split_once('.') {
        Some((_, fraction)) => fraction == "5",
        None => false,
    }
}

/// Apply the market rules to one bookmaker's canonical odds.
pub fn filter_bookmaker_odds(
    market_id: i64,
    bookmaker: &str,
    odds: Vec<CanonicalOdds>,
) -> Vec<CanonicalOdds> {
    let rule = MarketRule::for_market(market_id);

    if !rule.accepts_group(&odds) {
        let labels: Vec<&str> = odds.iter().map(|o| o.label.as_str()).collect();
        warn!(market_id, bookmaker, ?labels, "incorrect labels for market, dropping bookmaker");
        return Vec::new();
    }

    odds.into_iter()
        .filter(|o| {
            if !o.is_resolved() {
                warn!(market_id, bookmaker, label = %o.label, "unresolved team label, dropping");
                return false;
            }
            if !rule.accepts(&o.label) {
                debug!(market_id, bookmaker, label = %o.label, "incorrect label for market");
                return false;
            }
            match o.total.as_deref() {
                Some(total) if !is_half_line(total) => {
                    debug!(market_id, bookmaker, total, "dropping non half-goal line");
                    false
                }
                _ => true,
            }
        })
        .collect()
}

/// One fixture's odds for one market, wide format
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MarketRow {
    pub fixture_id: i64,
    pub market_id: i64,
    pub market: String,
    pub prices: BTreeMap<String, String>,
}

impl MarketRow {
    pub fn column_key(bookmaker: &str, label: &str, total: Option<&str>) -> String {
        format!("{}_{}{}", bookmaker, label, total.map(str::trim).unwrap_or_default())
    }

    /// Market name as used in table and stream names.
    pub fn market_slug(&self) -> String {
        self.market.replace(' ', "_")
    }
}

/// Build the row for one market of a fixture, or `None` if nothing survived.
pub fn market_row(fixture: &Fixture, market: &Market) -> Option<MarketRow> {
    let ctx = match fixture.context() {
        Some(ctx) => ctx,
        None => {
            warn!(fixture_id = fixture.id, "fixture has odds but no team includes, skipping");
            return None;
        }
    };

    let mut prices = BTreeMap::new();
    for bookmaker in &market.bookmaker {
        let canonical = canonicalize(&bookmaker.odds, &ctx);
        for odds in filter_bookmaker_odds(market.id, &bookmaker.name, canonical) {
            let key = MarketRow::column_key(&bookmaker.name, &odds.label, odds.total.as_deref());
            if let Some(previous) = prices.insert(key.clone(), odds.value) {
                debug!(fixture_id = fixture.id, key = %key, previous = %previous, "duplicate column overwritten");
            }
        }
    }

    if prices.is_empty() {
        debug!(fixture_id = fixture.id, market_id = market.id, "no odds survived");
        return None;
    }

    Some(MarketRow {
        fixture_id: fixture.id,
        market_id: market.id,
        market: market.name.clone(),
        prices,
    })
}

/// Rows for every wanted market of every fixture. An empty `wanted` list
/// keeps all markets.
pub fn market_rows(fixtures: &[Fixture], wanted: &[i64]) -> Vec<MarketRow> {
    let mut rows = Vec::new();
    for fixture in fixtures {
        if fixture.odds.is_empty() {
            debug!(fixture_id = fixture.id, "no odds included");
            continue;
        }
        rows.extend(
            fixture
                .odds
                .iter()
                .filter(|m| wanted.is_empty() || wanted.contains(&m.id))
                .filter_map(|m| market_row(fixture, m)),
        );
    }
    info!(fixtures = fixtures.len(), rows = rows.len(), "built market rows");
    rows
}
