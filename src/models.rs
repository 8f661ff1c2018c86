//! SportMonks fixture and odds structures
//!
//! These describe the payload *after* include wrappers have been removed
//! (see [`crate::unnest`]): `odds`, `bookmaker` and the inner `odds` lists are
//! plain arrays, and `localTeam`/`visitorTeam` are plain objects.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::IngestError;

/// A fixture as returned by the fixtures endpoints
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Fixture {
    pub id: i64,
    pub league_id: Option<i64>,
    pub season_id: Option<i64>,
    #[serde(rename = "localTeam")]
    pub local_team: Option<Team>,
    #[serde(rename = "visitorTeam")]
    pub visitor_team: Option<Team>,
    pub time: Option<FixtureTime>,
    pub scores: Option<Scores>,
    #[serde(deserialize_with = "null_as_default")]
    pub stats: Vec<Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub odds: Vec<Market>,
    #[serde(deserialize_with = "null_as_default")]
    pub lineup: Vec<LineupPlayer>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub short_code: Option<String>,
}

/// A starting player from the `lineup` include
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LineupPlayer {
    pub team_id: Option<i64>,
    pub fixture_id: Option<i64>,
    pub player_id: Option<i64>,
    pub player_name: Option<String>,
    pub number: Option<i32>,
    pub position: Option<String>,
    pub formation_position: Option<i32>,
    pub captain: Option<bool>,
    pub stats: Option<Value>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct FixtureTime {
    pub status: Option<String>,
    pub starting_at: Option<StartingAt>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct StartingAt {
    pub date_time: Option<String>,
    pub timestamp: Option<i64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Scores {
    pub localteam_score: Option<i32>,
    pub visitorteam_score: Option<i32>,
}

/// A betting market with the odds of every requested bookmaker
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Market {
    pub id: i64,
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub bookmaker: Vec<BookmakerOdds>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct BookmakerOdds {
    pub id: i64,
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub odds: Vec<OddsEntry>,
}

/// One priced outcome as labelled by a bookmaker
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct OddsEntry {
    pub label: String,
    #[serde(deserialize_with = "string_or_number")]
    pub value: String,
    #[serde(deserialize_with = "opt_string_or_number")]
    pub total: Option<String>,
}

impl OddsEntry {
    pub fn new(label: &str, value: &str, total: Option<&str>) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
            total: total.map(str::to_string),
        }
    }
}

/// Team names consumed by label resolution; one per fixture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureContext {
    pub home: String,
    pub away: String,
    pub home_short: Option<String>,
    pub away_short: Option<String>,
}

impl FixtureContext {
    pub fn new(home: &str, away: &str) -> Self {
        Self {
            home: home.to_string(),
            away: away.to_string(),
            home_short: None,
            away_short: None,
        }
    }

    pub fn with_short_codes(mut self, home_short: &str, away_short: &str) -> Self {
        self.home_short = Some(home_short.to_string());
        self.away_short = Some(away_short.to_string());
        self
    }
}

impl Fixture {
    /// Team context for label resolution, if both teams were included.
    pub fn context(&self) -> Option<FixtureContext> {
        let home = self.local_team.as_ref()?;
        let away = self.visitor_team.as_ref()?;
        Some(FixtureContext {
            home: home.name.clone(),
            away: away.name.clone(),
            home_short: home.short_code.clone().filter(|s| !s.is_empty()),
            away_short: away.short_code.clone().filter(|s| !s.is_empty()),
        })
    }
}

/// A response that is either a single object or a list of objects.
///
/// The shape is decided once at the boundary; nothing downstream re-checks it.
#[derive(Debug, Clone)]
pub enum Payload<T> {
    Single(T),
    Many(Vec<T>),
}

impl<T: DeserializeOwned> Payload<T> {
    pub fn from_value(value: Value) -> Result<Self, IngestError> {
        match value {
            Value::Object(_) => Ok(Self::Single(serde_json::from_value(value)?)),
            Value::Array(items) => {
                if let Some(bad) = items.iter().find(|v| !v.is_object()) {
                    return Err(IngestError::InvalidShape(format!(
                        "expected a list of objects, found element of type {}",
                        json_kind(bad)
                    )));
                }
                let decoded = items
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<Result<Vec<T>, _>>()?;
                Ok(Self::Many(decoded))
            }
            other => Err(IngestError::InvalidShape(format!(
                "expected an object or a list of objects, found {}",
                json_kind(&other)
            ))),
        }
    }
}

impl<T> Payload<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Single(item) => vec![item],
            Self::Many(items) => items,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Prices and lines arrive as strings, but some feeds send bare numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_string_or_number(deserializer)?.unwrap_or_default())
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, found {}",
            json_kind(&other)
        ))),
    }
}
