//! SportMonks football fixtures and odds ingestion.
//!
//! Fixtures are fetched from the SportMonks API, their odds labels are
//! canonicalized to the `1` / `X` / `2` vocabulary across bookmakers, and the
//! result is stored in PostgreSQL as one wide row per fixture and market.

pub mod canon;
pub mod client;
pub mod config;
pub mod error;
pub mod health;
pub mod markets;
pub mod models;
pub mod publish;
pub mod service;
pub mod store;
pub mod unnest;

pub use canon::{canonicalize, CanonicalOdds, Resolution, Rule, Side};
pub use client::{Query, ReferenceKind, SportMonksClient};
pub use config::Config;
pub use error::{ApiError, IngestError};
pub use markets::{market_rows, MarketRow};
pub use models::{Fixture, FixtureContext, OddsEntry, Payload};
