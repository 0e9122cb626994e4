// Data models for the Mintbook prediction market

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::amm;

/// Side of a binary market. Also doubles as the resolution value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "YES")]
    Yes,
    #[serde(rename = "NO")]
    No,
}

impl Outcome {
    pub fn parse(s: &str) -> Option<Outcome> {
        match s {
            "YES" => Some(Outcome::Yes),
            "NO" => Some(Outcome::No),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Yes => "YES",
            Outcome::No => "NO",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A binary prediction market backed by a constant-product pool pair.
///
/// The pools are mutated only by the wager executor; once `resolved` flips to
/// true the record is immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: String,

    /// Market question (e.g., "Will it rain in Berlin tomorrow?")
    pub question: String,

    pub description: Option<String>,

    /// YES share reserve
    pub yes_shares: f64,

    /// NO share reserve
    pub no_shares: f64,

    /// Cumulative wagered amount, monotonically non-decreasing
    pub volume: f64,

    pub resolved: bool,

    /// Set exactly once, at resolution
    pub resolution: Option<Outcome>,

    /// Wagers are rejected after this instant
    pub closes_at: Option<DateTime<Utc>>,

    /// Only this user may resolve the market
    pub creator_id: String,

    pub created_at: DateTime<Utc>,
}

impl Market {
    /// Seed a market with equal pools and the implied 50% start.
    pub fn new(
        question: String,
        description: Option<String>,
        closes_at: Option<DateTime<Utc>>,
        creator_id: String,
        initial_liquidity: f64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            question,
            description,
            yes_shares: initial_liquidity,
            no_shares: initial_liquidity,
            volume: 0.0,
            resolved: false,
            resolution: None,
            closes_at,
            creator_id,
            created_at: Utc::now(),
        }
    }

    /// Implied probability of the YES outcome from the current pools.
    pub fn probability(&self) -> f64 {
        amm::probability(self.yes_shares, self.no_shares)
    }
}

/// A registered account holding play-money balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub balance: f64,

    /// SHA-256 of the bearer API key; the key itself is never stored
    pub api_key_hash: String,

    pub created_at: DateTime<Utc>,
}

/// Immutable wager record. Append-only; forms the trade history of a market
/// and the basis for settlement payout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    pub id: String,
    pub market_id: String,
    pub user_id: String,

    /// Wagered amount
    pub amount: f64,

    pub outcome: Outcome,

    /// AMM output, redeemable 1:1 at settlement if this bet wins
    pub shares: f64,

    /// Implied probability immediately after this wager
    pub prob_after: f64,

    pub created_at: DateTime<Utc>,
}

/// One probability sample. One row per wager, plus one terminal row at
/// resolution (1.0 for YES, 0.0 for NO).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub market_id: String,
    pub prob: f64,
    pub created_at: DateTime<Utc>,
}

// ===== REQUEST TYPES =====

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateMarketRequest {
    pub question: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub closes_at: Option<DateTime<Utc>>,

    /// Seed for both pools; defaults from configuration
    #[serde(default)]
    pub initial_liquidity: Option<f64>,
}

/// Outcome arrives as a raw string so a malformed value maps to the
/// invalid-argument kind instead of a serde rejection.
#[derive(Debug, Deserialize)]
pub struct WagerRequest {
    pub outcome: String,
    pub amount: f64,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub resolution: String,
}

// ===== RESPONSE TYPES =====

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: String,
    pub name: String,
    pub balance: f64,
    /// Returned exactly once; only its hash is kept
    pub api_key: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub balance: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub id: String,
    pub name: String,
    pub balance: f64,
    pub total_bets: usize,
}

#[derive(Debug, Serialize)]
pub struct MarketSummary {
    pub id: String,
    pub question: String,
    pub description: Option<String>,
    pub probability: f64,
    pub volume: f64,
    pub resolved: bool,
    pub resolution: Option<Outcome>,
    pub creator_name: String,
    pub total_bets: usize,
    pub closes_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct BetView {
    pub id: String,
    pub amount: f64,
    pub outcome: Outcome,
    pub shares: f64,
    pub prob_after: f64,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PricePointView {
    pub prob: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct MarketDetail {
    pub id: String,
    pub question: String,
    pub description: Option<String>,
    pub probability: f64,
    pub yes_shares: f64,
    pub no_shares: f64,
    pub volume: f64,
    pub resolved: bool,
    pub resolution: Option<Outcome>,
    pub creator_name: String,
    pub closes_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub bets: Vec<BetView>,
    pub price_history: Vec<PricePointView>,
}

#[derive(Debug, Serialize)]
pub struct WagerResponse {
    pub id: String,
    pub outcome: Outcome,
    pub amount: f64,
    pub shares: f64,
    pub probability: f64,
    pub new_balance: f64,
}

#[derive(Debug, Serialize)]
pub struct PayoutView {
    pub user_id: String,
    pub amount: f64,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub market_id: String,
    pub resolution: Outcome,
    pub payouts: Vec<PayoutView>,
}
