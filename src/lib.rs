/// Mintbook play-money prediction market service
/// Exports all modules for use as a library crate

pub mod app_state;
pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod models;
pub mod store;

pub use app_state::{AppState, SharedState};
pub use config::Config;
pub use engine::{amm, place_wager, resolve_market, SettlementReport, WagerReceipt, MAX_WAGER_AMOUNT};
pub use error::{MarketError, Result};
pub use models::{Bet, Market, Outcome, PricePoint, User};
pub use store::LedgerStore;
