// Pricing and transaction core

pub mod amm;
pub mod settle;
pub mod wager;

pub use settle::{resolve_market, Payout, SettlementReport};
pub use wager::{place_wager, WagerReceipt, MAX_WAGER_AMOUNT};
