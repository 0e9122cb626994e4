// Market settlement
//
// Resolution is a one-shot, creator-only transaction: pick the winning side,
// credit every winning bet its recorded share count (shares redeem 1:1 for
// currency, the original stake is not returned), flip the market to resolved,
// and append the terminal 0/1 price point. The pools are not touched.

use chrono::Utc;

use crate::error::{MarketError, Result};
use crate::models::{Outcome, PricePoint};
use crate::store::LedgerStore;

#[derive(Debug, Clone)]
pub struct Payout {
    pub user_id: String,
    pub amount: f64,
}

#[derive(Debug)]
pub struct SettlementReport {
    pub market_id: String,
    pub resolution: Outcome,
    pub payouts: Vec<Payout>,
}

pub fn resolve_market(
    store: &LedgerStore,
    market_id: &str,
    caller_id: &str,
    resolution: Outcome,
) -> Result<SettlementReport> {
    let market_lock = store.market_lock(market_id);
    let _market_guard = market_lock.acquire();

    let mut market = store
        .get_market(market_id)?
        .ok_or_else(|| MarketError::NotFound("Market not found".into()))?;
    if market.resolved {
        return Err(MarketError::InvalidState(
            "Market is already resolved".into(),
        ));
    }
    if market.creator_id != caller_id {
        return Err(MarketError::Forbidden(
            "Only the market creator can resolve this market".into(),
        ));
    }

    let bets = store.bets_for_market(market_id)?;
    let winning: Vec<_> = bets.iter().filter(|b| b.outcome == resolution).collect();

    // Winner locks in sorted order, acquired while the market lock is held
    let mut winner_ids: Vec<String> = winning.iter().map(|b| b.user_id.clone()).collect();
    winner_ids.sort();
    winner_ids.dedup();
    let user_locks: Vec<_> = winner_ids.iter().map(|id| store.user_lock(id)).collect();
    let _user_guards: Vec<_> = user_locks.iter().map(|l| l.acquire()).collect();

    let mut batch = sled::Batch::default();

    // One balance write per winner, one payout entry per winning bet
    for user_id in &winner_ids {
        let credit: f64 = winning
            .iter()
            .filter(|b| &b.user_id == user_id)
            .map(|b| b.shares)
            .sum();
        let mut user = store
            .get_user(user_id)?
            .ok_or_else(|| MarketError::NotFound(format!("User {} not found", user_id)))?;
        user.balance += credit;
        store.stage_user(&mut batch, &user)?;
    }
    let payouts: Vec<Payout> = winning
        .iter()
        .map(|b| Payout {
            user_id: b.user_id.clone(),
            amount: b.shares,
        })
        .collect();

    market.resolved = true;
    market.resolution = Some(resolution);
    store.stage_market(&mut batch, &market)?;

    let terminal = PricePoint {
        market_id: market.id.clone(),
        prob: match resolution {
            Outcome::Yes => 1.0,
            Outcome::No => 0.0,
        },
        created_at: Utc::now(),
    };
    store.stage_point(&mut batch, &terminal, store.next_seq()?)?;

    store.commit(batch)?;

    tracing::info!(
        market = %market.id,
        resolution = %resolution,
        winners = winner_ids.len(),
        paid = payouts.iter().map(|p| p.amount).sum::<f64>(),
        "market resolved"
    );

    Ok(SettlementReport {
        market_id: market.id,
        resolution,
        payouts,
    })
}
