// Wager execution
//
// One wager is one atomic unit of work against the ledger store: validate
// market and user state, quote the share payout, then commit the updated
// market, the debited user, the bet row, and the price point together. Any
// precondition failure aborts before a single write is staged.

use chrono::Utc;
use uuid::Uuid;

use crate::engine::amm;
use crate::error::{MarketError, Result};
use crate::models::{Bet, Outcome, PricePoint};
use crate::store::LedgerStore;

/// Per-wager ceiling in currency units.
pub const MAX_WAGER_AMOUNT: f64 = 10_000.0;

#[derive(Debug)]
pub struct WagerReceipt {
    pub bet: Bet,
    pub new_balance: f64,
    pub probability: f64,
}

pub fn place_wager(
    store: &LedgerStore,
    market_id: &str,
    user_id: &str,
    outcome: Outcome,
    amount: f64,
) -> Result<WagerReceipt> {
    if !amount.is_finite() || amount <= 0.0 || amount > MAX_WAGER_AMOUNT {
        return Err(MarketError::InvalidArgument(format!(
            "amount must be a positive number (max {})",
            MAX_WAGER_AMOUNT
        )));
    }

    // Market lock first, then the user lock; held until the batch commits
    let market_lock = store.market_lock(market_id);
    let _market_guard = market_lock.acquire();
    let user_lock = store.user_lock(user_id);
    let _user_guard = user_lock.acquire();

    let mut market = store
        .get_market(market_id)?
        .ok_or_else(|| MarketError::NotFound("Market not found".into()))?;
    if market.resolved {
        return Err(MarketError::InvalidState("Market is resolved".into()));
    }
    if let Some(closes_at) = market.closes_at {
        if Utc::now() > closes_at {
            return Err(MarketError::InvalidState("Market is closed".into()));
        }
    }

    // Re-read under the lock so a stale balance from request time cannot win
    let mut user = store
        .get_user(user_id)?
        .ok_or_else(|| MarketError::NotFound("User not found".into()))?;
    if user.balance < amount {
        return Err(MarketError::InvalidState(format!(
            "Insufficient balance. You have Ṁ{:.0}",
            user.balance
        )));
    }

    let shares = amm::quote(market.yes_shares, market.no_shares, outcome, amount);
    match outcome {
        Outcome::Yes => {
            market.yes_shares -= shares;
            market.no_shares += amount;
        }
        Outcome::No => {
            market.yes_shares += amount;
            market.no_shares -= shares;
        }
    }
    market.volume += amount;

    let prob_after = amm::probability(market.yes_shares, market.no_shares);
    user.balance -= amount;

    let now = Utc::now();
    let bet = Bet {
        id: Uuid::new_v4().to_string(),
        market_id: market.id.clone(),
        user_id: user.id.clone(),
        amount,
        outcome,
        shares,
        prob_after,
        created_at: now,
    };
    let point = PricePoint {
        market_id: market.id.clone(),
        prob: prob_after,
        created_at: now,
    };

    let mut batch = sled::Batch::default();
    store.stage_market(&mut batch, &market)?;
    store.stage_user(&mut batch, &user)?;
    store.stage_bet(&mut batch, &bet, store.next_seq()?)?;
    store.stage_point(&mut batch, &point, store.next_seq()?)?;
    store.commit(batch)?;

    tracing::info!(
        market = %market.id,
        user = %user.id,
        outcome = %outcome,
        amount,
        shares,
        prob = prob_after,
        "wager committed"
    );

    Ok(WagerReceipt {
        bet,
        new_balance: user.balance,
        probability: prob_after,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Market, User};
    use crate::store::LedgerStore;
    use std::sync::Arc;

    fn seed_user(store: &LedgerStore, id: &str, balance: f64) -> User {
        let user = User {
            id: id.to_string(),
            name: format!("user {}", id),
            balance,
            api_key_hash: format!("hash-{}", id),
            created_at: Utc::now(),
        };
        store.create_user(&user).unwrap();
        user
    }

    fn seed_market(store: &LedgerStore, id: &str, liquidity: f64) -> Market {
        let mut market = Market::new(
            "Will the tests pass?".into(),
            None,
            None,
            "creator".into(),
            liquidity,
        );
        market.id = id.to_string();
        let point = PricePoint {
            market_id: market.id.clone(),
            prob: market.probability(),
            created_at: market.created_at,
        };
        store.create_market(&market, &point).unwrap();
        market
    }

    #[test]
    fn test_wager_on_fresh_market() {
        let store = LedgerStore::temporary().unwrap();
        seed_market(&store, "m1", 100.0);
        seed_user(&store, "alice", 1000.0);

        let receipt = place_wager(&store, "m1", "alice", Outcome::Yes, 50.0).unwrap();

        assert!((receipt.bet.shares - 33.333333333333336).abs() < 1e-9);
        assert!((receipt.probability - 0.6923076923076923).abs() < 1e-9);
        assert!((receipt.new_balance - 950.0).abs() < 1e-9);

        let market = store.get_market("m1").unwrap().unwrap();
        assert!((market.yes_shares - 66.66666666666667).abs() < 1e-9);
        assert!((market.no_shares - 150.0).abs() < 1e-9);
        assert!((market.volume - 50.0).abs() < 1e-12);

        let alice = store.get_user("alice").unwrap().unwrap();
        assert!((alice.balance - 950.0).abs() < 1e-9);

        // Bet row and price point were appended in the same commit
        let bets = store.bets_for_market("m1").unwrap();
        assert_eq!(bets.len(), 1);
        assert_eq!(bets[0].outcome, Outcome::Yes);
        let points = store.price_points_for_market("m1").unwrap();
        assert_eq!(points.len(), 2);
        assert!((points[1].prob - receipt.probability).abs() < 1e-12);
    }

    #[test]
    fn test_second_wager_sees_post_trade_pools() {
        let store = LedgerStore::temporary().unwrap();
        let market = seed_market(&store, "m1", 100.0);
        let k0 = market.yes_shares * market.no_shares;
        seed_user(&store, "alice", 1000.0);
        seed_user(&store, "bob", 1000.0);

        place_wager(&store, "m1", "alice", Outcome::Yes, 50.0).unwrap();
        let receipt = place_wager(&store, "m1", "bob", Outcome::No, 50.0).unwrap();

        let updated = store.get_market("m1").unwrap().unwrap();

        // Bob's quote ran against the post-Alice pools, and the product still
        // matches the creation-time constant
        let expected_shares = 150.0 - k0 / (66.66666666666667 + 50.0);
        assert!((receipt.bet.shares - expected_shares).abs() < 1e-6);
        let product = updated.yes_shares * updated.no_shares;
        assert!(((product - k0) / k0).abs() < amm::PRODUCT_TOLERANCE);
        assert!((updated.volume - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_closed_market_rejected_without_writes() {
        let store = LedgerStore::temporary().unwrap();
        let mut market = Market::new(
            "Closed already?".into(),
            None,
            Some(Utc::now() - chrono::Duration::hours(1)),
            "creator".into(),
            100.0,
        );
        market.id = "m1".into();
        let point = PricePoint {
            market_id: "m1".into(),
            prob: 0.5,
            created_at: market.created_at,
        };
        store.create_market(&market, &point).unwrap();
        seed_user(&store, "alice", 1000.0);

        let err = place_wager(&store, "m1", "alice", Outcome::Yes, 50.0).unwrap_err();
        assert!(matches!(err, MarketError::InvalidState(_)));

        let market = store.get_market("m1").unwrap().unwrap();
        assert_eq!(market.yes_shares, 100.0);
        assert_eq!(market.volume, 0.0);
        assert_eq!(store.get_user("alice").unwrap().unwrap().balance, 1000.0);
        assert!(store.bets_for_market("m1").unwrap().is_empty());
    }

    #[test]
    fn test_insufficient_balance_rejected_without_writes() {
        let store = LedgerStore::temporary().unwrap();
        seed_market(&store, "m1", 100.0);
        seed_user(&store, "alice", 20.0);

        let err = place_wager(&store, "m1", "alice", Outcome::No, 50.0).unwrap_err();
        match err {
            MarketError::InvalidState(msg) => assert!(msg.contains("Insufficient balance")),
            other => panic!("unexpected error: {:?}", other),
        }

        assert_eq!(store.get_user("alice").unwrap().unwrap().balance, 20.0);
        assert_eq!(store.get_market("m1").unwrap().unwrap().volume, 0.0);
        assert!(store.bets_for_market("m1").unwrap().is_empty());
    }

    #[test]
    fn test_degenerate_amounts_rejected() {
        let store = LedgerStore::temporary().unwrap();
        seed_market(&store, "m1", 100.0);
        seed_user(&store, "alice", 1000.0);

        for amount in [0.0, -5.0, f64::NAN, f64::INFINITY, MAX_WAGER_AMOUNT + 1.0] {
            let err = place_wager(&store, "m1", "alice", Outcome::Yes, amount).unwrap_err();
            assert!(matches!(err, MarketError::InvalidArgument(_)));
        }
        assert_eq!(store.get_user("alice").unwrap().unwrap().balance, 1000.0);
    }

    #[test]
    fn test_resolved_market_rejected() {
        let store = LedgerStore::temporary().unwrap();
        let mut market = seed_market(&store, "m1", 100.0);
        market.resolved = true;
        market.resolution = Some(Outcome::Yes);
        let mut batch = sled::Batch::default();
        store.stage_market(&mut batch, &market).unwrap();
        store.commit(batch).unwrap();
        seed_user(&store, "alice", 1000.0);

        let err = place_wager(&store, "m1", "alice", Outcome::Yes, 50.0).unwrap_err();
        assert!(matches!(err, MarketError::InvalidState(_)));
    }

    #[test]
    fn test_unknown_ids_rejected() {
        let store = LedgerStore::temporary().unwrap();
        seed_market(&store, "m1", 100.0);
        seed_user(&store, "alice", 1000.0);

        let err = place_wager(&store, "ghost", "alice", Outcome::Yes, 10.0).unwrap_err();
        assert!(matches!(err, MarketError::NotFound(_)));
        let err = place_wager(&store, "m1", "ghost", Outcome::Yes, 10.0).unwrap_err();
        assert!(matches!(err, MarketError::NotFound(_)));
    }

    #[test]
    fn test_volume_matches_total_debits() {
        let store = LedgerStore::temporary().unwrap();
        seed_market(&store, "m1", 200.0);
        seed_user(&store, "alice", 1000.0);
        seed_user(&store, "bob", 1000.0);

        let mut wagered = 0.0;
        for i in 0..20 {
            let (user, outcome) = if i % 2 == 0 {
                ("alice", Outcome::Yes)
            } else {
                ("bob", Outcome::No)
            };
            let amount = 5.0 + i as f64;
            place_wager(&store, "m1", user, outcome, amount).unwrap();
            wagered += amount;
        }

        let market = store.get_market("m1").unwrap().unwrap();
        assert!((market.volume - wagered).abs() < 1e-9);

        let alice = store.get_user("alice").unwrap().unwrap();
        let bob = store.get_user("bob").unwrap().unwrap();
        let debited = (1000.0 - alice.balance) + (1000.0 - bob.balance);
        assert!((debited - market.volume).abs() < 1e-9);
    }

    #[test]
    fn test_concurrent_wagers_preserve_product() {
        let store = Arc::new(LedgerStore::temporary().unwrap());
        let market = seed_market(&store, "m1", 500.0);
        let k0 = market.yes_shares * market.no_shares;

        let threads = 8;
        let wagers_per_thread = 5;
        for t in 0..threads {
            seed_user(&store, &format!("u{}", t), 1000.0);
        }

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let user = format!("u{}", t);
                    let outcome = if t % 2 == 0 { Outcome::Yes } else { Outcome::No };
                    for i in 0..wagers_per_thread {
                        place_wager(&store, "m1", &user, outcome, 10.0 + i as f64).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // A lost update would have computed a delta from a stale pool state
        // and the product could not match the creation-time constant
        let market = store.get_market("m1").unwrap().unwrap();
        let product = market.yes_shares * market.no_shares;
        assert!(((product - k0) / k0).abs() < amm::PRODUCT_TOLERANCE);

        let expected_volume: f64 =
            (0..wagers_per_thread).map(|i| 10.0 + i as f64).sum::<f64>() * threads as f64;
        assert!((market.volume - expected_volume).abs() < 1e-9);

        let bets = store.bets_for_market("m1").unwrap();
        assert_eq!(bets.len(), threads * wagers_per_thread);

        // Every user was debited exactly its own wagers
        for t in 0..threads {
            let user = store.get_user(&format!("u{}", t)).unwrap().unwrap();
            let spent: f64 = (0..wagers_per_thread).map(|i| 10.0 + i as f64).sum();
            assert!((user.balance - (1000.0 - spent)).abs() < 1e-9);
        }
    }
}
