// Sled-backed ledger store
//
// Four logical tables live in one keyspace under typed prefixes:
//
//   market/<id>            mutable Market record
//   user/<id>              mutable User record
//   apikey/<sha256-hex>    API key hash -> user id index
//   bet/<market-id>/<seq>  append-only Bet rows, in commit order
//   point/<market-id>/<seq> append-only PricePoint rows, in commit order
//
// <seq> is a zero-padded monotonic id, so a prefix scan yields rows in the
// order they were committed.
//
// Executors stage every write of one operation into a single sled::Batch and
// apply it after all validations pass; the batch is atomic, so a failed
// operation leaves nothing behind. Isolation comes from the lock table: one
// mutex per market and per user, held across the read-modify-write cycle.
// Operations on distinct markets and distinct users never contend.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::Result;
use crate::models::{Bet, Market, PricePoint, User};

const MARKET_PREFIX: &str = "market/";
const USER_PREFIX: &str = "user/";
const API_KEY_PREFIX: &str = "apikey/";

fn market_key(id: &str) -> String {
    format!("{}{}", MARKET_PREFIX, id)
}

fn user_key(id: &str) -> String {
    format!("{}{}", USER_PREFIX, id)
}

fn api_key_key(hash: &str) -> String {
    format!("{}{}", API_KEY_PREFIX, hash)
}

fn bet_prefix(market_id: &str) -> String {
    format!("bet/{}/", market_id)
}

fn bet_key(market_id: &str, seq: u64) -> String {
    format!("bet/{}/{:020}", market_id, seq)
}

fn point_prefix(market_id: &str) -> String {
    format!("point/{}/", market_id)
}

fn point_key(market_id: &str, seq: u64) -> String {
    format!("point/{}/{:020}", market_id, seq)
}

/// Handle to one entity's mutex. Keep the handle alive for as long as the
/// guard is held.
pub struct EntityLock(Arc<Mutex<()>>);

impl EntityLock {
    pub fn acquire(&self) -> MutexGuard<'_, ()> {
        self.0.lock().unwrap()
    }
}

/// Hands out one mutex per entity key, created on first use.
struct LockTable {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockTable {
    fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    fn handle(&self, key: String) -> EntityLock {
        let mut map = self.inner.lock().unwrap();
        let lock = map
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        EntityLock(lock)
    }
}

pub struct LedgerStore {
    db: sled::Db,
    locks: LockTable,
}

impl LedgerStore {
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self {
            db,
            locks: LockTable::new(),
        })
    }

    /// In-memory store that vanishes on drop. Used by tests.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self {
            db,
            locks: LockTable::new(),
        })
    }

    // ===== LOCKING =====

    /// Lock ordering: exactly one market lock first, then user lock(s); when
    /// several users are involved, acquire in sorted id order.
    pub fn market_lock(&self, id: &str) -> EntityLock {
        self.locks.handle(market_key(id))
    }

    pub fn user_lock(&self, id: &str) -> EntityLock {
        self.locks.handle(user_key(id))
    }

    // ===== MARKETS =====

    pub fn get_market(&self, id: &str) -> Result<Option<Market>> {
        match self.db.get(market_key(id).as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All markets, newest first.
    pub fn list_markets(&self) -> Result<Vec<Market>> {
        let mut markets = Vec::new();
        for entry in self.db.scan_prefix(MARKET_PREFIX.as_bytes()) {
            let (_, value) = entry?;
            markets.push(bincode::deserialize::<Market>(&value)?);
        }
        markets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(markets)
    }

    /// Persist a freshly created market together with its seed price point.
    pub fn create_market(&self, market: &Market, initial_point: &PricePoint) -> Result<()> {
        let mut batch = sled::Batch::default();
        self.stage_market(&mut batch, market)?;
        self.stage_point(&mut batch, initial_point, self.next_seq()?)?;
        self.commit(batch)
    }

    // ===== USERS =====

    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        match self.db.get(user_key(id).as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn get_user_by_api_key_hash(&self, hash: &str) -> Result<Option<User>> {
        match self.db.get(api_key_key(hash).as_bytes())? {
            Some(id_bytes) => {
                let id = String::from_utf8_lossy(&id_bytes).to_string();
                self.get_user(&id)
            }
            None => Ok(None),
        }
    }

    /// Persist a new user plus the api-key index row pointing at it.
    pub fn create_user(&self, user: &User) -> Result<()> {
        let mut batch = sled::Batch::default();
        self.stage_user(&mut batch, user)?;
        batch.insert(
            api_key_key(&user.api_key_hash).into_bytes(),
            user.id.as_bytes().to_vec(),
        );
        self.commit(batch)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut users = Vec::new();
        for entry in self.db.scan_prefix(USER_PREFIX.as_bytes()) {
            let (_, value) = entry?;
            users.push(bincode::deserialize::<User>(&value)?);
        }
        Ok(users)
    }

    // ===== BETS & PRICE POINTS =====

    /// All bets of one market in commit order.
    pub fn bets_for_market(&self, market_id: &str) -> Result<Vec<Bet>> {
        let mut bets = Vec::new();
        for entry in self.db.scan_prefix(bet_prefix(market_id).as_bytes()) {
            let (_, value) = entry?;
            bets.push(bincode::deserialize::<Bet>(&value)?);
        }
        Ok(bets)
    }

    pub fn bet_count(&self, market_id: &str) -> Result<usize> {
        let mut count = 0;
        for entry in self.db.scan_prefix(bet_prefix(market_id).as_bytes()) {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    /// Bet counts for the leaderboard, keyed by user id.
    pub fn bet_counts_by_user(&self) -> Result<HashMap<String, usize>> {
        let mut counts = HashMap::new();
        for entry in self.db.scan_prefix(b"bet/") {
            let (_, value) = entry?;
            let bet: Bet = bincode::deserialize(&value)?;
            *counts.entry(bet.user_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Probability history of one market in commit order.
    pub fn price_points_for_market(&self, market_id: &str) -> Result<Vec<PricePoint>> {
        let mut points = Vec::new();
        for entry in self.db.scan_prefix(point_prefix(market_id).as_bytes()) {
            let (_, value) = entry?;
            points.push(bincode::deserialize::<PricePoint>(&value)?);
        }
        Ok(points)
    }

    // ===== UNIT OF WORK =====

    pub fn next_seq(&self) -> Result<u64> {
        Ok(self.db.generate_id()?)
    }

    pub fn stage_market(&self, batch: &mut sled::Batch, market: &Market) -> Result<()> {
        batch.insert(market_key(&market.id).into_bytes(), bincode::serialize(market)?);
        Ok(())
    }

    pub fn stage_user(&self, batch: &mut sled::Batch, user: &User) -> Result<()> {
        batch.insert(user_key(&user.id).into_bytes(), bincode::serialize(user)?);
        Ok(())
    }

    pub fn stage_bet(&self, batch: &mut sled::Batch, bet: &Bet, seq: u64) -> Result<()> {
        batch.insert(
            bet_key(&bet.market_id, seq).into_bytes(),
            bincode::serialize(bet)?,
        );
        Ok(())
    }

    pub fn stage_point(&self, batch: &mut sled::Batch, point: &PricePoint, seq: u64) -> Result<()> {
        batch.insert(
            point_key(&point.market_id, seq).into_bytes(),
            bincode::serialize(point)?,
        );
        Ok(())
    }

    /// Apply one operation's writes as a unit.
    pub fn commit(&self, batch: sled::Batch) -> Result<()> {
        self.db.apply_batch(batch)?;
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}
