// HTTP request handlers for the Mintbook API

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::app_state::SharedState;
use crate::auth;
use crate::engine::{self, MAX_WAGER_AMOUNT};
use crate::error::{MarketError, Result};
use crate::models::*;

/// Build the full application router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        // ===== MARKET ENDPOINTS =====
        .route("/markets", get(list_markets).post(create_market))
        .route("/markets/:id", get(get_market))
        .route("/markets/:id/bet", post(place_bet))
        .route("/markets/:id/resolve", post(resolve_market))
        // ===== USER ENDPOINTS =====
        .route("/users", post(register))
        .route("/me", get(me))
        .route("/leaderboard", get(leaderboard))
        // ===== HEALTH CHECK =====
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn health_check() -> &'static str {
    "Mintbook prediction market - online"
}

// ===== MARKET ENDPOINTS =====

async fn list_markets(State(state): State<SharedState>) -> Result<Json<Vec<MarketSummary>>> {
    let markets = state.store.list_markets()?;

    let mut names: HashMap<String, String> = HashMap::new();
    let mut summaries = Vec::with_capacity(markets.len());
    for market in markets {
        let creator_name = user_name(&state, &mut names, &market.creator_id)?;
        let total_bets = state.store.bet_count(&market.id)?;
        summaries.push(MarketSummary {
            probability: market.probability(),
            id: market.id,
            question: market.question,
            description: market.description,
            volume: market.volume,
            resolved: market.resolved,
            resolution: market.resolution,
            creator_name,
            total_bets,
            closes_at: market.closes_at,
            created_at: market.created_at,
        });
    }
    Ok(Json(summaries))
}

async fn create_market(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<CreateMarketRequest>,
) -> Result<(StatusCode, Json<MarketSummary>)> {
    let user = auth::authenticate(&state.store, &headers)?;

    let question = payload.question.trim().to_string();
    if question.is_empty() {
        return Err(MarketError::InvalidArgument("question is required".into()));
    }
    if question.len() > 500 {
        return Err(MarketError::InvalidArgument(
            "question must be 500 characters or less".into(),
        ));
    }
    let initial_liquidity = payload
        .initial_liquidity
        .unwrap_or(state.config.initial_liquidity);
    if !initial_liquidity.is_finite() || initial_liquidity <= 0.0 {
        return Err(MarketError::InvalidArgument(
            "initial_liquidity must be a positive number".into(),
        ));
    }

    let market = Market::new(
        question,
        payload.description,
        payload.closes_at,
        user.id,
        initial_liquidity,
    );
    let seed_point = PricePoint {
        market_id: market.id.clone(),
        prob: market.probability(),
        created_at: market.created_at,
    };
    state.store.create_market(&market, &seed_point)?;

    tracing::info!(market = %market.id, question = %market.question, "market created");

    Ok((
        StatusCode::CREATED,
        Json(MarketSummary {
            probability: market.probability(),
            id: market.id,
            question: market.question,
            description: market.description,
            volume: market.volume,
            resolved: market.resolved,
            resolution: market.resolution,
            creator_name: user.name,
            total_bets: 0,
            closes_at: market.closes_at,
            created_at: market.created_at,
        }),
    ))
}

async fn get_market(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<MarketDetail>> {
    let market = state
        .store
        .get_market(&id)?
        .ok_or_else(|| MarketError::NotFound("Market not found".into()))?;

    let mut names: HashMap<String, String> = HashMap::new();
    let creator_name = user_name(&state, &mut names, &market.creator_id)?;

    // Most recent 50 bets, newest first
    let all_bets = state.store.bets_for_market(&id)?;
    let mut bets = Vec::new();
    for bet in all_bets.iter().rev().take(50) {
        let bettor = user_name(&state, &mut names, &bet.user_id)?;
        bets.push(BetView {
            id: bet.id.clone(),
            amount: bet.amount,
            outcome: bet.outcome,
            shares: bet.shares,
            prob_after: bet.prob_after,
            user_name: bettor,
            created_at: bet.created_at,
        });
    }

    let price_history = state
        .store
        .price_points_for_market(&id)?
        .into_iter()
        .map(|p| PricePointView {
            prob: p.prob,
            created_at: p.created_at,
        })
        .collect();

    Ok(Json(MarketDetail {
        probability: market.probability(),
        id: market.id,
        question: market.question,
        description: market.description,
        yes_shares: market.yes_shares,
        no_shares: market.no_shares,
        volume: market.volume,
        resolved: market.resolved,
        resolution: market.resolution,
        creator_name,
        closes_at: market.closes_at,
        created_at: market.created_at,
        bets,
        price_history,
    }))
}

// ===== WAGER & SETTLEMENT ENDPOINTS =====

async fn place_bet(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<WagerRequest>,
) -> Result<(StatusCode, Json<WagerResponse>)> {
    let user = auth::authenticate(&state.store, &headers)?;

    let outcome = Outcome::parse(&payload.outcome).ok_or_else(|| {
        MarketError::InvalidArgument("outcome must be \"YES\" or \"NO\"".into())
    })?;
    if !payload.amount.is_finite() || payload.amount <= 0.0 || payload.amount > MAX_WAGER_AMOUNT {
        return Err(MarketError::InvalidArgument(format!(
            "amount must be a positive number (max {})",
            MAX_WAGER_AMOUNT
        )));
    }

    let receipt = engine::place_wager(&state.store, &id, &user.id, outcome, payload.amount)?;

    Ok((
        StatusCode::CREATED,
        Json(WagerResponse {
            id: receipt.bet.id,
            outcome,
            amount: receipt.bet.amount,
            shares: receipt.bet.shares,
            probability: receipt.probability,
            new_balance: receipt.new_balance,
        }),
    ))
}

async fn resolve_market(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>> {
    let user = auth::authenticate(&state.store, &headers)?;

    let resolution = Outcome::parse(&payload.resolution).ok_or_else(|| {
        MarketError::InvalidArgument("resolution must be \"YES\" or \"NO\"".into())
    })?;

    let report = engine::resolve_market(&state.store, &id, &user.id, resolution)?;

    Ok(Json(ResolveResponse {
        market_id: report.market_id,
        resolution: report.resolution,
        payouts: report
            .payouts
            .into_iter()
            .map(|p| PayoutView {
                user_id: p.user_id,
                amount: p.amount,
            })
            .collect(),
    }))
}

// ===== USER ENDPOINTS =====

async fn register(
    State(state): State<SharedState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let (user, api_key) =
        auth::register_user(&state.store, &payload.name, state.config.starting_balance)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            name: user.name,
            balance: user.balance,
            api_key,
            created_at: user.created_at,
        }),
    ))
}

async fn me(State(state): State<SharedState>, headers: HeaderMap) -> Result<Json<UserResponse>> {
    let user = auth::authenticate(&state.store, &headers)?;
    Ok(Json(UserResponse {
        id: user.id,
        name: user.name,
        balance: user.balance,
        created_at: user.created_at,
    }))
}

async fn leaderboard(State(state): State<SharedState>) -> Result<Json<Vec<LeaderboardEntry>>> {
    let mut users = state.store.list_users()?;
    users.sort_by(|a, b| b.balance.partial_cmp(&a.balance).unwrap_or(std::cmp::Ordering::Equal));

    let counts = state.store.bet_counts_by_user()?;
    let entries = users
        .into_iter()
        .take(20)
        .map(|u| LeaderboardEntry {
            total_bets: counts.get(&u.id).copied().unwrap_or(0),
            id: u.id,
            name: u.name,
            balance: u.balance,
        })
        .collect();
    Ok(Json(entries))
}

// ===== HELPERS =====

fn user_name(
    state: &SharedState,
    cache: &mut HashMap<String, String>,
    user_id: &str,
) -> Result<String> {
    if let Some(name) = cache.get(user_id) {
        return Ok(name.clone());
    }
    let name = state
        .store
        .get_user(user_id)?
        .map(|u| u.name)
        .unwrap_or_else(|| "unknown".to_string());
    cache.insert(user_id.to_string(), name.clone());
    Ok(name)
}
