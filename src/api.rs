use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::ingest::registry::SourceRegistry;
use crate::ingest::scheduler::{SchedulerHandle, SchedulerState};
use crate::model::NewsItem;
use crate::query::QueryService;

/// Hard cap on `limit` so one request cannot dump the whole table.
pub const MAX_LIMIT: u32 = 500;

#[derive(Clone)]
pub struct AppState {
    query: QueryService,
    registry: Arc<SourceRegistry>,
    scheduler: SchedulerHandle,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl AppState {
    pub fn new(
        query: QueryService,
        registry: Arc<SourceRegistry>,
        scheduler: SchedulerHandle,
        requests_per_minute: u32,
    ) -> Self {
        let per_minute = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            query,
            registry,
            scheduler,
            limiter: Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    // Only the store-reading route is throttled.
    let news_routes = Router::new()
        .route("/news", get(news))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/countries", get(countries))
        .route("/admin/refresh", post(admin_refresh))
        .merge(news_routes)
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if state.limiter.check().is_err() {
        counter!("query_rate_limited_total").increment(1);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResp {
                error: "rate limit exceeded".into(),
            }),
        )
            .into_response();
    }
    next.run(req).await
}

#[derive(Debug, Deserialize)]
struct NewsParams {
    country: Option<String>,
    limit: Option<u32>,
}

#[derive(Serialize)]
struct NewsResp {
    country: Option<String>,
    count: usize,
    items: Vec<NewsItem>,
}

#[derive(Serialize)]
struct ErrorResp {
    error: String,
}

async fn news(State(state): State<AppState>, Query(p): Query<NewsParams>) -> Response {
    // Accept any casing for configured countries; anything else is passed
    // through and simply matches nothing.
    let country = p.country.as_deref().map(|c| {
        state
            .registry
            .countries()
            .into_iter()
            .find(|known| known.eq_ignore_ascii_case(c.trim()))
            .unwrap_or_else(|| c.trim().to_string())
    });
    let limit = p.limit.map(|l| l.min(MAX_LIMIT));

    match state.query.latest(country.as_deref(), limit).await {
        Ok(items) => Json(NewsResp {
            country,
            count: items.len(),
            items,
        })
        .into_response(),
        Err(e) => {
            warn!(target: "store", error = %e, "news query failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResp {
                    error: "store unavailable".into(),
                }),
            )
                .into_response()
        }
    }
}

async fn countries(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.registry.countries())
}

#[derive(Serialize)]
struct RefreshResp {
    accepted: bool,
    state: &'static str,
    cycles_completed: u64,
}

async fn admin_refresh(State(state): State<AppState>) -> (StatusCode, Json<RefreshResp>) {
    let current = state.scheduler.state();
    let accepted = current != SchedulerState::Stopped;
    if accepted {
        state.scheduler.trigger();
        info!(target: "scheduler", "manual refresh requested");
    }
    let status = if accepted {
        StatusCode::ACCEPTED
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(RefreshResp {
            accepted,
            state: match current {
                SchedulerState::Idle => "idle",
                SchedulerState::Running => "running",
                SchedulerState::Stopped => "stopped",
            },
            cycles_completed: state.scheduler.cycles_completed(),
        }),
    )
}
