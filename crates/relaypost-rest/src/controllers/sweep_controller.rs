//! Retry sweep trigger controller.

use axum::{extract::State, routing::post, Router};
use relaypost_dispatch::SweepReport;

use crate::responses::{ok, ApiResult};
use crate::state::AppState;

/// Creates the sweep router.
pub fn router() -> Router<AppState> {
    Router::new().route("/retry-sweep", post(trigger_sweep))
}

/// Runs one recovery sweep and reports what it did.
///
/// Safe to call repeatedly or concurrently; the store's CAS makes
/// overlapping sweeps admit each job once.
pub async fn trigger_sweep(State(state): State<AppState>) -> ApiResult<SweepReport> {
    let report = state.sweeper.sweep().await?;
    ok(report)
}
