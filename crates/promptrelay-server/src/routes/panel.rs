use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;

use crate::panel::{render_html, PanelView};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/panel", get(panel))
}

async fn panel(State(state): State<Arc<AppState>>) -> Html<String> {
    let scan = state
        .coordinator
        .check_connection()
        .await
        .map_err(|e| e.to_string());
    Html(render_html(&PanelView::from_scan(scan)))
}
