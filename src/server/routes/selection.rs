//! Selection tracker endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::processing::BatchState;
use crate::server::state::AppState;

/// The selection after an operation, in batch order
#[derive(Debug, Serialize)]
pub struct SelectionView {
    pub selected: Vec<Uuid>,
    pub count: usize,
}

impl SelectionView {
    fn from_state(state: &BatchState) -> Self {
        let selected: Vec<Uuid> = state
            .jobs
            .iter()
            .filter(|j| state.selection.contains(&j.id))
            .map(|j| j.id)
            .collect();
        Self {
            count: selected.len(),
            selected,
        }
    }
}

/// POST /api/selection/:id/toggle - Flip membership of one done job
pub async fn toggle(State(state): State<AppState>, Path(id): Path<Uuid>) -> Json<SelectionView> {
    Json(SelectionView::from_state(
        &state.controller().toggle_selection(id),
    ))
}

/// POST /api/selection/select-all - Select every done job
pub async fn select_all(State(state): State<AppState>) -> Json<SelectionView> {
    Json(SelectionView::from_state(
        &state.controller().select_all_done(),
    ))
}

/// DELETE /api/selection - Empty the selection
pub async fn clear(State(state): State<AppState>) -> Json<SelectionView> {
    Json(SelectionView::from_state(
        &state.controller().clear_selection(),
    ))
}
