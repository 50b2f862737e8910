use std::collections::BTreeMap;

use tauri::State;

use crate::{
    controller::{RecordDetails, TravelMap, ViewState},
    feeds::{FeedKind, FeedSource},
    models::{ChecklistItem, Coordinates, Identity, MustSee, PoiFields},
    registry::MarkerFilter,
    settings::Settings,
    tracker::{ProgressScope, ProgressSnapshot},
    AppState,
};

fn map_from_state(state: &State<'_, AppState>) -> TravelMap {
    state.map.clone()
}

#[tauri::command]
pub async fn get_view_state(
    state: State<'_, AppState>,
    filter: Option<MarkerFilter>,
) -> Result<ViewState, String> {
    let map = map_from_state(&state);
    Ok(map.view_state(&filter.unwrap_or_default()).await)
}

#[tauri::command]
pub async fn get_place_details(
    state: State<'_, AppState>,
    identity: Identity,
) -> Result<Option<RecordDetails>, String> {
    let map = map_from_state(&state);
    Ok(map.details(&identity).await)
}

#[tauri::command]
pub async fn toggle_visited(
    state: State<'_, AppState>,
    identity: Identity,
    visited: bool,
) -> Result<ProgressSnapshot, String> {
    let map = map_from_state(&state);
    map.toggle_visited(&identity, visited)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn add_place(
    state: State<'_, AppState>,
    fields: PoiFields,
) -> Result<RecordDetails, String> {
    let map = map_from_state(&state);
    map.add_custom_record(fields)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn edit_place(
    state: State<'_, AppState>,
    identity: Identity,
    fields: PoiFields,
) -> Result<RecordDetails, String> {
    let map = map_from_state(&state);
    map.edit_record(&identity, fields)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn delete_place(
    state: State<'_, AppState>,
    identity: Identity,
) -> Result<ProgressSnapshot, String> {
    let map = map_from_state(&state);
    map.delete_record(&identity)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn set_checklist_item(
    state: State<'_, AppState>,
    identity: Identity,
    index: usize,
    completed: bool,
) -> Result<Vec<ChecklistItem>, String> {
    let map = map_from_state(&state);
    map.set_checklist_item(&identity, index, completed)
        .await
        .map(|details| details.record.checklist)
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn add_checklist_item(
    state: State<'_, AppState>,
    identity: Identity,
    task: String,
) -> Result<Vec<ChecklistItem>, String> {
    let map = map_from_state(&state);
    map.add_checklist_item(&identity, &task)
        .await
        .map(|details| details.record.checklist)
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn add_must_see(
    state: State<'_, AppState>,
    identity: Identity,
    text: String,
) -> Result<Vec<MustSee>, String> {
    let map = map_from_state(&state);
    map.add_must_see(&identity, &text)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn set_must_see_checked(
    state: State<'_, AppState>,
    identity: Identity,
    index: usize,
    checked: bool,
) -> Result<Vec<MustSee>, String> {
    let map = map_from_state(&state);
    map.set_must_see_checked(&identity, index, checked)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn remove_must_see(
    state: State<'_, AppState>,
    identity: Identity,
    index: usize,
) -> Result<Vec<MustSee>, String> {
    let map = map_from_state(&state);
    map.remove_must_see(&identity, index)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_category_color(
    state: State<'_, AppState>,
    category: String,
) -> Result<String, String> {
    let map = map_from_state(&state);
    Ok(map.category_color(&category).await)
}

#[tauri::command]
pub async fn set_category_color(
    state: State<'_, AppState>,
    category: String,
    color: String,
) -> Result<Vec<Identity>, String> {
    let map = map_from_state(&state);
    map.set_category_color(&category, &color)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_progress(state: State<'_, AppState>) -> Result<ProgressSnapshot, String> {
    let map = map_from_state(&state);
    Ok(map.progress().await)
}

#[tauri::command]
pub async fn select_progress_scope(
    state: State<'_, AppState>,
    scope: ProgressScope,
) -> Result<ProgressSnapshot, String> {
    let map = map_from_state(&state);
    Ok(map.select_scope(scope).await)
}

#[tauri::command]
pub async fn geocode(state: State<'_, AppState>, query: String) -> Result<Coordinates, String> {
    state.geocoder.geocode(&query).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn resolve_image(state: State<'_, AppState>, name: String) -> Result<String, String> {
    state.images.resolve(&name).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub fn get_settings(state: State<'_, AppState>) -> Result<Settings, String> {
    Ok(state.settings.snapshot())
}

/// Stores new settings. Lookup endpoints and options apply on next launch;
/// feed sources apply on the next reload.
#[tauri::command]
pub fn update_settings(state: State<'_, AppState>, settings: Settings) -> Result<(), String> {
    state.settings.update(settings).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn reload_feeds(state: State<'_, AppState>) -> Result<Vec<FeedKind>, String> {
    let map = map_from_state(&state);
    let sources: BTreeMap<FeedKind, FeedSource> = state
        .settings
        .snapshot()
        .feeds
        .iter()
        .map(|(kind, source)| (*kind, source.resolved_against(&state.resource_dir)))
        .collect();
    map.reload().await;
    Ok(map.load_feeds(&state.feeds, &sources).await)
}
