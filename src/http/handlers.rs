use crate::catalog::guard;
use crate::errors::{AppError, AppResult};
use crate::http::pages::{self, ItemFormValues};
use crate::http::{take_flashes, viewer, AppState};
use crate::models::{CreateItemPayload, ItemId, ItemRecord, UpdateItemPayload};
use crate::session::SessionUser;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;

pub async fn catalog_page(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let viewer = viewer(&state, &headers).await;
    let categories = state.catalog.list_categories()?;
    let latest = state.catalog.latest_items()?;
    let flashes = take_flashes(&state, &viewer).await;
    Ok(Html(pages::catalog_page(&categories, &latest, viewer.user.as_ref(), &flashes)).into_response())
}

pub async fn category_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(category): Path<String>,
) -> AppResult<Response> {
    let viewer = viewer(&state, &headers).await;
    let (category, items) = state.catalog.items_in_category(&category)?;
    let categories = state.catalog.list_categories()?;
    let flashes = take_flashes(&state, &viewer).await;
    Ok(Html(pages::category_page(
        &category,
        &items,
        &categories,
        viewer.user.as_ref(),
        &flashes,
    ))
    .into_response())
}

pub async fn item_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((category, item, id)): Path<(String, String, ItemId)>,
) -> AppResult<Response> {
    let viewer = viewer(&state, &headers).await;
    let record = state.catalog.get_item(&category, &item, id)?;
    let usercreated = viewer
        .user_id()
        .is_some_and(|user_id| guard::authorize(user_id, &record.item));
    let flashes = take_flashes(&state, &viewer).await;
    Ok(Html(pages::item_page(&record, usercreated, viewer.user.as_ref(), &flashes)).into_response())
}

pub async fn create_form(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let viewer = viewer(&state, &headers).await;
    let Some(user) = viewer.user.as_ref() else {
        return Ok(login_redirect());
    };
    let categories = state.catalog.list_categories()?;
    let flashes = take_flashes(&state, &viewer).await;
    Ok(Html(pages::item_form(
        "New Item",
        "/catalog/create/",
        &ItemFormValues::default(),
        &categories,
        Some(user),
        &flashes,
    ))
    .into_response())
}

pub async fn create_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(payload): Form<CreateItemPayload>,
) -> AppResult<Response> {
    let viewer = viewer(&state, &headers).await;
    let (Some(user), Some(token)) = (viewer.user.as_ref(), viewer.token.as_deref()) else {
        return Ok(login_redirect());
    };

    match state.catalog.create_item(&payload, user.user_id) {
        Ok(item) => {
            let record = state.catalog.get_item_record(item.id)?;
            state
                .sessions
                .push_flash(token, format!("Created '{}' in {}.", record.item.name, record.category_name))
                .await;
            Ok(redirect_to_item(&record))
        }
        Err(AppError::Validation(message)) => {
            state.sessions.push_flash(token, message).await;
            Ok(Redirect::to("/catalog/create/").into_response())
        }
        Err(error) => Err(error),
    }
}

pub async fn edit_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((item, id)): Path<(String, ItemId)>,
) -> AppResult<Response> {
    let viewer = viewer(&state, &headers).await;
    let Some(user) = viewer.user.as_ref() else {
        return Ok(login_redirect());
    };
    let record = owned_record(&state, user, &item, id)?;
    let categories = state.catalog.list_categories()?;
    let flashes = take_flashes(&state, &viewer).await;
    let values = ItemFormValues {
        name: record.item.name.clone(),
        description: record.item.description.clone(),
        category: record.category_name.clone(),
    };
    Ok(Html(pages::item_form(
        &format!("Edit {}", record.item.name),
        &pages::edit_url(&record.item.name, record.item.id),
        &values,
        &categories,
        Some(user),
        &flashes,
    ))
    .into_response())
}

pub async fn edit_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((item, id)): Path<(String, ItemId)>,
    Form(payload): Form<UpdateItemPayload>,
) -> AppResult<Response> {
    let viewer = viewer(&state, &headers).await;
    let (Some(user), Some(token)) = (viewer.user.as_ref(), viewer.token.as_deref()) else {
        return Ok(login_redirect());
    };
    let record = state.catalog.get_item_by_name(&item, id)?;

    match state.catalog.update_item(record.item.id, &payload, user.user_id) {
        Ok(outcome) => {
            let updated = state.catalog.get_item_record(outcome.item.id)?;
            state
                .sessions
                .push_flash(token, format!("Updated '{}'.", updated.item.name))
                .await;
            if let Some(removed) = outcome.removed_category {
                state
                    .sessions
                    .push_flash(token, format!("Category '{}' had no items left and was removed.", removed.name))
                    .await;
            }
            Ok(redirect_to_item(&updated))
        }
        Err(AppError::Validation(message)) => {
            state.sessions.push_flash(token, message).await;
            Ok(Redirect::to(&pages::edit_url(&record.item.name, record.item.id)).into_response())
        }
        Err(error) => Err(error),
    }
}

pub async fn delete_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((item, id)): Path<(String, ItemId)>,
) -> AppResult<Response> {
    let viewer = viewer(&state, &headers).await;
    let Some(user) = viewer.user.as_ref() else {
        return Ok(login_redirect());
    };
    let record = owned_record(&state, user, &item, id)?;
    let flashes = take_flashes(&state, &viewer).await;
    Ok(Html(pages::delete_page(&record, Some(user), &flashes)).into_response())
}

pub async fn delete_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((item, id)): Path<(String, ItemId)>,
) -> AppResult<Response> {
    let viewer = viewer(&state, &headers).await;
    let (Some(user), Some(token)) = (viewer.user.as_ref(), viewer.token.as_deref()) else {
        return Ok(login_redirect());
    };
    let record = state.catalog.get_item_by_name(&item, id)?;
    let outcome = state.catalog.delete_item(record.item.id, user.user_id)?;

    state
        .sessions
        .push_flash(token, format!("Deleted '{}'.", outcome.item.name))
        .await;
    if let Some(removed) = outcome.removed_category {
        state
            .sessions
            .push_flash(token, format!("Category '{}' had no items left and was removed.", removed.name))
            .await;
        return Ok(Redirect::to("/catalog/").into_response());
    }
    Ok(Redirect::to(&pages::category_url(&record.category_name)).into_response())
}

fn owned_record(state: &AppState, user: &SessionUser, item: &str, id: ItemId) -> AppResult<ItemRecord> {
    let record = state.catalog.get_item_by_name(item, id)?;
    guard::ensure_owner(user.user_id, &record.item)?;
    Ok(record)
}

fn redirect_to_item(record: &ItemRecord) -> Response {
    Redirect::to(&pages::item_url(&record.category_name, &record.item.name, record.item.id)).into_response()
}

fn login_redirect() -> Response {
    Redirect::to("/login/").into_response()
}
