use crate::catalog::{guard, resolver};
use crate::db;
use crate::errors::{AppError, AppResult};
use crate::models::{Category, CategoryId, CreateItemPayload, Item, ItemId, LifecycleOutcome, UpdateItemPayload, UserId};
use crate::policy::{FieldPolicy, ItemFields};
use chrono::{DateTime, Utc};
use rusqlite::Connection;

pub fn create_item(
    conn: &Connection,
    policy: &FieldPolicy,
    payload: &CreateItemPayload,
    owner_id: UserId,
    created_at: DateTime<Utc>,
) -> AppResult<Item> {
    let fields = policy.validate_create(payload)?;
    if db::get_user(conn, owner_id)?.is_none() {
        return Err(AppError::NotFound(format!("User {} does not exist", owner_id)));
    }
    ensure_name_available(conn, policy, &fields, None)?;

    let category = resolver::resolve_category(conn, &fields.category)?;
    let item = db::insert_item(
        conn,
        &fields.name,
        &fields.description,
        created_at,
        category.id,
        owner_id,
    )?;
    tracing::info!(item_id = item.id, category_id = category.id, owner_id, "item created");
    Ok(item)
}

/// Ownership is checked before validation and before any category is resolved,
/// so a rejected update never creates a category.
pub fn update_item(
    conn: &Connection,
    policy: &FieldPolicy,
    item_id: ItemId,
    payload: &UpdateItemPayload,
    acting_user_id: UserId,
) -> AppResult<LifecycleOutcome> {
    let current = load_item(conn, item_id)?;
    guard::ensure_owner(acting_user_id, &current)?;

    let previous_category = db::get_category(conn, current.category_id)?.ok_or_else(|| {
        AppError::Internal(format!("item {} references missing category {}", item_id, current.category_id))
    })?;
    let fields = policy.validate_update(&current, &previous_category.name, payload)?;
    ensure_name_available(conn, policy, &fields, Some(item_id))?;

    let category = resolver::resolve_category(conn, &fields.category)?;
    let updated = Item {
        name: fields.name,
        description: fields.description,
        category_id: category.id,
        ..current
    };
    db::update_item(conn, &updated)?;

    let removed_category = if previous_category.id != category.id {
        cleanup_if_empty(conn, previous_category.id)?
    } else {
        None
    };
    tracing::info!(
        item_id,
        category_id = category.id,
        previous_category_id = previous_category.id,
        "item updated"
    );
    Ok(LifecycleOutcome {
        item: updated,
        removed_category,
    })
}

pub fn delete_item(conn: &Connection, item_id: ItemId, acting_user_id: UserId) -> AppResult<LifecycleOutcome> {
    let item = load_item(conn, item_id)?;
    guard::ensure_owner(acting_user_id, &item)?;

    if !db::delete_item(conn, item_id)? {
        return Err(AppError::NotFound(format!("Item {} does not exist", item_id)));
    }
    let removed_category = cleanup_if_empty(conn, item.category_id)?;
    tracing::info!(item_id, category_id = item.category_id, "item deleted");
    Ok(LifecycleOutcome { item, removed_category })
}

/// Removes the category when nothing references it any more. Must run on the
/// same transaction as the item change that emptied it.
pub fn cleanup_if_empty(conn: &Connection, category_id: CategoryId) -> AppResult<Option<Category>> {
    let Some(category) = db::get_category(conn, category_id)? else {
        return Ok(None);
    };
    if !db::delete_category_if_empty(conn, category_id)? {
        return Ok(None);
    }
    tracing::info!(category_id, category = %category.name, "removed empty category");
    Ok(Some(category))
}

fn load_item(conn: &Connection, item_id: ItemId) -> AppResult<Item> {
    db::get_item(conn, item_id)?.ok_or_else(|| AppError::NotFound(format!("Item {} does not exist", item_id)))
}

fn ensure_name_available(
    conn: &Connection,
    policy: &FieldPolicy,
    fields: &ItemFields,
    excluding: Option<ItemId>,
) -> AppResult<()> {
    if policy.requires_unique_names() && db::item_name_taken(conn, &fields.name, excluding)? {
        return Err(AppError::Validation(format!(
            "An item named '{}' already exists.",
            fields.name
        )));
    }
    Ok(())
}
