pub mod guard;
pub mod lifecycle;
pub mod query;
pub mod resolver;

use crate::db::{self, Database};
use crate::errors::{AppError, AppResult};
use crate::models::{
    CatalogJson, Category, CategoryItemsJson, CreateItemPayload, IdentityProfile, Item, ItemId, ItemRecord,
    LifecycleOutcome, SingleItemJson, UpdateItemPayload, User, UserId,
};
use crate::policy::FieldPolicy;
use chrono::Utc;
use std::sync::Arc;

const MAX_LATEST_ITEMS: usize = 100;

#[derive(Clone)]
pub struct CatalogCore {
    db: Arc<Database>,
    policy: FieldPolicy,
    latest_limit: usize,
}

impl CatalogCore {
    pub fn new(db: Arc<Database>, policy: FieldPolicy, latest_limit: usize) -> Self {
        Self {
            db,
            policy,
            latest_limit: latest_limit.clamp(1, MAX_LATEST_ITEMS),
        }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn policy(&self) -> &FieldPolicy {
        &self.policy
    }

    pub fn latest_limit(&self) -> usize {
        self.latest_limit
    }

    pub fn resolve_category(&self, name: &str) -> AppResult<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Category is required.".to_string()));
        }
        self.db.write(|tx| resolver::resolve_category(tx, name))
    }

    pub fn create_item(&self, payload: &CreateItemPayload, owner_id: UserId) -> AppResult<Item> {
        self.db
            .write(|tx| lifecycle::create_item(tx, &self.policy, payload, owner_id, Utc::now()))
    }

    pub fn update_item(
        &self,
        item_id: ItemId,
        payload: &UpdateItemPayload,
        acting_user_id: UserId,
    ) -> AppResult<LifecycleOutcome> {
        self.db
            .write(|tx| lifecycle::update_item(tx, &self.policy, item_id, payload, acting_user_id))
    }

    pub fn delete_item(&self, item_id: ItemId, acting_user_id: UserId) -> AppResult<LifecycleOutcome> {
        self.db.write(|tx| lifecycle::delete_item(tx, item_id, acting_user_id))
    }

    pub fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.db.read(db::list_categories)
    }

    pub fn items_in_category(&self, category_name: &str) -> AppResult<(Category, Vec<ItemRecord>)> {
        self.db.read(|conn| query::items_in_category(conn, category_name))
    }

    pub fn latest_items(&self) -> AppResult<Vec<ItemRecord>> {
        self.db.read(|conn| db::latest_item_records(conn, self.latest_limit))
    }

    pub fn get_item(&self, category_name: &str, item_name: &str, item_id: ItemId) -> AppResult<ItemRecord> {
        self.db
            .read(|conn| query::item_by_path(conn, category_name, item_name, item_id))
    }

    pub fn get_item_record(&self, item_id: ItemId) -> AppResult<ItemRecord> {
        self.db
            .read(|conn| db::get_item_record(conn, item_id))?
            .ok_or_else(|| AppError::NotFound(format!("Item {} does not exist", item_id)))
    }

    pub fn get_item_by_name(&self, item_name: &str, item_id: ItemId) -> AppResult<ItemRecord> {
        self.db.read(|conn| query::item_by_name(conn, item_name, item_id))
    }

    pub fn catalog_json(&self) -> AppResult<CatalogJson> {
        self.db.read(query::catalog_json)
    }

    pub fn category_json(&self, category_name: &str) -> AppResult<CategoryItemsJson> {
        self.db.read(|conn| query::category_json(conn, category_name))
    }

    pub fn item_json(&self, category_name: &str, item_name: &str, item_id: ItemId) -> AppResult<SingleItemJson> {
        self.db
            .read(|conn| query::item_json(conn, category_name, item_name, item_id))
    }

    /// Finds the user for a verified identity, creating it on first login.
    /// Existing rows are never updated.
    pub fn sign_in(&self, profile: &IdentityProfile) -> AppResult<User> {
        let email = profile.email.trim();
        if email.is_empty() {
            return Err(AppError::Unauthenticated(
                "The identity provider did not return an email address.".to_string(),
            ));
        }
        let profile = IdentityProfile {
            email: email.to_string(),
            name: profile.name.trim().to_string(),
            picture_url: profile.picture_url.trim().to_string(),
        };

        self.db.write(|tx| {
            if let Some(existing) = db::find_user_by_email(tx, &profile.email)? {
                return Ok(existing);
            }
            match db::insert_user(tx, &profile) {
                Ok(user) => {
                    tracing::info!(user_id = user.id, "user registered");
                    Ok(user)
                }
                Err(AppError::Conflict(_)) => db::find_user_by_email(tx, &profile.email)?
                    .ok_or_else(|| AppError::Internal("user vanished after an email conflict".to_string())),
                Err(error) => Err(error),
            }
        })
    }
}
