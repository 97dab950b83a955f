use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type CategoryId = i64;
pub type ItemId = i64;
pub type UserId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub category_id: CategoryId,
    pub owner_id: UserId,
}

/// An item joined with the name of the category it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub item: Item,
    pub category_name: String,
}

impl ItemRecord {
    pub fn to_json(&self) -> ItemJson {
        ItemJson {
            name: self.item.name.clone(),
            description: self.item.description.clone(),
            category: self.category_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub picture_url: String,
}

/// What a successful external login yields, before the user row exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProfile {
    pub email: String,
    pub name: String,
    pub picture_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemNamePolicy {
    #[default]
    AllowDuplicates,
    UniqueNames,
}

impl ItemNamePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AllowDuplicates => "allow-duplicates",
            Self::UniqueNames => "unique-names",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateItemPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
}

/// Blank or absent fields keep the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateItemPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemJson {
    pub name: String,
    pub description: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryJson {
    pub name: String,
    pub items: Vec<ItemJson>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogJson {
    pub categories: Vec<CategoryJson>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryItemsJson {
    pub category: String,
    pub items: Vec<ItemJson>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SingleItemJson {
    pub item: ItemJson,
}

/// Result of an item removal or re-categorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleOutcome {
    pub item: Item,
    pub removed_category: Option<Category>,
}
