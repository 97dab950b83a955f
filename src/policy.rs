use crate::errors::{AppError, AppResult};
use crate::models::{CreateItemPayload, Item, ItemNamePolicy, UpdateItemPayload};

const MAX_NAME_CHARS: usize = 80;
const MAX_CATEGORY_CHARS: usize = 80;
const MAX_DESCRIPTION_CHARS: usize = 250;

/// Static segments routed under `/catalog/`; a category or item with one of these
/// names would be shadowed by the fixed route.
const RESERVED_NAMES: &[&str] = &["JSON", "create"];

/// Item fields after trimming and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFields {
    pub name: String,
    pub description: String,
    pub category: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FieldPolicy {
    name_policy: ItemNamePolicy,
}

impl FieldPolicy {
    pub fn new(name_policy: ItemNamePolicy) -> Self {
        Self { name_policy }
    }

    pub fn name_policy(&self) -> ItemNamePolicy {
        self.name_policy
    }

    pub fn requires_unique_names(&self) -> bool {
        self.name_policy == ItemNamePolicy::UniqueNames
    }

    pub fn validate_create(&self, payload: &CreateItemPayload) -> AppResult<ItemFields> {
        let fields = ItemFields {
            name: payload.name.trim().to_string(),
            description: payload.description.trim().to_string(),
            category: payload.category.trim().to_string(),
        };
        self.validate_fields(&fields)?;
        Ok(fields)
    }

    /// Merges the payload over the stored item and its category name.
    pub fn validate_update(
        &self,
        current: &Item,
        current_category: &str,
        payload: &UpdateItemPayload,
    ) -> AppResult<ItemFields> {
        let fields = ItemFields {
            name: non_blank(payload.name.as_deref()).unwrap_or(&current.name).to_string(),
            description: match payload.description.as_deref() {
                Some(description) => description.trim().to_string(),
                None => current.description.clone(),
            },
            category: non_blank(payload.category.as_deref())
                .unwrap_or(current_category)
                .to_string(),
        };
        self.validate_fields(&fields)?;
        Ok(fields)
    }

    fn validate_fields(&self, fields: &ItemFields) -> AppResult<()> {
        if fields.name.is_empty() {
            return Err(AppError::Validation("Item name is required.".to_string()));
        }
        if fields.category.is_empty() {
            return Err(AppError::Validation("Category is required.".to_string()));
        }
        check_reserved("item name", &fields.name)?;
        check_reserved("category", &fields.category)?;
        check_length("Item name", &fields.name, MAX_NAME_CHARS)?;
        check_length("Category", &fields.category, MAX_CATEGORY_CHARS)?;
        check_length("Description", &fields.description, MAX_DESCRIPTION_CHARS)?;
        Ok(())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn check_reserved(label: &str, value: &str) -> AppResult<()> {
    if RESERVED_NAMES.contains(&value) {
        return Err(AppError::Validation(format!(
            "'{}' is reserved and cannot be used as a {}.",
            value, label
        )));
    }
    Ok(())
}

fn check_length(label: &str, value: &str, max_chars: usize) -> AppResult<()> {
    let chars = value.chars().count();
    if chars > max_chars {
        return Err(AppError::Validation(format!(
            "{} is {} characters long; the limit is {}.",
            label, chars, max_chars
        )));
    }
    Ok(())
}
