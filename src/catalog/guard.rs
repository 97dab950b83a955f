use crate::errors::{AppError, AppResult};
use crate::models::{Item, UserId};

/// Only the user who created an item may change it. There is no admin override.
pub fn authorize(acting_user_id: UserId, item: &Item) -> bool {
    acting_user_id == item.owner_id
}

pub fn ensure_owner(acting_user_id: UserId, item: &Item) -> AppResult<()> {
    if authorize(acting_user_id, item) {
        return Ok(());
    }
    tracing::warn!(
        item_id = item.id,
        acting_user_id,
        owner_id = item.owner_id,
        "rejected mutation by non-owner"
    );
    Err(AppError::Unauthorized(format!(
        "You are not authorized to modify '{}'. Only its creator can change it.",
        item.name
    )))
}

#[cfg(test)]
mod tests {
    use super::{authorize, ensure_owner};
    use crate::errors::AppError;
    use crate::models::Item;
    use chrono::Utc;

    fn item_owned_by(owner_id: i64) -> Item {
        Item {
            id: 1,
            name: "Ball".to_string(),
            description: String::new(),
            created_at: Utc::now(),
            category_id: 1,
            owner_id,
        }
    }

    #[test]
    fn owner_is_allowed() {
        assert!(authorize(42, &item_owned_by(42)));
        assert!(ensure_owner(42, &item_owned_by(42)).is_ok());
    }

    #[test]
    fn anyone_else_is_rejected() {
        assert!(!authorize(7, &item_owned_by(42)));
        assert!(matches!(ensure_owner(7, &item_owned_by(42)), Err(AppError::Unauthorized(_))));
    }
}
