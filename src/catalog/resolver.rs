use crate::db;
use crate::errors::{AppError, AppResult};
use crate::models::Category;
use rusqlite::Connection;

/// Returns the category called `name`, creating it when absent.
///
/// Creation relies on the UNIQUE constraint on `categories.name`: if another
/// writer inserted the same name first, the conflict is swallowed and the
/// winning row is fetched instead.
pub fn resolve_category(conn: &Connection, name: &str) -> AppResult<Category> {
    if let Some(existing) = db::find_category_by_name(conn, name)? {
        return Ok(existing);
    }

    match db::insert_category(conn, name) {
        Ok(category) => {
            tracing::info!(category_id = category.id, category = %category.name, "category created");
            Ok(category)
        }
        Err(AppError::Conflict(detail)) => {
            tracing::debug!(category = %name, detail = %detail, "category created concurrently; using existing row");
            db::find_category_by_name(conn, name)?.ok_or_else(|| {
                AppError::Internal(format!("category '{}' vanished after a name conflict", name))
            })
        }
        Err(error) => Err(error),
    }
}
