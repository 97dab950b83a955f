use crate::db;
use crate::errors::{AppError, AppResult};
use crate::models::{
    CatalogJson, Category, CategoryItemsJson, CategoryJson, ItemId, ItemRecord, SingleItemJson,
};
use rusqlite::Connection;

pub fn items_in_category(conn: &Connection, category_name: &str) -> AppResult<(Category, Vec<ItemRecord>)> {
    let category = db::find_category_by_name(conn, category_name)?
        .ok_or_else(|| AppError::NotFound(format!("Category '{}' does not exist", category_name)))?;
    let items = db::list_item_records_in_category(conn, category.id)?;
    Ok((category, items))
}

pub fn item_by_path(
    conn: &Connection,
    category_name: &str,
    item_name: &str,
    item_id: ItemId,
) -> AppResult<ItemRecord> {
    db::find_item_record(conn, category_name, item_name, item_id)?.ok_or_else(|| {
        AppError::NotFound(format!(
            "No item '{}' with id {} in category '{}'",
            item_name, item_id, category_name
        ))
    })
}

pub fn item_by_name(conn: &Connection, item_name: &str, item_id: ItemId) -> AppResult<ItemRecord> {
    db::find_item_record_by_name(conn, item_name, item_id)?
        .ok_or_else(|| AppError::NotFound(format!("No item '{}' with id {}", item_name, item_id)))
}

pub fn catalog_json(conn: &Connection) -> AppResult<CatalogJson> {
    let mut categories: Vec<CategoryJson> = db::list_categories(conn)?
        .into_iter()
        .map(|category| CategoryJson {
            name: category.name,
            items: Vec::new(),
        })
        .collect();

    // Both lists are ordered by category name, so a single forward pass groups them.
    let mut cursor = 0usize;
    for record in db::list_all_item_records(conn)? {
        while cursor < categories.len() && categories[cursor].name != record.category_name {
            cursor += 1;
        }
        if let Some(category) = categories.get_mut(cursor) {
            category.items.push(record.to_json());
        }
    }

    Ok(CatalogJson { categories })
}

pub fn category_json(conn: &Connection, category_name: &str) -> AppResult<CategoryItemsJson> {
    let (category, items) = items_in_category(conn, category_name)?;
    Ok(CategoryItemsJson {
        category: category.name,
        items: items.iter().map(ItemRecord::to_json).collect(),
    })
}

pub fn item_json(
    conn: &Connection,
    category_name: &str,
    item_name: &str,
    item_id: ItemId,
) -> AppResult<SingleItemJson> {
    let record = item_by_path(conn, category_name, item_name, item_id)?;
    Ok(SingleItemJson { item: record.to_json() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::Utc;

    fn seeded() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("catalog.sqlite")).expect("db");
        db.write(|tx| {
            tx.execute("INSERT INTO users (id, name, email) VALUES (1, 'One', 'one@example.com')", [])?;
            let soccer = db::insert_category(tx, "Soccer")?;
            let hockey = db::insert_category(tx, "Hockey")?;
            db::insert_item(tx, "Ball", "round", Utc::now(), soccer.id, 1)?;
            db::insert_item(tx, "Shin Guards", "protective", Utc::now(), soccer.id, 1)?;
            db::insert_item(tx, "Stick", "wooden", Utc::now(), hockey.id, 1)?;
            Ok(())
        })
        .expect("seed");
        (dir, db)
    }

    #[test]
    fn catalog_json_groups_items_under_categories() {
        let (_dir, db) = seeded();
        let catalog = db.read(catalog_json).expect("catalog");
        let names: Vec<&str> = catalog.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Hockey", "Soccer"]);
        assert_eq!(catalog.categories[0].items.len(), 1);
        assert_eq!(catalog.categories[1].items.len(), 2);
        assert!(catalog.categories[1].items.iter().all(|item| item.category == "Soccer"));
    }

    #[test]
    fn json_projection_omits_owner_and_timestamp() {
        let (_dir, db) = seeded();
        let value = serde_json::to_value(db.read(catalog_json).expect("catalog")).expect("json");
        let item = &value["categories"][1]["items"][0];
        let mut keys: Vec<&str> = item
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["category", "description", "name"]);
    }

    #[test]
    fn item_lookup_requires_the_full_triple() {
        let (_dir, db) = seeded();
        let record = db.read(|conn| item_by_path(conn, "Soccer", "Ball", 1)).expect("found");
        assert_eq!(record.item.name, "Ball");

        let wrong_category = db.read(|conn| item_by_path(conn, "Hockey", "Ball", 1));
        assert!(matches!(wrong_category, Err(AppError::NotFound(_))));
        let wrong_name = db.read(|conn| item_by_path(conn, "Soccer", "Bal", 1));
        assert!(matches!(wrong_name, Err(AppError::NotFound(_))));
    }

    #[test]
    fn unknown_category_is_not_found() {
        let (_dir, db) = seeded();
        let result = db.read(|conn| items_in_category(conn, "Curling"));
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
