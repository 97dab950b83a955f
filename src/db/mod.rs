use crate::errors::{AppError, AppResult};
use crate::models::{Category, CategoryId, IdentityProfile, Item, ItemId, ItemRecord, User, UserId};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const SCHEMA_SQL: &str = include_str!("schema.sql");
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const ITEM_RECORD_COLUMNS: &str =
    "i.id, i.name, i.description, i.created_at, i.category_id, i.owner_id, c.name";

#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Database {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
            }
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Runs `f` against the connection without opening a write transaction.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> AppResult<T>) -> AppResult<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Runs `f` inside one `BEGIN IMMEDIATE` transaction. Any error rolls back
    /// everything `f` wrote.
    pub fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> AppResult<T>) -> AppResult<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }

    #[cfg(test)]
    pub(crate) fn validate_category_integrity(&self) -> AppResult<()> {
        self.read(|conn| {
            let empty: i64 = conn.query_row(
                "SELECT COUNT(1)
                 FROM categories c
                 WHERE NOT EXISTS (SELECT 1 FROM items i WHERE i.category_id = c.id)",
                [],
                |row| row.get(0),
            )?;
            if empty > 0 {
                return Err(AppError::Internal(format!(
                    "category invariant violated: {} categories without items",
                    empty
                )));
            }
            Ok(())
        })
    }
}

pub fn find_category_by_name(conn: &Connection, name: &str) -> AppResult<Option<Category>> {
    let category = conn
        .query_row(
            "SELECT id, name FROM categories WHERE name = ?1",
            [name],
            parse_category_row,
        )
        .optional()?;
    Ok(category)
}

pub fn get_category(conn: &Connection, category_id: CategoryId) -> AppResult<Option<Category>> {
    let category = conn
        .query_row(
            "SELECT id, name FROM categories WHERE id = ?1",
            [category_id],
            parse_category_row,
        )
        .optional()?;
    Ok(category)
}

/// Fails with `AppError::Conflict` when the name is already taken.
pub fn insert_category(conn: &Connection, name: &str) -> AppResult<Category> {
    conn.execute("INSERT INTO categories (name) VALUES (?1)", [name])?;
    Ok(Category {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
    })
}

pub fn list_categories(conn: &Connection) -> AppResult<Vec<Category>> {
    let mut statement = conn.prepare("SELECT id, name FROM categories ORDER BY name ASC, id ASC")?;
    let rows = statement.query_map([], parse_category_row)?;
    let mut categories = Vec::new();
    for row in rows {
        categories.push(row?);
    }
    Ok(categories)
}

/// Deletes the category only if no item references it. Returns whether a row was removed.
pub fn delete_category_if_empty(conn: &Connection, category_id: CategoryId) -> AppResult<bool> {
    let changed = conn.execute(
        "DELETE FROM categories
         WHERE id = ?1
           AND NOT EXISTS (SELECT 1 FROM items WHERE category_id = ?1)",
        [category_id],
    )?;
    Ok(changed > 0)
}

pub fn insert_item(
    conn: &Connection,
    name: &str,
    description: &str,
    created_at: DateTime<Utc>,
    category_id: CategoryId,
    owner_id: UserId,
) -> AppResult<Item> {
    let created_at = created_at.trunc_subsecs(6);
    conn.execute(
        "INSERT INTO items (name, description, created_at, category_id, owner_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![name, description, format_time(created_at), category_id, owner_id],
    )?;

    Ok(Item {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        description: description.to_string(),
        created_at,
        category_id,
        owner_id,
    })
}

pub fn get_item(conn: &Connection, item_id: ItemId) -> AppResult<Option<Item>> {
    let item = conn
        .query_row(
            "SELECT id, name, description, created_at, category_id, owner_id FROM items WHERE id = ?1",
            [item_id],
            parse_item_row,
        )
        .optional()?;
    Ok(item)
}

pub fn update_item(conn: &Connection, item: &Item) -> AppResult<()> {
    let changed = conn.execute(
        "UPDATE items SET name = ?1, description = ?2, category_id = ?3 WHERE id = ?4",
        params![item.name, item.description, item.category_id, item.id],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound(format!("Item {} no longer exists", item.id)));
    }
    Ok(())
}

pub fn delete_item(conn: &Connection, item_id: ItemId) -> AppResult<bool> {
    let changed = conn.execute("DELETE FROM items WHERE id = ?1", [item_id])?;
    Ok(changed > 0)
}

pub fn item_name_taken(conn: &Connection, name: &str, excluding: Option<ItemId>) -> AppResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(1) FROM items WHERE name = ?1 AND (?2 IS NULL OR id != ?2)",
        params![name, excluding],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn get_item_record(conn: &Connection, item_id: ItemId) -> AppResult<Option<ItemRecord>> {
    let query = format!(
        "SELECT {ITEM_RECORD_COLUMNS}
         FROM items i JOIN categories c ON c.id = i.category_id
         WHERE i.id = ?1"
    );
    let record = conn.query_row(&query, [item_id], parse_item_record_row).optional()?;
    Ok(record)
}

pub fn find_item_record(
    conn: &Connection,
    category_name: &str,
    item_name: &str,
    item_id: ItemId,
) -> AppResult<Option<ItemRecord>> {
    let query = format!(
        "SELECT {ITEM_RECORD_COLUMNS}
         FROM items i JOIN categories c ON c.id = i.category_id
         WHERE i.id = ?1 AND i.name = ?2 AND c.name = ?3"
    );
    let record = conn
        .query_row(&query, params![item_id, item_name, category_name], parse_item_record_row)
        .optional()?;
    Ok(record)
}

pub fn find_item_record_by_name(
    conn: &Connection,
    item_name: &str,
    item_id: ItemId,
) -> AppResult<Option<ItemRecord>> {
    let query = format!(
        "SELECT {ITEM_RECORD_COLUMNS}
         FROM items i JOIN categories c ON c.id = i.category_id
         WHERE i.id = ?1 AND i.name = ?2"
    );
    let record = conn
        .query_row(&query, params![item_id, item_name], parse_item_record_row)
        .optional()?;
    Ok(record)
}

pub fn list_item_records_in_category(conn: &Connection, category_id: CategoryId) -> AppResult<Vec<ItemRecord>> {
    let query = format!(
        "SELECT {ITEM_RECORD_COLUMNS}
         FROM items i JOIN categories c ON c.id = i.category_id
         WHERE i.category_id = ?1
         ORDER BY i.name ASC, i.id ASC"
    );
    collect_item_records(conn, &query, [category_id])
}

pub fn latest_item_records(conn: &Connection, limit: usize) -> AppResult<Vec<ItemRecord>> {
    let query = format!(
        "SELECT {ITEM_RECORD_COLUMNS}
         FROM items i JOIN categories c ON c.id = i.category_id
         ORDER BY i.created_at DESC, i.id DESC
         LIMIT ?1"
    );
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    collect_item_records(conn, &query, [limit])
}

pub fn list_all_item_records(conn: &Connection) -> AppResult<Vec<ItemRecord>> {
    let query = format!(
        "SELECT {ITEM_RECORD_COLUMNS}
         FROM items i JOIN categories c ON c.id = i.category_id
         ORDER BY c.name ASC, i.name ASC, i.id ASC"
    );
    collect_item_records(conn, &query, [])
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, name, email, picture_url FROM users WHERE email = ?1",
            [email],
            parse_user_row,
        )
        .optional()?;
    Ok(user)
}

pub fn get_user(conn: &Connection, user_id: UserId) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, name, email, picture_url FROM users WHERE id = ?1",
            [user_id],
            parse_user_row,
        )
        .optional()?;
    Ok(user)
}

/// Fails with `AppError::Conflict` when the email is already registered.
pub fn insert_user(conn: &Connection, profile: &IdentityProfile) -> AppResult<User> {
    conn.execute(
        "INSERT INTO users (name, email, picture_url) VALUES (?1, ?2, ?3)",
        params![profile.name, profile.email, profile.picture_url],
    )?;
    Ok(User {
        id: conn.last_insert_rowid(),
        name: profile.name.clone(),
        email: profile.email.clone(),
        picture_url: profile.picture_url.clone(),
    })
}

fn collect_item_records<P: rusqlite::Params>(
    conn: &Connection,
    query: &str,
    params: P,
) -> AppResult<Vec<ItemRecord>> {
    let mut statement = conn.prepare(query)?;
    let rows = statement.query_map(params, parse_item_record_row)?;
    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

fn parse_category_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn parse_item_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_time(&row.get::<_, String>(3)?)?,
        category_id: row.get(4)?,
        owner_id: row.get(5)?,
    })
}

fn parse_item_record_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ItemRecord> {
    Ok(ItemRecord {
        item: parse_item_row(row)?,
        category_name: row.get(6)?,
    })
}

fn parse_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        picture_url: row.get(3)?,
    })
}

/// Fixed-width so that text ordering in SQL matches chronological ordering.
pub fn format_time(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, error.to_string())),
            )
        })
}
