//! Commission catalog: categories and priced options, linked many-to-many
//! to commissions. Links go away with either side through the foreign key
//! cascade.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub is_explicit: bool,
    pub is_restricted: bool,
}

impl CategoryRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            is_explicit: row.get("is_explicit")?,
            is_restricted: row.get("is_restricted")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Price in cents.
    pub cost: i64,
    pub is_explicit: bool,
    pub is_restricted: bool,
    /// Free-form names of options this one cannot be combined with.
    pub exclusive_with: String,
    /// Free-form names of options this one depends on.
    pub required: String,
}

impl OptionRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            cost: row.get("cost")?,
            is_explicit: row.get("is_explicit")?,
            is_restricted: row.get("is_restricted")?,
            exclusive_with: row.get("exclusive_with")?,
            required: row.get("required")?,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewCategory {
    pub name: String,
    pub is_explicit: bool,
    pub is_restricted: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NewOption {
    pub name: String,
    pub description: String,
    pub cost: i64,
    pub is_explicit: bool,
    pub is_restricted: bool,
    pub exclusive_with: String,
    pub required: String,
}

pub fn insert_category(db: &Database, category: &NewCategory) -> Result<CategoryRow, DatabaseError> {
    let id = db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO commission_categories (name, is_explicit, is_restricted)
             VALUES (?1, ?2, ?3)",
            params![category.name, category.is_explicit, category.is_restricted],
        )?;
        Ok(conn.last_insert_rowid())
    })?;

    log::info!("Created commission category {} ({})", id, category.name);

    Ok(CategoryRow {
        id,
        name: category.name.clone(),
        is_explicit: category.is_explicit,
        is_restricted: category.is_restricted,
    })
}

pub fn insert_option(db: &Database, option: &NewOption) -> Result<OptionRow, DatabaseError> {
    let id = db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO commission_options (name, description, cost, is_explicit, is_restricted,
             exclusive_with, required)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                option.name,
                option.description,
                option.cost,
                option.is_explicit,
                option.is_restricted,
                option.exclusive_with,
                option.required,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })?;

    log::info!("Created commission option {} ({})", id, option.name);

    Ok(OptionRow {
        id,
        name: option.name.clone(),
        description: option.description.clone(),
        cost: option.cost,
        is_explicit: option.is_explicit,
        is_restricted: option.is_restricted,
        exclusive_with: option.exclusive_with.clone(),
        required: option.required.clone(),
    })
}

pub fn find_category(db: &Database, id: i64) -> Result<Option<CategoryRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM commission_categories WHERE id = ?1",
                params![id],
                CategoryRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

pub fn find_option(db: &Database, id: i64) -> Result<Option<OptionRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM commission_options WHERE id = ?1",
                params![id],
                OptionRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

pub fn list_categories(db: &Database) -> Result<Vec<CategoryRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM commission_categories ORDER BY name, id")?;
        let rows = stmt
            .query_map([], CategoryRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn list_options(db: &Database) -> Result<Vec<OptionRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM commission_options ORDER BY name, id")?;
        let rows = stmt
            .query_map([], OptionRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn delete_category(db: &Database, id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let deleted = conn.execute("DELETE FROM commission_categories WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    })
}

pub fn delete_option(db: &Database, id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let deleted = conn.execute("DELETE FROM commission_options WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    })
}

/// Links a category to a commission. Linking twice is a no-op; returns
/// whether a new link was made.
pub fn attach_category(db: &Database, commission_id: i64, category_id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO commission_category_links (commission_id, category_id)
             VALUES (?1, ?2)",
            params![commission_id, category_id],
        )?;
        Ok(inserted > 0)
    })
}

pub fn detach_category(db: &Database, commission_id: i64, category_id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let deleted = conn.execute(
            "DELETE FROM commission_category_links WHERE commission_id = ?1 AND category_id = ?2",
            params![commission_id, category_id],
        )?;
        Ok(deleted > 0)
    })
}

/// Links an option to a commission. Linking twice is a no-op; returns
/// whether a new link was made.
pub fn attach_option(db: &Database, commission_id: i64, option_id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO commission_option_links (commission_id, option_id)
             VALUES (?1, ?2)",
            params![commission_id, option_id],
        )?;
        Ok(inserted > 0)
    })
}

pub fn detach_option(db: &Database, commission_id: i64, option_id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let deleted = conn.execute(
            "DELETE FROM commission_option_links WHERE commission_id = ?1 AND option_id = ?2",
            params![commission_id, option_id],
        )?;
        Ok(deleted > 0)
    })
}

pub fn categories_for(db: &Database, commission_id: i64) -> Result<Vec<CategoryRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT c.* FROM commission_categories c
             JOIN commission_category_links l ON l.category_id = c.id
             WHERE l.commission_id = ?1
             ORDER BY c.name, c.id",
        )?;
        let rows = stmt
            .query_map(params![commission_id], CategoryRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn options_for(db: &Database, commission_id: i64) -> Result<Vec<OptionRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT o.* FROM commission_options o
             JOIN commission_option_links l ON l.option_id = o.id
             WHERE l.commission_id = ?1
             ORDER BY o.name, o.id",
        )?;
        let rows = stmt
            .query_map(params![commission_id], OptionRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
