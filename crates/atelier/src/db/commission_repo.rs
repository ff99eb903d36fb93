//! Commission repository: listings that own visual assets.

use std::sync::OnceLock;

use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DatabaseError};

#[derive(Debug, Clone, PartialEq)]
pub struct CommissionRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub short_description: String,
    pub is_explicit: bool,
    pub is_restricted: bool,
    pub available: bool,
    pub view_count: i64,
    pub order_count: i64,
    pub created_at: String,
    pub modified_at: String,
}

impl CommissionRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            slug: row.get("slug")?,
            short_description: row.get("short_description")?,
            is_explicit: row.get("is_explicit")?,
            is_restricted: row.get("is_restricted")?,
            available: row.get("available")?,
            view_count: row.get("view_count")?,
            order_count: row.get("order_count")?,
            created_at: row.get("created_at")?,
            modified_at: row.get("modified_at")?,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewCommission {
    pub title: String,
    pub short_description: String,
    pub is_explicit: bool,
    pub is_restricted: bool,
    pub available: bool,
}

impl NewCommission {
    pub fn titled(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Default::default()
        }
    }
}

fn slug_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static slug pattern is valid"))
}

/// Lower-cases `title` and collapses every run of non-alphanumerics into `-`.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let slug = slug_separator().replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "commission".to_string()
    } else {
        slug.to_string()
    }
}

fn slug_taken(conn: &Connection, slug: &str) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT 1 FROM commissions WHERE slug = ?1",
        params![slug],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

/// Inserts a commission. Slug collisions are resolved with `-2`, `-3`, ...
pub fn insert(db: &Database, commission: &NewCommission) -> Result<CommissionRow, DatabaseError> {
    let now = chrono::Utc::now().to_rfc3339();
    let base_slug = slugify(&commission.title);

    let (id, slug) = db.with_conn(|conn| {
        let mut slug = base_slug.clone();
        let mut counter = 2;
        while slug_taken(conn, &slug)? {
            slug = format!("{}-{}", base_slug, counter);
            counter += 1;
        }

        conn.execute(
            "INSERT INTO commissions (title, slug, short_description, is_explicit, is_restricted,
             available, created_at, modified_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                commission.title,
                slug,
                commission.short_description,
                commission.is_explicit,
                commission.is_restricted,
                commission.available,
                now,
            ],
        )?;
        Ok((conn.last_insert_rowid(), slug))
    })?;

    log::info!("Created commission {} ({})", id, slug);

    Ok(CommissionRow {
        id,
        title: commission.title.clone(),
        slug,
        short_description: commission.short_description.clone(),
        is_explicit: commission.is_explicit,
        is_restricted: commission.is_restricted,
        available: commission.available,
        view_count: 0,
        order_count: 0,
        created_at: now.clone(),
        modified_at: now,
    })
}

pub fn find_by_id(db: &Database, id: i64) -> Result<Option<CommissionRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM commissions WHERE id = ?1",
                params![id],
                CommissionRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

pub fn find_by_slug(db: &Database, slug: &str) -> Result<Option<CommissionRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM commissions WHERE slug = ?1",
                params![slug],
                CommissionRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

pub fn exists(db: &Database, id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let found = conn
            .query_row(
                "SELECT 1 FROM commissions WHERE id = ?1",
                params![id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    })
}

/// Lists commissions, newest first.
pub fn list(db: &Database) -> Result<Vec<CommissionRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM commissions ORDER BY created_at DESC, id DESC")?;
        let rows = stmt
            .query_map([], CommissionRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Flips `available` and returns the new value, or `None` for an unknown ID.
pub fn toggle_availability(db: &Database, id: i64) -> Result<Option<bool>, DatabaseError> {
    let now = chrono::Utc::now().to_rfc3339();
    db.with_conn(|conn| {
        let updated = conn.execute(
            "UPDATE commissions SET available = NOT available, modified_at = ?2 WHERE id = ?1",
            params![id, now],
        )?;
        if updated == 0 {
            return Ok(None);
        }
        let available = conn.query_row(
            "SELECT available FROM commissions WHERE id = ?1",
            params![id],
            |r| r.get(0),
        )?;
        Ok(Some(available))
    })
}

#[derive(Debug, Clone, Copy)]
enum Counter {
    Views,
    Orders,
}

impl Counter {
    fn column(self) -> &'static str {
        match self {
            Counter::Views => "view_count",
            Counter::Orders => "order_count",
        }
    }
}

/// Bumps a counter in SQL and touches `modified_at`; `None` for an unknown ID.
fn increment(db: &Database, id: i64, counter: Counter) -> Result<Option<i64>, DatabaseError> {
    let now = chrono::Utc::now().to_rfc3339();
    let column = counter.column();
    db.with_conn(|conn| {
        let updated = conn.execute(
            &format!(
                "UPDATE commissions SET {0} = {0} + 1, modified_at = ?2 WHERE id = ?1",
                column
            ),
            params![id, now],
        )?;
        if updated == 0 {
            return Ok(None);
        }
        let value = conn.query_row(
            &format!("SELECT {} FROM commissions WHERE id = ?1", column),
            params![id],
            |r| r.get(0),
        )?;
        Ok(Some(value))
    })
}

/// Atomically bumps `view_count`; returns the new count.
pub fn increment_view_count(db: &Database, id: i64) -> Result<Option<i64>, DatabaseError> {
    increment(db, id, Counter::Views)
}

/// Atomically bumps `order_count`; returns the new count.
pub fn increment_order_count(db: &Database, id: i64) -> Result<Option<i64>, DatabaseError> {
    increment(db, id, Counter::Orders)
}

/// Deletes a commission. Its visual rows go with it through the foreign key
/// cascade; their files are left for the next sweep.
pub fn delete(db: &Database, id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let deleted = conn.execute("DELETE FROM commissions WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Full Body Illustration"), "full-body-illustration");
        assert_eq!(slugify("  Ref -- Sheet!! "), "ref-sheet");
        assert_eq!(slugify("???"), "commission");
    }

    #[test]
    fn test_insert_and_find() {
        let db = test_db();
        let mut new = NewCommission::titled("Headshot");
        new.short_description = "Shoulders up".to_string();
        new.available = true;

        let inserted = insert(&db, &new).unwrap();
        assert_eq!(inserted.slug, "headshot");

        let by_id = find_by_id(&db, inserted.id).unwrap().unwrap();
        assert_eq!(by_id, inserted);

        let by_slug = find_by_slug(&db, "headshot").unwrap().unwrap();
        assert_eq!(by_slug.id, inserted.id);
        assert!(exists(&db, inserted.id).unwrap());
        assert!(!exists(&db, inserted.id + 1).unwrap());
    }

    #[test]
    fn test_duplicate_titles_get_numbered_slugs() {
        let db = test_db();
        let a = insert(&db, &NewCommission::titled("Badge")).unwrap();
        let b = insert(&db, &NewCommission::titled("Badge")).unwrap();
        let c = insert(&db, &NewCommission::titled("badge")).unwrap();

        assert_eq!(a.slug, "badge");
        assert_eq!(b.slug, "badge-2");
        assert_eq!(c.slug, "badge-3");
        assert_eq!(list(&db).unwrap().len(), 3);
    }

    #[test]
    fn test_toggle_availability() {
        let db = test_db();
        let row = insert(&db, &NewCommission::titled("Sketch")).unwrap();
        assert!(!row.available);

        assert_eq!(toggle_availability(&db, row.id).unwrap(), Some(true));
        assert_eq!(toggle_availability(&db, row.id).unwrap(), Some(false));
        assert_eq!(toggle_availability(&db, 999).unwrap(), None);
    }

    #[test]
    fn test_counters_increment() {
        let db = test_db();
        let row = insert(&db, &NewCommission::titled("Chibi")).unwrap();

        assert_eq!(increment_view_count(&db, row.id).unwrap(), Some(1));
        assert_eq!(increment_view_count(&db, row.id).unwrap(), Some(2));
        assert_eq!(increment_order_count(&db, row.id).unwrap(), Some(1));
        assert_eq!(increment_order_count(&db, 999).unwrap(), None);

        let row = find_by_id(&db, row.id).unwrap().unwrap();
        assert_eq!(row.view_count, 2);
        assert_eq!(row.order_count, 1);
    }

    #[test]
    fn test_counters_touch_modified_at() {
        let db = test_db();
        let row = insert(&db, &NewCommission::titled("Pinup")).unwrap();
        let stale = "2000-01-01T00:00:00+00:00";
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE commissions SET modified_at = ?2 WHERE id = ?1",
                params![row.id, stale],
            )?;
            Ok(())
        })
        .unwrap();

        increment_view_count(&db, row.id).unwrap();
        let viewed = find_by_id(&db, row.id).unwrap().unwrap();
        assert_ne!(viewed.modified_at, stale);
        assert_eq!(viewed.created_at, row.created_at);
    }

    #[test]
    fn test_delete() {
        let db = test_db();
        let row = insert(&db, &NewCommission::titled("Emote")).unwrap();

        assert!(delete(&db, row.id).unwrap());
        assert!(!delete(&db, row.id).unwrap());
        assert!(find_by_id(&db, row.id).unwrap().is_none());
    }
}
