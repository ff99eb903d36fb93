//! Visual asset repository: CRUD operations for the `visual_assets` table.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// A visual asset row: one physical file, original or derived thumbnail.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualAssetRow {
    pub id: i64,
    pub commission_id: i64,
    pub storage_path: String,
    pub is_explicit: bool,
    pub is_restricted: bool,
    pub is_video: bool,
    pub group_id: String,
    pub display_order: i64,
    /// Ladder size this row was derived at; `None` for originals.
    pub thumbnail_size: Option<u32>,
    pub created_at: String,
}

impl VisualAssetRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            commission_id: row.get("commission_id")?,
            storage_path: row.get("storage_path")?,
            is_explicit: row.get("is_explicit")?,
            is_restricted: row.get("is_restricted")?,
            is_video: row.get("is_video")?,
            group_id: row.get("group_id")?,
            display_order: row.get("display_order")?,
            thumbnail_size: row.get("thumbnail_size")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn is_thumbnail(&self) -> bool {
        self.thumbnail_size.is_some()
    }

    /// Row for a thumbnail derived from this asset, stored at `storage_path`.
    /// Classification flags, commission and ordering are copied verbatim.
    pub fn derive_thumbnail(&self, storage_path: String, size: u32) -> NewVisualAsset {
        NewVisualAsset {
            commission_id: self.commission_id,
            storage_path,
            is_explicit: self.is_explicit,
            is_restricted: self.is_restricted,
            is_video: self.is_video,
            group_id: self.group_id.clone(),
            display_order: self.display_order,
            thumbnail_size: Some(size),
        }
    }
}

/// Values for a row that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewVisualAsset {
    pub commission_id: i64,
    pub storage_path: String,
    pub is_explicit: bool,
    pub is_restricted: bool,
    pub is_video: bool,
    pub group_id: String,
    pub display_order: i64,
    pub thumbnail_size: Option<u32>,
}

/// Inserts a row and returns it as stored.
pub fn insert(db: &Database, asset: &NewVisualAsset) -> Result<VisualAssetRow, DatabaseError> {
    let created_at = chrono::Utc::now().to_rfc3339();
    let id = db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO visual_assets (commission_id, storage_path, is_explicit, is_restricted,
             is_video, group_id, display_order, thumbnail_size, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                asset.commission_id,
                asset.storage_path,
                asset.is_explicit,
                asset.is_restricted,
                asset.is_video,
                asset.group_id,
                asset.display_order,
                asset.thumbnail_size,
                created_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })?;

    Ok(VisualAssetRow {
        id,
        commission_id: asset.commission_id,
        storage_path: asset.storage_path.clone(),
        is_explicit: asset.is_explicit,
        is_restricted: asset.is_restricted,
        is_video: asset.is_video,
        group_id: asset.group_id.clone(),
        display_order: asset.display_order,
        thumbnail_size: asset.thumbnail_size,
        created_at,
    })
}

/// Finds an asset by its ID.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<VisualAssetRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM visual_assets WHERE id = ?1",
                params![id],
                VisualAssetRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// All members of a group: the original first, then thumbnails largest first.
pub fn find_by_group(db: &Database, group_id: &str) -> Result<Vec<VisualAssetRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM visual_assets WHERE group_id = ?1
             ORDER BY thumbnail_size IS NOT NULL, thumbnail_size DESC, id",
        )?;
        let rows = stmt
            .query_map(params![group_id], VisualAssetRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Assets of a commission in presentation order.
pub fn list_by_commission(
    db: &Database,
    commission_id: i64,
) -> Result<Vec<VisualAssetRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM visual_assets WHERE commission_id = ?1
             ORDER BY display_order, id",
        )?;
        let rows = stmt
            .query_map(params![commission_id], VisualAssetRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Every `storage_path` currently referenced by a row.
pub fn all_storage_paths(db: &Database) -> Result<Vec<String>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT storage_path FROM visual_assets")?;
        let paths = stmt
            .query_map([], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(paths)
    })
}

/// Points a row at a new stored file.
pub fn update_storage_path(
    db: &Database,
    id: i64,
    storage_path: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let updated = conn.execute(
            "UPDATE visual_assets SET storage_path = ?2 WHERE id = ?1",
            params![id, storage_path],
        )?;
        Ok(updated > 0)
    })
}

/// Deletes a row. Returns false when no row had that ID.
pub fn delete(db: &Database, id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let deleted = conn.execute("DELETE FROM visual_assets WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    })
}

pub fn count_by_group(db: &Database, group_id: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM visual_assets WHERE group_id = ?1",
            params![group_id],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::commission_repo::{self, NewCommission};

    fn test_db() -> (Database, i64) {
        let db = Database::open_in_memory().expect("Failed to create test database");
        let commission = commission_repo::insert(&db, &NewCommission::titled("Full Body")).unwrap();
        (db, commission.id)
    }

    fn sample_asset(commission_id: i64, path: &str, group: &str) -> NewVisualAsset {
        NewVisualAsset {
            commission_id,
            storage_path: path.to_string(),
            is_explicit: false,
            is_restricted: true,
            is_video: false,
            group_id: group.to_string(),
            display_order: 3,
            thumbnail_size: None,
        }
    }

    #[test]
    fn test_insert_and_find() {
        let (db, commission_id) = test_db();
        let inserted = insert(&db, &sample_asset(commission_id, "commissions/files/a.png", "g1"))
            .unwrap();

        let found = find_by_id(&db, inserted.id).unwrap().unwrap();
        assert_eq!(found, inserted);
        assert!(found.is_restricted);
        assert!(!found.is_thumbnail());
    }

    #[test]
    fn test_find_nonexistent() {
        let (db, _) = test_db();
        assert!(find_by_id(&db, 9999).unwrap().is_none());
    }

    #[test]
    fn test_insert_requires_existing_commission() {
        let (db, commission_id) = test_db();
        let result = insert(&db, &sample_asset(commission_id + 100, "x.png", "g1"));
        assert!(matches!(result, Err(DatabaseError::Sqlite(_))));
    }

    #[test]
    fn test_derive_thumbnail_copies_flags() {
        let (db, commission_id) = test_db();
        let mut original = sample_asset(commission_id, "commissions/files/a.webp", "g1");
        original.is_explicit = true;
        let original = insert(&db, &original).unwrap();

        let derived = original.derive_thumbnail("commissions/files/a_256.webp".to_string(), 256);
        assert_eq!(derived.group_id, "g1");
        assert_eq!(derived.display_order, 3);
        assert!(derived.is_explicit);
        assert!(derived.is_restricted);
        assert_eq!(derived.thumbnail_size, Some(256));
    }

    #[test]
    fn test_find_by_group_orders_original_first() {
        let (db, commission_id) = test_db();
        let original = insert(&db, &sample_asset(commission_id, "f/a.webp", "g1")).unwrap();
        insert(&db, &original.derive_thumbnail("f/a_256.webp".to_string(), 256)).unwrap();
        insert(&db, &original.derive_thumbnail("f/a_512.webp".to_string(), 512)).unwrap();
        insert(&db, &sample_asset(commission_id, "f/other.webp", "g2")).unwrap();

        let group = find_by_group(&db, "g1").unwrap();
        let sizes: Vec<Option<u32>> = group.iter().map(|r| r.thumbnail_size).collect();
        assert_eq!(sizes, vec![None, Some(512), Some(256)]);
        assert_eq!(count_by_group(&db, "g1").unwrap(), 3);
    }

    #[test]
    fn test_list_by_commission_uses_display_order() {
        let (db, commission_id) = test_db();
        let mut second = sample_asset(commission_id, "f/b.webp", "g2");
        second.display_order = 2;
        let mut first = sample_asset(commission_id, "f/a.webp", "g1");
        first.display_order = 1;
        insert(&db, &second).unwrap();
        insert(&db, &first).unwrap();

        let listed = list_by_commission(&db, commission_id).unwrap();
        let paths: Vec<&str> = listed.iter().map(|r| r.storage_path.as_str()).collect();
        assert_eq!(paths, vec!["f/a.webp", "f/b.webp"]);
    }

    #[test]
    fn test_update_storage_path_and_delete() {
        let (db, commission_id) = test_db();
        let row = insert(&db, &sample_asset(commission_id, "f/upload.png", "g1")).unwrap();

        assert!(update_storage_path(&db, row.id, "f/1234.webp").unwrap());
        assert_eq!(all_storage_paths(&db).unwrap(), vec!["f/1234.webp".to_string()]);

        assert!(delete(&db, row.id).unwrap());
        assert!(!delete(&db, row.id).unwrap());
        assert!(all_storage_paths(&db).unwrap().is_empty());
    }
}
