//! Goal repository. Each goal owns one image file under the goals directory;
//! the file is released through the registered hooks once the row no longer
//! points at it.

use rusqlite::{params, OptionalExtension, Row};

use super::commission_repo::slugify;
use super::{Database, DatabaseError};

#[derive(Debug, Clone, PartialEq)]
pub struct GoalRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    /// Price in cents.
    pub cost: i64,
    pub description: String,
    pub use_case: Option<String>,
    pub image_path: String,
    pub image_alt: String,
    pub fulfilled: bool,
    pub fulfilled_at: Option<String>,
    pub created_at: String,
}

impl GoalRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            slug: row.get("slug")?,
            cost: row.get("cost")?,
            description: row.get("description")?,
            use_case: row.get("use_case")?,
            image_path: row.get("image_path")?,
            image_alt: row.get("image_alt")?,
            fulfilled: row.get("fulfilled")?,
            fulfilled_at: row.get("fulfilled_at")?,
            created_at: row.get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewGoal {
    pub name: String,
    pub cost: i64,
    pub description: String,
    pub use_case: Option<String>,
    pub image_alt: String,
}

impl NewGoal {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

pub fn insert(db: &Database, goal: &NewGoal, image_path: &str) -> Result<GoalRow, DatabaseError> {
    let created_at = chrono::Utc::now().to_rfc3339();
    let slug = slugify(&goal.name);
    let id = db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO goals (name, slug, cost, description, use_case, image_path, image_alt,
             created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                goal.name,
                slug,
                goal.cost,
                goal.description,
                goal.use_case,
                image_path,
                goal.image_alt,
                created_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })?;

    Ok(GoalRow {
        id,
        name: goal.name.clone(),
        slug,
        cost: goal.cost,
        description: goal.description.clone(),
        use_case: goal.use_case.clone(),
        image_path: image_path.to_string(),
        image_alt: goal.image_alt.clone(),
        fulfilled: false,
        fulfilled_at: None,
        created_at,
    })
}

pub fn find_by_id(db: &Database, id: i64) -> Result<Option<GoalRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM goals WHERE id = ?1",
                params![id],
                GoalRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

pub fn list(db: &Database) -> Result<Vec<GoalRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM goals ORDER BY fulfilled, id")?;
        let rows = stmt
            .query_map([], GoalRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Points the goal at a new image. The previous file is released after the
/// update commits, unless it is the same path.
pub fn replace_image(
    db: &Database,
    id: i64,
    image_path: &str,
) -> Result<Option<GoalRow>, DatabaseError> {
    let previous = db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        let previous: Option<String> = tx
            .query_row(
                "SELECT image_path FROM goals WHERE id = ?1",
                params![id],
                |r| r.get(0),
            )
            .optional()?;
        if previous.is_some() {
            tx.execute(
                "UPDATE goals SET image_path = ?2 WHERE id = ?1",
                params![id, image_path],
            )?;
        }
        tx.commit()?;
        Ok(previous)
    })?;

    let Some(previous) = previous else {
        return Ok(None);
    };
    if previous != image_path {
        db.release_file(&previous);
    }
    find_by_id(db, id)
}

/// Marks the goal fulfilled with the current timestamp.
pub fn mark_fulfilled(db: &Database, id: i64) -> Result<bool, DatabaseError> {
    let now = chrono::Utc::now().to_rfc3339();
    db.with_conn(|conn| {
        let updated = conn.execute(
            "UPDATE goals SET fulfilled = 1, fulfilled_at = ?2 WHERE id = ?1",
            params![id, now],
        )?;
        Ok(updated > 0)
    })
}

/// Deletes the goal and releases its image file once the delete commits.
pub fn delete(db: &Database, id: i64) -> Result<bool, DatabaseError> {
    let image_path = db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        let image_path: Option<String> = tx
            .query_row(
                "SELECT image_path FROM goals WHERE id = ?1",
                params![id],
                |r| r.get(0),
            )
            .optional()?;
        tx.execute("DELETE FROM goals WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(image_path)
    })?;

    match image_path {
        Some(path) => {
            db.release_file(&path);
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::hooks::RecordingHook;
    use std::sync::Arc;

    fn test_db() -> (Database, Arc<RecordingHook>) {
        let db = Database::open_in_memory().unwrap();
        let recorder = Arc::new(RecordingHook::default());
        db.register_file_hook(recorder.clone()).unwrap();
        (db, recorder)
    }

    #[test]
    fn test_insert_and_find() {
        let (db, _) = test_db();
        let new = NewGoal {
            cost: 34_999,
            description: "Bigger drawing area".to_string(),
            use_case: Some("Line art".to_string()),
            image_alt: "A tablet".to_string(),
            ..NewGoal::named("New Tablet")
        };
        let goal = insert(&db, &new, "goals/images/tablet.png").unwrap();

        assert_eq!(goal.slug, "new-tablet");
        assert_eq!(goal.cost, 34_999);
        assert_eq!(find_by_id(&db, goal.id).unwrap().unwrap(), goal);
        assert_eq!(list(&db).unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let (db, _) = test_db();
        insert(&db, &NewGoal::named("Desk"), "goals/images/a.png").unwrap();
        let result = insert(&db, &NewGoal::named("Desk"), "goals/images/b.png");
        assert!(matches!(result, Err(DatabaseError::Sqlite(_))));
    }

    #[test]
    fn test_delete_releases_image() {
        let (db, recorder) = test_db();
        let goal = insert(&db, &NewGoal::named("Chair"), "goals/images/chair.png").unwrap();

        assert!(delete(&db, goal.id).unwrap());
        assert!(find_by_id(&db, goal.id).unwrap().is_none());
        assert_eq!(recorder.released(), vec!["goals/images/chair.png".to_string()]);
    }

    #[test]
    fn test_delete_missing_goal_releases_nothing() {
        let (db, recorder) = test_db();
        assert!(!delete(&db, 42).unwrap());
        assert!(recorder.released().is_empty());
    }

    #[test]
    fn test_replace_image_releases_previous() {
        let (db, recorder) = test_db();
        let goal = insert(&db, &NewGoal::named("Lamp"), "goals/images/old.png").unwrap();

        let updated = replace_image(&db, goal.id, "goals/images/new.png")
            .unwrap()
            .unwrap();
        assert_eq!(updated.image_path, "goals/images/new.png");
        assert_eq!(recorder.released(), vec!["goals/images/old.png".to_string()]);

        replace_image(&db, goal.id, "goals/images/new.png").unwrap();
        assert_eq!(recorder.released().len(), 1);
        assert!(replace_image(&db, 999, "x.png").unwrap().is_none());
    }

    #[test]
    fn test_mark_fulfilled() {
        let (db, _) = test_db();
        let goal = insert(&db, &NewGoal::named("Monitor"), "goals/images/m.png").unwrap();

        assert!(mark_fulfilled(&db, goal.id).unwrap());
        let goal = find_by_id(&db, goal.id).unwrap().unwrap();
        assert!(goal.fulfilled);
        assert!(goal.fulfilled_at.is_some());
        assert!(!mark_fulfilled(&db, 999).unwrap());
    }
}
