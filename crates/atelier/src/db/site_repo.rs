//! Site status and per-page view counters.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DatabaseError};

#[derive(Debug, Clone, PartialEq)]
pub struct SiteStatusRow {
    pub origin: String,
    pub commissions_open: bool,
    pub requests_open: bool,
    pub art_trades_open: bool,
    pub store_open: bool,
    pub website_views: i64,
}

impl SiteStatusRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            origin: row.get("origin")?,
            commissions_open: row.get("commissions_open")?,
            requests_open: row.get("requests_open")?,
            art_trades_open: row.get("art_trades_open")?,
            store_open: row.get("store_open")?,
            website_views: row.get("website_views")?,
        })
    }
}

/// Partial update of the open/closed flags; `None` keeps the stored value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SiteStatusUpdate {
    pub commissions_open: Option<bool>,
    pub requests_open: Option<bool>,
    pub art_trades_open: Option<bool>,
    pub store_open: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageViewRow {
    pub id: i64,
    pub origin: String,
    pub pathname: String,
    pub view_count: i64,
}

impl PageViewRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            origin: row.get("origin")?,
            pathname: row.get("pathname")?,
            view_count: row.get("view_count")?,
        })
    }
}

fn ensure_site(conn: &Connection, origin: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR IGNORE INTO site_status (origin) VALUES (?1)",
        params![origin],
    )?;
    Ok(())
}

fn ensure_page(conn: &Connection, origin: &str, pathname: &str) -> Result<(), rusqlite::Error> {
    ensure_site(conn, origin)?;
    conn.execute(
        "INSERT OR IGNORE INTO page_views (origin, pathname) VALUES (?1, ?2)",
        params![origin, pathname],
    )?;
    Ok(())
}

fn load_page(conn: &Connection, origin: &str, pathname: &str) -> Result<PageViewRow, rusqlite::Error> {
    conn.query_row(
        "SELECT * FROM page_views WHERE origin = ?1 AND pathname = ?2",
        params![origin, pathname],
        PageViewRow::from_row,
    )
}

/// Returns the status row for `origin`, creating it on first use.
/// `website_views` is recomputed as the sum of the origin's page views.
pub fn get_or_create_site_status(db: &Database, origin: &str) -> Result<SiteStatusRow, DatabaseError> {
    db.with_conn(|conn| {
        ensure_site(conn, origin)?;
        conn.execute(
            "UPDATE site_status SET website_views =
                (SELECT COALESCE(SUM(view_count), 0) FROM page_views WHERE origin = ?1)
             WHERE origin = ?1",
            params![origin],
        )?;
        let row = conn.query_row(
            "SELECT * FROM site_status WHERE origin = ?1",
            params![origin],
            SiteStatusRow::from_row,
        )?;
        Ok(row)
    })
}

/// Every known origin, alphabetically. Counters are as last computed.
pub fn list_site_statuses(db: &Database) -> Result<Vec<SiteStatusRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM site_status ORDER BY origin")?;
        let rows = stmt
            .query_map([], SiteStatusRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Applies the flags set in `update` to an existing origin. Returns `None`
/// when the origin has no status row yet.
pub fn update_site_status(
    db: &Database,
    origin: &str,
    update: &SiteStatusUpdate,
) -> Result<Option<SiteStatusRow>, DatabaseError> {
    db.with_conn(|conn| {
        let updated = conn.execute(
            "UPDATE site_status SET
                commissions_open = COALESCE(?2, commissions_open),
                requests_open = COALESCE(?3, requests_open),
                art_trades_open = COALESCE(?4, art_trades_open),
                store_open = COALESCE(?5, store_open)
             WHERE origin = ?1",
            params![
                origin,
                update.commissions_open,
                update.requests_open,
                update.art_trades_open,
                update.store_open,
            ],
        )?;
        if updated == 0 {
            return Ok(None);
        }
        let row = conn
            .query_row(
                "SELECT * FROM site_status WHERE origin = ?1",
                params![origin],
                SiteStatusRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

pub fn get_or_create_page_view(
    db: &Database,
    origin: &str,
    pathname: &str,
) -> Result<PageViewRow, DatabaseError> {
    db.with_conn(|conn| {
        ensure_page(conn, origin, pathname)?;
        Ok(load_page(conn, origin, pathname)?)
    })
}

/// Counts one visit of `pathname` and returns the updated row.
pub fn record_page_view(
    db: &Database,
    origin: &str,
    pathname: &str,
) -> Result<PageViewRow, DatabaseError> {
    db.with_conn(|conn| {
        ensure_page(conn, origin, pathname)?;
        conn.execute(
            "UPDATE page_views SET view_count = view_count + 1
             WHERE origin = ?1 AND pathname = ?2",
            params![origin, pathname],
        )?;
        Ok(load_page(conn, origin, pathname)?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://art.example.com";

    #[test]
    fn test_site_status_created_on_first_use() {
        let db = Database::open_in_memory().unwrap();
        let status = get_or_create_site_status(&db, ORIGIN).unwrap();

        assert_eq!(status.origin, ORIGIN);
        assert!(!status.commissions_open);
        assert_eq!(status.website_views, 0);
    }

    #[test]
    fn test_record_page_view_increments() {
        let db = Database::open_in_memory().unwrap();

        let first = record_page_view(&db, ORIGIN, "/commissions").unwrap();
        let second = record_page_view(&db, ORIGIN, "/commissions").unwrap();

        assert_eq!(first.view_count, 1);
        assert_eq!(second.view_count, 2);
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn test_get_or_create_page_view_does_not_count() {
        let db = Database::open_in_memory().unwrap();
        let page = get_or_create_page_view(&db, ORIGIN, "/").unwrap();
        let again = get_or_create_page_view(&db, ORIGIN, "/").unwrap();

        assert_eq!(page.view_count, 0);
        assert_eq!(page, again);
    }

    #[test]
    fn test_website_views_is_sum_of_pages() {
        let db = Database::open_in_memory().unwrap();
        record_page_view(&db, ORIGIN, "/").unwrap();
        record_page_view(&db, ORIGIN, "/").unwrap();
        record_page_view(&db, ORIGIN, "/goals").unwrap();
        record_page_view(&db, "https://other.example.com", "/").unwrap();

        let status = get_or_create_site_status(&db, ORIGIN).unwrap();
        assert_eq!(status.website_views, 3);
    }

    #[test]
    fn test_update_site_status_changes_only_given_flags() {
        let db = Database::open_in_memory().unwrap();
        get_or_create_site_status(&db, ORIGIN).unwrap();

        let opened = update_site_status(
            &db,
            ORIGIN,
            &SiteStatusUpdate {
                commissions_open: Some(true),
                store_open: Some(true),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();
        assert!(opened.commissions_open && opened.store_open);
        assert!(!opened.requests_open && !opened.art_trades_open);

        let closed = update_site_status(
            &db,
            ORIGIN,
            &SiteStatusUpdate {
                store_open: Some(false),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();
        assert!(closed.commissions_open);
        assert!(!closed.store_open);
    }

    #[test]
    fn test_update_unknown_origin_is_none() {
        let db = Database::open_in_memory().unwrap();
        let update = SiteStatusUpdate {
            requests_open: Some(true),
            ..Default::default()
        };

        assert!(update_site_status(&db, ORIGIN, &update).unwrap().is_none());
        assert!(list_site_statuses(&db).unwrap().is_empty());
    }

    #[test]
    fn test_list_site_statuses() {
        let db = Database::open_in_memory().unwrap();
        get_or_create_site_status(&db, "https://b.example.com").unwrap();
        record_page_view(&db, "https://a.example.com", "/").unwrap();

        let origins: Vec<String> = list_site_statuses(&db)
            .unwrap()
            .into_iter()
            .map(|s| s.origin)
            .collect();
        assert_eq!(origins, vec!["https://a.example.com", "https://b.example.com"]);
    }
}
