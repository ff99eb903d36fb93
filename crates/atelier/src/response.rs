//! API response records. URLs are absolute and always use HTTPS.

use serde::Serialize;

use crate::config::Config;
use crate::db::catalog_repo::{CategoryRow, OptionRow};
use crate::db::commission_repo::CommissionRow;
use crate::db::goal_repo::GoalRow;
use crate::db::site_repo::{PageViewRow, SiteStatusRow};
use crate::db::visual_repo::VisualAssetRow;
use crate::pipeline::{IngestOutcome, PipelineWarning};

/// Rewrites a leading `http://` to `https://`.
pub fn https_normalize(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}

/// Builds public URLs for stored media.
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    base_url: String,
    media_url: String,
}

impl UrlBuilder {
    pub fn new(public_base_url: &str, media_url: &str) -> Self {
        let media_url = media_url.trim_matches('/');
        Self {
            base_url: https_normalize(public_base_url.trim_end_matches('/')),
            media_url: if media_url.is_empty() {
                String::new()
            } else {
                format!("/{}", media_url)
            },
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.public_base_url, &config.media_url)
    }

    /// `<base>/<media>/<storage_path>`, HTTPS.
    pub fn media(&self, storage_path: &str) -> String {
        format!(
            "{}{}/{}",
            self.base_url,
            self.media_url,
            storage_path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualResponse {
    pub id: i64,
    pub commission_id: i64,
    pub visual_url: String,
    pub mime_type: String,
    pub is_explicit: bool,
    pub is_restricted: bool,
    pub is_video: bool,
    pub group_id: String,
    pub display_order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_size: Option<u32>,
}

impl VisualResponse {
    pub fn from_row(row: &VisualAssetRow, urls: &UrlBuilder) -> Self {
        Self {
            id: row.id,
            commission_id: row.commission_id,
            visual_url: urls.media(&row.storage_path),
            mime_type: mime_guess::from_path(&row.storage_path)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
            is_explicit: row.is_explicit,
            is_restricted: row.is_restricted,
            is_video: row.is_video,
            group_id: row.group_id.clone(),
            display_order: row.display_order,
            thumbnail_size: row.thumbnail_size,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub visual: VisualResponse,
    pub thumbnails: Vec<VisualResponse>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PipelineWarning>,
}

impl IngestResponse {
    pub fn from_outcome(outcome: &IngestOutcome, urls: &UrlBuilder) -> Self {
        Self {
            visual: VisualResponse::from_row(&outcome.asset, urls),
            thumbnails: outcome
                .thumbnails
                .iter()
                .map(|row| VisualResponse::from_row(row, urls))
                .collect(),
            warnings: outcome.warnings.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommissionResponse {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub short_description: String,
    pub is_explicit: bool,
    pub is_restricted: bool,
    pub available: bool,
    pub view_count: i64,
    pub order_count: i64,
    pub visuals: Vec<VisualResponse>,
    pub categories: Vec<CategoryResponse>,
    pub options: Vec<OptionResponse>,
}

impl CommissionResponse {
    pub fn new(row: &CommissionRow, visuals: &[VisualAssetRow], urls: &UrlBuilder) -> Self {
        Self {
            id: row.id,
            title: row.title.clone(),
            slug: row.slug.clone(),
            short_description: row.short_description.clone(),
            is_explicit: row.is_explicit,
            is_restricted: row.is_restricted,
            available: row.available,
            view_count: row.view_count,
            order_count: row.order_count,
            visuals: visuals
                .iter()
                .map(|v| VisualResponse::from_row(v, urls))
                .collect(),
            categories: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn with_catalog(mut self, categories: &[CategoryRow], options: &[OptionRow]) -> Self {
        self.categories = categories.iter().map(CategoryResponse::from_row).collect();
        self.options = options.iter().map(OptionResponse::from_row).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
    pub is_explicit: bool,
    pub is_restricted: bool,
}

impl CategoryResponse {
    pub fn from_row(row: &CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name.clone(),
            is_explicit: row.is_explicit,
            is_restricted: row.is_restricted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Cents.
    pub cost: i64,
    pub is_explicit: bool,
    pub is_restricted: bool,
    pub exclusive_with: String,
    pub required: String,
}

impl OptionResponse {
    pub fn from_row(row: &OptionRow) -> Self {
        Self {
            id: row.id,
            name: row.name.clone(),
            description: row.description.clone(),
            cost: row.cost,
            is_explicit: row.is_explicit,
            is_restricted: row.is_restricted,
            exclusive_with: row.exclusive_with.clone(),
            required: row.required.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
    /// Cents.
    pub cost: i64,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_case: Option<String>,
    pub image_url: String,
    pub image_alt: String,
    pub fulfilled: bool,
    pub fulfilled_at: Option<String>,
}

impl GoalResponse {
    pub fn from_row(row: &GoalRow, urls: &UrlBuilder) -> Self {
        Self {
            id: row.id,
            name: row.name.clone(),
            slug: row.slug.clone(),
            cost: row.cost,
            description: row.description.clone(),
            use_case: row.use_case.clone(),
            image_url: urls.media(&row.image_path),
            image_alt: row.image_alt.clone(),
            fulfilled: row.fulfilled,
            fulfilled_at: row.fulfilled_at.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteStatusResponse {
    pub origin: String,
    pub commissions_open: bool,
    pub requests_open: bool,
    pub art_trades_open: bool,
    pub store_open: bool,
    pub website_views: i64,
}

impl SiteStatusResponse {
    pub fn from_row(row: &SiteStatusRow) -> Self {
        Self {
            origin: row.origin.clone(),
            commissions_open: row.commissions_open,
            requests_open: row.requests_open,
            art_trades_open: row.art_trades_open,
            store_open: row.store_open,
            website_views: row.website_views,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageViewResponse {
    pub pathname: String,
    pub view_count: i64,
    #[serde(flatten)]
    pub site: SiteStatusResponse,
}

impl PageViewResponse {
    pub fn new(page: &PageViewRow, site: &SiteStatusRow) -> Self {
        Self {
            pathname: page.pathname.clone(),
            view_count: page.view_count,
            site: SiteStatusResponse::from_row(site),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(path: &str) -> VisualAssetRow {
        VisualAssetRow {
            id: 1,
            commission_id: 2,
            storage_path: path.to_string(),
            is_explicit: false,
            is_restricted: false,
            is_video: false,
            group_id: "g".to_string(),
            display_order: 0,
            thumbnail_size: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_https_normalize() {
        assert_eq!(https_normalize("http://api.example.com"), "https://api.example.com");
        assert_eq!(https_normalize("https://api.example.com"), "https://api.example.com");
    }

    #[test]
    fn test_media_url_joins_segments() {
        let urls = UrlBuilder::new("http://api.example.com/", "/media/");
        assert_eq!(
            urls.media("commissions/files/a.webp"),
            "https://api.example.com/media/commissions/files/a.webp"
        );

        let bare = UrlBuilder::new("https://cdn.example.com", "");
        assert_eq!(bare.media("/a.webp"), "https://cdn.example.com/a.webp");
    }

    #[test]
    fn test_visual_response_mime_type() {
        let urls = UrlBuilder::new("http://x.test", "/media/");
        let webp = VisualResponse::from_row(&row("commissions/files/a.webp"), &urls);
        assert_eq!(webp.mime_type, "image/webp");
        assert_eq!(webp.visual_url, "https://x.test/media/commissions/files/a.webp");

        let video = VisualResponse::from_row(&row("commissions/files/b.mp4"), &urls);
        assert_eq!(video.mime_type, "video/mp4");
    }

    #[test]
    fn test_thumbnail_size_omitted_for_originals() {
        let urls = UrlBuilder::new("https://x.test", "/media/");
        let json = serde_json::to_value(VisualResponse::from_row(&row("a.webp"), &urls)).unwrap();
        assert!(json.get("thumbnail_size").is_none());
    }

    #[test]
    fn test_page_view_response_flattens_site_flags() {
        let page = PageViewRow {
            id: 1,
            origin: "https://art.example.com".to_string(),
            pathname: "/store".to_string(),
            view_count: 4,
        };
        let site = SiteStatusRow {
            origin: "https://art.example.com".to_string(),
            commissions_open: true,
            requests_open: false,
            art_trades_open: true,
            store_open: false,
            website_views: 9,
        };

        let json = serde_json::to_value(PageViewResponse::new(&page, &site)).unwrap();

        assert_eq!(json["origin"], "https://art.example.com");
        assert_eq!(json["view_count"], 4);
        assert_eq!(json["website_views"], 9);
        assert_eq!(json["art_trades_open"], true);
        assert_eq!(json["store_open"], false);
    }
}
