//! Normalization of raw listing query parameters into typed criteria.
//!
//! Every field arrives as an optional string straight from the query string.
//! Nothing here fails: malformed values fall back to their defaults.

use serde::{Deserialize, Serialize};

use crate::pagination::{PageRequest, ADMIN_PAGE_SIZE, PUBLIC_PAGE_SIZE};
use crate::slug::slugify;

/// Wildcard value for category/difficulty meaning "no filter".
pub const ALL: &str = "all";

/// Query parameters exactly as received.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawListingParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub max_time: Option<String>,
    pub servings: Option<String>,
    /// Comma-separated tag names or slugs.
    pub tags: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub view: Option<String>,
}

/// Listing order. Unknown keys fall back to `Newest`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    TitleAsc,
    TitleDesc,
    Popular,
}

impl SortOrder {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("oldest") => SortOrder::Oldest,
            Some("title-asc") => SortOrder::TitleAsc,
            Some("title-desc") => SortOrder::TitleDesc,
            Some("popular") => SortOrder::Popular,
            _ => SortOrder::Newest,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Newest => "newest",
            SortOrder::Oldest => "oldest",
            SortOrder::TitleAsc => "title-asc",
            SortOrder::TitleDesc => "title-desc",
            SortOrder::Popular => "popular",
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl ViewMode {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("list") => ViewMode::List,
            _ => ViewMode::Grid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeCriteria {
    /// Free-text search; `None` when absent or blank.
    pub query: Option<String>,
    pub category: String,
    pub difficulty: String,
    /// Maximum prep + cook minutes, 0 = unbounded.
    pub max_time: u32,
    /// Minimum servings, 0 = unbounded.
    pub servings: u32,
    /// Tag slugs, all of which must be present.
    pub tags: Vec<String>,
    pub sort: SortOrder,
    pub page: u32,
    pub view: ViewMode,
}

impl Default for RecipeCriteria {
    fn default() -> Self {
        Self {
            query: None,
            category: ALL.to_string(),
            difficulty: ALL.to_string(),
            max_time: 0,
            servings: 0,
            tags: Vec::new(),
            sort: SortOrder::Newest,
            page: 1,
            view: ViewMode::Grid,
        }
    }
}

impl RecipeCriteria {
    pub fn from_raw(raw: &RawListingParams) -> Self {
        Self {
            query: parse_text(raw.q.as_deref()),
            category: parse_choice(raw.category.as_deref()),
            difficulty: parse_choice(raw.difficulty.as_deref()),
            max_time: parse_count(raw.max_time.as_deref(), 0),
            servings: parse_count(raw.servings.as_deref(), 0),
            tags: parse_tags(raw.tags.as_deref()),
            sort: SortOrder::parse(raw.sort.as_deref()),
            page: parse_page(raw.page.as_deref()),
            view: ViewMode::parse(raw.view.as_deref()),
        }
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, PUBLIC_PAGE_SIZE)
    }

    pub fn admin_page_request(&self) -> PageRequest {
        PageRequest::new(self.page, ADMIN_PAGE_SIZE)
    }
}

/// Blog listings only filter on text, category and tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCriteria {
    pub query: Option<String>,
    pub category: String,
    pub tags: Vec<String>,
    pub sort: SortOrder,
    pub page: u32,
}

impl Default for PostCriteria {
    fn default() -> Self {
        Self {
            query: None,
            category: ALL.to_string(),
            tags: Vec::new(),
            sort: SortOrder::Newest,
            page: 1,
        }
    }
}

impl PostCriteria {
    pub fn from_raw(raw: &RawListingParams) -> Self {
        Self {
            query: parse_text(raw.q.as_deref()),
            category: parse_choice(raw.category.as_deref()),
            tags: parse_tags(raw.tags.as_deref()),
            sort: SortOrder::parse(raw.sort.as_deref()),
            page: parse_page(raw.page.as_deref()),
        }
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, PUBLIC_PAGE_SIZE)
    }

    pub fn admin_page_request(&self) -> PageRequest {
        PageRequest::new(self.page, ADMIN_PAGE_SIZE)
    }
}

fn parse_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_choice(raw: Option<&str>) -> String {
    raw.map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| ALL.to_string())
}

fn parse_count(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .unwrap_or(default)
}

fn parse_page(raw: Option<&str>) -> u32 {
    parse_count(raw, 1).max(1)
}

fn parse_tags(raw: Option<&str>) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for slug in raw.unwrap_or_default().split(',').map(slugify) {
        if !slug.is_empty() && !tags.contains(&slug) {
            tags.push(slug);
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawListingParams {
        RawListingParams::default()
    }

    #[test]
    fn test_defaults() {
        let criteria = RecipeCriteria::from_raw(&raw());
        assert_eq!(criteria, RecipeCriteria::default());
        assert_eq!(criteria.category, "all");
        assert_eq!(criteria.sort, SortOrder::Newest);
        assert_eq!(criteria.view, ViewMode::Grid);
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let params = RawListingParams {
            max_time: Some("soon".to_string()),
            servings: Some("-4".to_string()),
            page: Some("two".to_string()),
            ..raw()
        };
        let criteria = RecipeCriteria::from_raw(&params);
        assert_eq!(criteria.max_time, 0);
        assert_eq!(criteria.servings, 0);
        assert_eq!(criteria.page, 1);
    }

    #[test]
    fn test_page_zero_clamps_to_one() {
        let params = RawListingParams {
            page: Some("0".to_string()),
            ..raw()
        };
        assert_eq!(RecipeCriteria::from_raw(&params).page, 1);
    }

    #[test]
    fn test_numbers_parse() {
        let params = RawListingParams {
            max_time: Some(" 45 ".to_string()),
            servings: Some("4".to_string()),
            page: Some("3".to_string()),
            ..raw()
        };
        let criteria = RecipeCriteria::from_raw(&params);
        assert_eq!(criteria.max_time, 45);
        assert_eq!(criteria.servings, 4);
        assert_eq!(criteria.page, 3);
    }

    #[test]
    fn test_blank_query_is_no_filter() {
        let params = RawListingParams {
            q: Some("   \t ".to_string()),
            ..raw()
        };
        assert_eq!(RecipeCriteria::from_raw(&params).query, None);
    }

    #[test]
    fn test_query_is_trimmed() {
        let params = RawListingParams {
            q: Some("  green curry ".to_string()),
            ..raw()
        };
        assert_eq!(
            RecipeCriteria::from_raw(&params).query.as_deref(),
            Some("green curry")
        );
    }

    #[test]
    fn test_tags_are_slugged_and_deduplicated() {
        let params = RawListingParams {
            tags: Some("Vegan, quick-meals,,vegan , Quick Meals".to_string()),
            ..raw()
        };
        assert_eq!(
            RecipeCriteria::from_raw(&params).tags,
            vec!["vegan", "quick-meals"]
        );
    }

    #[test]
    fn test_unknown_sort_is_newest() {
        assert_eq!(SortOrder::parse(Some("cheapest")), SortOrder::Newest);
        assert_eq!(SortOrder::parse(Some("Title-Desc")), SortOrder::TitleDesc);
        assert_eq!(SortOrder::parse(None), SortOrder::Newest);
    }

    #[test]
    fn test_view_mode() {
        assert_eq!(ViewMode::parse(Some("list")), ViewMode::List);
        assert_eq!(ViewMode::parse(Some("table")), ViewMode::Grid);
    }

    #[test]
    fn test_choice_lowercased() {
        let params = RawListingParams {
            category: Some(" Desserts ".to_string()),
            difficulty: Some("".to_string()),
            ..raw()
        };
        let criteria = RecipeCriteria::from_raw(&params);
        assert_eq!(criteria.category, "desserts");
        assert_eq!(criteria.difficulty, "all");
    }

    #[test]
    fn test_post_criteria() {
        let params = RawListingParams {
            q: Some("rust".to_string()),
            tags: Some("Web Development".to_string()),
            sort: Some("popular".to_string()),
            page: Some("2".to_string()),
            ..raw()
        };
        let criteria = PostCriteria::from_raw(&params);
        assert_eq!(criteria.query.as_deref(), Some("rust"));
        assert_eq!(criteria.tags, vec!["web-development"]);
        assert_eq!(criteria.sort, SortOrder::Popular);
        assert_eq!(criteria.page, 2);
    }
}
