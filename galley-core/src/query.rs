//! Listing predicates as data.
//!
//! Builders turn normalized criteria into a [`ListingQuery`]; each
//! [`ContentStore`](crate::store::ContentStore) translates the filter
//! expressions into its own query language. [`FilterExpr::matches`] evaluates
//! them directly against loaded entities.

use crate::filters::{PostCriteria, RecipeCriteria, SortOrder, ALL};
use crate::pagination::PageRequest;
use crate::types::{BlogPost, PostStatus, Recipe};

/// Entity attribute a filter can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Description,
    Excerpt,
    Category,
    Difficulty,
    /// Prep plus cook minutes.
    TotalTime,
    Servings,
    Published,
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    Equals {
        field: Field,
        value: Value,
    },
    /// Inclusive bounds; a missing bound is open.
    Range {
        field: Field,
        min: Option<i64>,
        max: Option<i64>,
    },
    /// Case-insensitive substring match on any of the fields.
    SubstringAnyOf {
        fields: Vec<Field>,
        needle: String,
    },
    /// Entity must carry every listed tag slug.
    TagsAll(Vec<String>),
}

/// A fully described listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    /// Conjunction of filters.
    pub filters: Vec<FilterExpr>,
    pub sort: SortOrder,
    pub page: PageRequest,
}

/// Public recipe listing. Unpublished recipes are always excluded.
pub fn recipe_listing(criteria: &RecipeCriteria) -> ListingQuery {
    let mut filters = vec![published_recipes()];
    filters.extend(recipe_filters(criteria));
    ListingQuery {
        filters,
        sort: criteria.sort,
        page: criteria.page_request(),
    }
}

/// Back-office recipe listing; drafts included.
pub fn admin_recipe_listing(criteria: &RecipeCriteria) -> ListingQuery {
    ListingQuery {
        filters: recipe_filters(criteria),
        sort: criteria.sort,
        page: criteria.admin_page_request(),
    }
}

/// Public blog listing. Drafts are always excluded.
pub fn post_listing(criteria: &PostCriteria) -> ListingQuery {
    let mut filters = vec![published_posts()];
    filters.extend(post_filters(criteria));
    ListingQuery {
        filters,
        sort: criteria.sort,
        page: criteria.page_request(),
    }
}

/// Back-office blog listing; drafts included.
pub fn admin_post_listing(criteria: &PostCriteria) -> ListingQuery {
    ListingQuery {
        filters: post_filters(criteria),
        sort: criteria.sort,
        page: criteria.admin_page_request(),
    }
}

pub fn published_recipes() -> FilterExpr {
    FilterExpr::Equals {
        field: Field::Published,
        value: Value::Bool(true),
    }
}

pub fn published_posts() -> FilterExpr {
    FilterExpr::Equals {
        field: Field::Status,
        value: Value::Text(PostStatus::Published.as_str().to_string()),
    }
}

fn recipe_filters(criteria: &RecipeCriteria) -> Vec<FilterExpr> {
    let mut filters = Vec::new();

    if criteria.category != ALL {
        filters.push(FilterExpr::Equals {
            field: Field::Category,
            value: Value::Text(criteria.category.clone()),
        });
    }
    if criteria.difficulty != ALL {
        filters.push(FilterExpr::Equals {
            field: Field::Difficulty,
            value: Value::Text(criteria.difficulty.clone()),
        });
    }
    if criteria.max_time > 0 {
        filters.push(FilterExpr::Range {
            field: Field::TotalTime,
            min: None,
            max: Some(i64::from(criteria.max_time)),
        });
    }
    if criteria.servings > 0 {
        filters.push(FilterExpr::Range {
            field: Field::Servings,
            min: Some(i64::from(criteria.servings)),
            max: None,
        });
    }
    if !criteria.tags.is_empty() {
        filters.push(FilterExpr::TagsAll(criteria.tags.clone()));
    }
    if let Some(ref q) = criteria.query {
        filters.push(FilterExpr::SubstringAnyOf {
            fields: vec![Field::Title, Field::Description],
            needle: q.clone(),
        });
    }

    filters
}

fn post_filters(criteria: &PostCriteria) -> Vec<FilterExpr> {
    let mut filters = Vec::new();

    if criteria.category != ALL {
        filters.push(FilterExpr::Equals {
            field: Field::Category,
            value: Value::Text(criteria.category.clone()),
        });
    }
    if !criteria.tags.is_empty() {
        filters.push(FilterExpr::TagsAll(criteria.tags.clone()));
    }
    if let Some(ref q) = criteria.query {
        filters.push(FilterExpr::SubstringAnyOf {
            fields: vec![Field::Title, Field::Excerpt],
            needle: q.clone(),
        });
    }

    filters
}

/// Attribute access used to evaluate filters in memory.
pub trait Filterable {
    fn text(&self, field: Field) -> Option<&str>;
    fn number(&self, field: Field) -> Option<i64>;
    fn flag(&self, field: Field) -> Option<bool>;
    fn has_tag(&self, slug: &str) -> bool;
}

impl Filterable for Recipe {
    fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::Title => Some(&self.title),
            Field::Description => Some(&self.description),
            Field::Category => Some(&self.category),
            Field::Difficulty => Some(&self.difficulty),
            _ => None,
        }
    }

    fn number(&self, field: Field) -> Option<i64> {
        match field {
            Field::TotalTime => Some(i64::from(self.total_time_minutes())),
            Field::Servings => Some(i64::from(self.servings)),
            _ => None,
        }
    }

    fn flag(&self, field: Field) -> Option<bool> {
        match field {
            Field::Published => Some(self.published),
            _ => None,
        }
    }

    fn has_tag(&self, slug: &str) -> bool {
        self.tags.iter().any(|t| t.slug == slug)
    }
}

impl Filterable for BlogPost {
    fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::Title => Some(&self.title),
            Field::Excerpt => Some(&self.excerpt),
            Field::Category => Some(&self.category),
            Field::Status => Some(self.status.as_str()),
            _ => None,
        }
    }

    fn number(&self, _field: Field) -> Option<i64> {
        None
    }

    fn flag(&self, _field: Field) -> Option<bool> {
        None
    }

    fn has_tag(&self, slug: &str) -> bool {
        self.tags.iter().any(|t| t.slug == slug)
    }
}

impl FilterExpr {
    /// Evaluate against a loaded entity. A filter on a field the entity does
    /// not have never matches.
    pub fn matches<T: Filterable>(&self, item: &T) -> bool {
        match self {
            FilterExpr::Equals {
                field,
                value: Value::Bool(expected),
            } => item.flag(*field) == Some(*expected),
            FilterExpr::Equals {
                field,
                value: Value::Text(expected),
            } => item
                .text(*field)
                .is_some_and(|actual| actual.to_lowercase() == expected.to_lowercase()),
            FilterExpr::Range { field, min, max } => match item.number(*field) {
                Some(n) => min.map_or(true, |min| n >= min) && max.map_or(true, |max| n <= max),
                None => false,
            },
            FilterExpr::SubstringAnyOf { fields, needle } => {
                let needle = needle.to_lowercase();
                fields.iter().any(|field| {
                    item.text(*field)
                        .is_some_and(|text| text.to_lowercase().contains(&needle))
                })
            }
            FilterExpr::TagsAll(slugs) => slugs.iter().all(|slug| item.has_tag(slug)),
        }
    }
}

/// True when every filter in the conjunction matches.
pub fn matches_all<T: Filterable>(filters: &[FilterExpr], item: &T) -> bool {
    filters.iter().all(|f| f.matches(item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::RawListingParams;

    fn criteria(params: RawListingParams) -> RecipeCriteria {
        RecipeCriteria::from_raw(&params)
    }

    #[test]
    fn test_default_listing_only_filters_published() {
        let query = recipe_listing(&RecipeCriteria::default());
        assert_eq!(query.filters, vec![published_recipes()]);
        assert_eq!(query.sort, SortOrder::Newest);
        assert_eq!(query.page, PageRequest::new(1, 12));
    }

    #[test]
    fn test_full_recipe_listing() {
        let query = recipe_listing(&criteria(RawListingParams {
            q: Some("soup".to_string()),
            category: Some("dinner".to_string()),
            difficulty: Some("easy".to_string()),
            max_time: Some("30".to_string()),
            servings: Some("4".to_string()),
            tags: Some("vegan,quick".to_string()),
            ..Default::default()
        }));

        assert_eq!(query.filters[0], published_recipes());
        assert!(query.filters.contains(&FilterExpr::Equals {
            field: Field::Category,
            value: Value::Text("dinner".to_string()),
        }));
        assert!(query.filters.contains(&FilterExpr::Range {
            field: Field::TotalTime,
            min: None,
            max: Some(30),
        }));
        assert!(query.filters.contains(&FilterExpr::Range {
            field: Field::Servings,
            min: Some(4),
            max: None,
        }));
        assert!(query
            .filters
            .contains(&FilterExpr::TagsAll(vec!["vegan".to_string(), "quick".to_string()])));
        assert!(query.filters.contains(&FilterExpr::SubstringAnyOf {
            fields: vec![Field::Title, Field::Description],
            needle: "soup".to_string(),
        }));
        assert_eq!(query.filters.len(), 7);
    }

    #[test]
    fn test_admin_listing_has_no_published_filter() {
        let query = admin_recipe_listing(&RecipeCriteria::default());
        assert!(query.filters.is_empty());
        assert_eq!(query.page.size(), 25);

        let query = admin_post_listing(&PostCriteria::default());
        assert!(query.filters.is_empty());
    }

    #[test]
    fn test_post_listing_filters_status() {
        let query = post_listing(&PostCriteria {
            query: Some("axum".to_string()),
            ..Default::default()
        });
        assert_eq!(query.filters[0], published_posts());
        assert_eq!(
            query.filters[1],
            FilterExpr::SubstringAnyOf {
                fields: vec![Field::Title, Field::Excerpt],
                needle: "axum".to_string(),
            }
        );
    }

    #[test]
    fn test_tags_all_needs_every_tag() {
        let filter = FilterExpr::TagsAll(vec!["a".to_string(), "b".to_string()]);
        struct Tagged(Vec<&'static str>);
        impl Filterable for Tagged {
            fn text(&self, _: Field) -> Option<&str> {
                None
            }
            fn number(&self, _: Field) -> Option<i64> {
                None
            }
            fn flag(&self, _: Field) -> Option<bool> {
                None
            }
            fn has_tag(&self, slug: &str) -> bool {
                self.0.iter().any(|t| *t == slug)
            }
        }
        assert!(filter.matches(&Tagged(vec!["a", "b", "c"])));
        assert!(!filter.matches(&Tagged(vec!["a"])));
    }
}
