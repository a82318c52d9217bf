//! Back-office writes for recipes and posts.

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::error::{StoreError, ValidationError};
use crate::slug::{slugify, with_suffix};
use crate::store::{ContentStore, Visibility};
use crate::tags::{TagError, TagRegistry};
use crate::types::{BlogPost, NewBlogPost, NewRecipe, PostStatus, Recipe, UserId};

pub const MAX_TITLE_LEN: usize = 200;
const MAX_SLUG_ATTEMPTS: u32 = 100;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Invalid content: {0}")]
    Validation(#[from] ValidationError),

    #[error("Content not found")]
    NotFound,

    #[error("Content storage failed: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ContentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ContentError::NotFound,
            other => ContentError::Store(other),
        }
    }
}

impl From<TagError> for ContentError {
    fn from(err: TagError) -> Self {
        match err {
            TagError::Validation(e) => ContentError::Validation(e),
            TagError::NotFound => ContentError::NotFound,
            TagError::Store(e) => ContentError::Store(e),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecipeDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub cuisine: Option<String>,
    pub difficulty: String,
    pub servings: i32,
    pub prep_time_minutes: i32,
    pub cook_time_minutes: i32,
    pub published: bool,
    pub featured: bool,
    /// Tag names; missing tags are created.
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub category: String,
    pub featured: bool,
    pub publish: bool,
    pub tags: Vec<String>,
}

fn validate_title(raw: &str) -> Result<(String, String), ValidationError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ValidationError::new("title", "Title cannot be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationError::new(
            "title",
            format!("Title must be at most {} characters", MAX_TITLE_LEN),
        ));
    }
    let slug = slugify(title);
    if slug.is_empty() {
        return Err(ValidationError::new(
            "title",
            "Title must contain at least one letter or digit",
        ));
    }
    Ok((title.to_string(), slug))
}

/// One week; longer prep or cook times are data-entry mistakes.
pub const MAX_TIME_MINUTES: i32 = 10_080;

fn non_negative(field: &'static str, value: i32) -> Result<i32, ValidationError> {
    if value < 0 {
        Err(ValidationError::new(field, "Must not be negative"))
    } else {
        Ok(value)
    }
}

fn minutes(field: &'static str, value: i32) -> Result<i32, ValidationError> {
    let value = non_negative(field, value)?;
    if value > MAX_TIME_MINUTES {
        Err(ValidationError::new(
            field,
            format!("Must be at most {} minutes", MAX_TIME_MINUTES),
        ))
    } else {
        Ok(value)
    }
}

fn normalize_label(raw: &str, fallback: &str) -> String {
    let label = raw.trim().to_lowercase();
    if label.is_empty() {
        fallback.to_string()
    } else {
        label
    }
}

/// Create a recipe with a slug derived from its title. Colliding slugs get a
/// numeric suffix.
pub async fn create_recipe(
    store: &dyn ContentStore,
    registry: &TagRegistry,
    draft: RecipeDraft,
    author: UserId,
) -> Result<Recipe, ContentError> {
    let (title, base_slug) = validate_title(&draft.title)?;
    let servings = non_negative("servings", draft.servings)?;
    let prep = minutes("prep_time_minutes", draft.prep_time_minutes)?;
    let cook = minutes("cook_time_minutes", draft.cook_time_minutes)?;
    let tag_ids: Vec<Uuid> = registry
        .bulk_create(&draft.tags)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();

    for attempt in 1..=MAX_SLUG_ATTEMPTS {
        let recipe = NewRecipe {
            slug: with_suffix(&base_slug, attempt),
            title: title.clone(),
            description: draft.description.trim().to_string(),
            category: normalize_label(&draft.category, "uncategorized"),
            cuisine: draft
                .cuisine
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            difficulty: normalize_label(&draft.difficulty, "medium"),
            servings,
            prep_time_minutes: prep,
            cook_time_minutes: cook,
            published: draft.published,
            featured: draft.featured,
            author_id: author,
            tag_ids: tag_ids.clone(),
        };
        match store.insert_recipe(recipe).await {
            Ok(recipe) => {
                tracing::info!(recipe_id = %recipe.id, slug = %recipe.slug, "recipe created");
                return Ok(recipe);
            }
            Err(StoreError::Conflict(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(ValidationError::new("title", "Too many recipes share this title").into())
}

/// Create a post, optionally publishing it immediately.
pub async fn create_post(
    store: &dyn ContentStore,
    registry: &TagRegistry,
    draft: PostDraft,
    author: UserId,
) -> Result<BlogPost, ContentError> {
    let (title, base_slug) = validate_title(&draft.title)?;
    let tag_ids: Vec<Uuid> = registry
        .bulk_create(&draft.tags)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();
    let status = if draft.publish {
        PostStatus::Published
    } else {
        PostStatus::Draft
    };

    for attempt in 1..=MAX_SLUG_ATTEMPTS {
        let post = NewBlogPost {
            slug: with_suffix(&base_slug, attempt),
            title: title.clone(),
            excerpt: draft.excerpt.trim().to_string(),
            content: draft.content.clone(),
            status,
            category: normalize_label(&draft.category, "general"),
            featured: draft.featured,
            author_id: author,
            tag_ids: tag_ids.clone(),
        };
        match store.insert_post(post).await {
            Ok(post) => {
                tracing::info!(post_id = %post.id, slug = %post.slug, "post created");
                return Ok(post);
            }
            Err(StoreError::Conflict(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(ValidationError::new("title", "Too many posts share this title").into())
}

/// Draft → published. Already published posts are returned unchanged.
pub async fn publish_post(store: &dyn ContentStore, id: Uuid) -> Result<BlogPost, ContentError> {
    let post = store.publish_post(id, Utc::now()).await?;
    tracing::info!(post_id = %post.id, slug = %post.slug, "post published");
    Ok(post)
}

/// Fetch a published post for display and count the view.
pub async fn view_post(
    store: &dyn ContentStore,
    slug: &str,
) -> Result<Option<BlogPost>, ContentError> {
    let Some(mut post) = store.post_by_slug(slug, Visibility::Published).await? else {
        return Ok(None);
    };
    store.record_post_view(post.id).await?;
    post.view_count += 1;
    Ok(Some(post))
}
