//! Persistence capability used by every read and write path.
//!
//! The server backs this with PostgreSQL; [`MemoryContentStore`] is used by
//! tests and by local runs without a database.

mod memory;

pub use memory::MemoryContentStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::pagination::Page;
use crate::query::ListingQuery;
use crate::types::{BlogPost, NewBlogPost, NewRecipe, NewTag, Recipe, Tag, TagChanges};

/// Which entities a single-item lookup may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Published recipes / posts only.
    Published,
    /// Drafts too; back-office only.
    Any,
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Filter, sort and paginate recipes. A page past the end yields no items.
    async fn list_recipes(&self, query: &ListingQuery) -> Result<Page<Recipe>, StoreError>;

    async fn recipe_by_slug(
        &self,
        slug: &str,
        visibility: Visibility,
    ) -> Result<Option<Recipe>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the slug is taken.
    async fn insert_recipe(&self, recipe: NewRecipe) -> Result<Recipe, StoreError>;

    async fn list_posts(&self, query: &ListingQuery) -> Result<Page<BlogPost>, StoreError>;

    async fn post_by_slug(
        &self,
        slug: &str,
        visibility: Visibility,
    ) -> Result<Option<BlogPost>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the slug is taken.
    async fn insert_post(&self, post: NewBlogPost) -> Result<BlogPost, StoreError>;

    /// Move a draft to published. Publishing an already published post
    /// returns it unchanged.
    async fn publish_post(&self, id: Uuid, at: DateTime<Utc>) -> Result<BlogPost, StoreError>;

    /// Increment the view counter by one.
    async fn record_post_view(&self, id: Uuid) -> Result<(), StoreError>;

    /// All tags ordered by name.
    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError>;

    async fn tag_by_id(&self, id: Uuid) -> Result<Option<Tag>, StoreError>;

    async fn tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the slug is taken.
    async fn insert_tag(&self, tag: NewTag) -> Result<Tag, StoreError>;

    async fn update_tag(&self, id: Uuid, changes: TagChanges) -> Result<Tag, StoreError>;

    /// Remove the tag and every reference to it.
    async fn delete_tag(&self, id: Uuid) -> Result<(), StoreError>;

    /// Atomically move every reference from `source` to `target`, refresh the
    /// target's usage count and delete `source`. Returns the updated target.
    async fn merge_tags(&self, source: Uuid, target: Uuid) -> Result<Tag, StoreError>;
}
