pub mod content;
pub mod error;
pub mod filters;
pub mod github;
pub mod identity;
pub mod pagination;
pub mod query;
pub mod rate_limit;
pub mod slug;
pub mod store;
pub mod tags;
pub mod types;

pub use content::{ContentError, PostDraft, RecipeDraft};
pub use error::{StoreError, ValidationError};
pub use filters::{PostCriteria, RawListingParams, RecipeCriteria, SortOrder, ViewMode};
pub use identity::{CurrentUser, IdentityProvider, Role, StaticIdentityProvider};
pub use pagination::{Page, PageRequest, ADMIN_PAGE_SIZE, PUBLIC_PAGE_SIZE};
pub use query::{Field, FilterExpr, ListingQuery, Value};
pub use rate_limit::{FixedWindowLimiter, MemoryWindowStore, RateLimitConfig, RateLimitDecision};
pub use slug::slugify;
pub use store::{ContentStore, MemoryContentStore, Visibility};
pub use tags::{TagError, TagRegistry};
pub use types::{
    BlogPost, NewBlogPost, NewRecipe, NewTag, PostStatus, Recipe, Tag, TagChanges, TagRef, UserId,
};
