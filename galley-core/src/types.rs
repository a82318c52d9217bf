use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type UserId = Uuid;

/// Tag as attached to a recipe or post, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Uuid,
    pub slug: String,
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
    pub author_id: UserId,
    pub tags: Vec<TagRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    pub fn total_time_minutes(&self) -> i32 {
        self.prep_time_minutes.saturating_add(self.cook_time_minutes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            other => Err(format!("unknown post status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub status: PostStatus,
    pub category: String,
    pub featured: bool,
    pub view_count: i64,
    pub author_id: UserId,
    pub tags: Vec<TagRef>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlogPost {
    /// Timestamp used for "newest"/"oldest" ordering.
    pub fn sort_date(&self) -> DateTime<Utc> {
        self.published_at.unwrap_or(self.created_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub color: String,
    /// Published recipes and posts referencing this tag.
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Tag {
    pub fn to_ref(&self) -> TagRef {
        TagRef {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
        }
    }
}

/// Validated tag ready to insert.
#[derive(Debug, Clone)]
pub struct NewTag {
    pub name: String,
    pub slug: String,
    pub color: String,
}

/// Partial tag update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TagChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub slug: String,
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
    pub author_id: UserId,
    /// Tag ids in display order.
    pub tag_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewBlogPost {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub status: PostStatus,
    pub category: String,
    pub featured: bool,
    pub author_id: UserId,
    pub tag_ids: Vec<Uuid>,
}
