use chrono::{DateTime, Utc};
use diesel::prelude::*;
use galley_core::{BlogPost, PostStatus, Recipe, StoreError, Tag, TagRef};
use uuid::Uuid;

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub role: String,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::sessions)]
pub struct NewSession<'a> {
    pub user_id: Uuid,
    pub token_hash: &'a str,
    pub expires_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::recipes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RecipeRow {
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
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecipeRow {
    pub fn into_recipe(self, tags: Vec<TagRef>) -> Recipe {
        Recipe {
            id: self.id,
            slug: self.slug,
            title: self.title,
            description: self.description,
            category: self.category,
            cuisine: self.cuisine,
            difficulty: self.difficulty,
            servings: self.servings,
            prep_time_minutes: self.prep_time_minutes,
            cook_time_minutes: self.cook_time_minutes,
            published: self.published,
            featured: self.featured,
            author_id: self.author_id,
            tags,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::recipes)]
pub struct NewRecipeRow<'a> {
    pub slug: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub category: &'a str,
    pub cuisine: Option<&'a str>,
    pub difficulty: &'a str,
    pub servings: i32,
    pub prep_time_minutes: i32,
    pub cook_time_minutes: i32,
    pub published: bool,
    pub featured: bool,
    pub author_id: Uuid,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::blog_posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BlogPostRow {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub status: String,
    pub category: String,
    pub featured: bool,
    pub view_count: i64,
    pub author_id: Uuid,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlogPostRow {
    pub fn into_post(self, tags: Vec<TagRef>) -> Result<BlogPost, StoreError> {
        let status: PostStatus = self.status.parse().map_err(StoreError::Query)?;
        Ok(BlogPost {
            id: self.id,
            slug: self.slug,
            title: self.title,
            excerpt: self.excerpt,
            content: self.content,
            status,
            category: self.category,
            featured: self.featured,
            view_count: self.view_count,
            author_id: self.author_id,
            tags,
            published_at: self.published_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::blog_posts)]
pub struct NewBlogPostRow<'a> {
    pub slug: &'a str,
    pub title: &'a str,
    pub excerpt: &'a str,
    pub content: &'a str,
    pub status: &'a str,
    pub category: &'a str,
    pub featured: bool,
    pub author_id: Uuid,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::tags)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TagRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            id: row.id,
            name: row.name,
            slug: row.slug,
            color: row.color,
            usage_count: row.usage_count,
            created_at: row.created_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::tags)]
pub struct NewTagRow<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub color: &'a str,
}

/// Partial tag update; `None` fields are left untouched.
#[derive(AsChangeset, Default)]
#[diesel(table_name = crate::schema::tags)]
pub struct TagChangeset<'a> {
    pub name: Option<&'a str>,
    pub slug: Option<&'a str>,
    pub color: Option<&'a str>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::recipe_tags)]
pub struct RecipeTagRow {
    pub recipe_id: Uuid,
    pub tag_id: Uuid,
    pub position: i32,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::blog_post_tags)]
pub struct BlogPostTagRow {
    pub blog_post_id: Uuid,
    pub tag_id: Uuid,
    pub position: i32,
}
