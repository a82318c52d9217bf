//! PostgreSQL-backed [`ContentStore`].
//!
//! Diesel is synchronous, so every call checks out a pooled connection inside
//! `spawn_blocking`.

mod filters;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{Array, Uuid as SqlUuid};
use galley_core::query::ListingQuery;
use galley_core::{
    BlogPost, ContentStore, NewBlogPost, NewRecipe, NewTag, Page, PostStatus, Recipe, StoreError,
    Tag, TagChanges, TagRef, Visibility,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::DbPool;
use crate::models::{
    BlogPostRow, BlogPostTagRow, NewBlogPostRow, NewRecipeRow, NewTagRow, RecipeRow,
    RecipeTagRow, TagChangeset, TagRow,
};
use crate::raw_sql::{
    DROP_REDUNDANT_POST_TAGS_SQL, DROP_REDUNDANT_RECIPE_TAGS_SQL, RECOMPUTE_USAGE_SQL,
};
use crate::schema::{blog_post_tags, blog_posts, recipe_tags, recipes, tags};

pub struct PgContentStore {
    pool: Arc<DbPool>,
}

impl PgContentStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut PgConnection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| StoreError::Unavailable(format!("database connection failed: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("database task failed: {}", e)))?
    }
}

fn store_error(err: DieselError) -> StoreError {
    match err {
        DieselError::NotFound => StoreError::NotFound,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            StoreError::Conflict(info.message().to_string())
        }
        other => StoreError::Query(other.to_string()),
    }
}

fn recompute_usage(conn: &mut PgConnection, tag_ids: Vec<Uuid>) -> QueryResult<usize> {
    if tag_ids.is_empty() {
        return Ok(0);
    }
    diesel::sql_query(RECOMPUTE_USAGE_SQL)
        .bind::<Array<SqlUuid>, _>(tag_ids)
        .execute(conn)
}

fn recipe_tag_refs(
    conn: &mut PgConnection,
    recipe_ids: Vec<Uuid>,
) -> QueryResult<HashMap<Uuid, Vec<TagRef>>> {
    let rows: Vec<(Uuid, Uuid, String, String)> = recipe_tags::table
        .inner_join(tags::table)
        .filter(recipe_tags::recipe_id.eq_any(recipe_ids))
        .order((recipe_tags::recipe_id, recipe_tags::position.asc()))
        .select((recipe_tags::recipe_id, tags::id, tags::name, tags::slug))
        .load(conn)?;
    Ok(group_tag_refs(rows))
}

fn post_tag_refs(
    conn: &mut PgConnection,
    post_ids: Vec<Uuid>,
) -> QueryResult<HashMap<Uuid, Vec<TagRef>>> {
    let rows: Vec<(Uuid, Uuid, String, String)> = blog_post_tags::table
        .inner_join(tags::table)
        .filter(blog_post_tags::blog_post_id.eq_any(post_ids))
        .order((blog_post_tags::blog_post_id, blog_post_tags::position.asc()))
        .select((blog_post_tags::blog_post_id, tags::id, tags::name, tags::slug))
        .load(conn)?;
    Ok(group_tag_refs(rows))
}

fn group_tag_refs(rows: Vec<(Uuid, Uuid, String, String)>) -> HashMap<Uuid, Vec<TagRef>> {
    let mut grouped: HashMap<Uuid, Vec<TagRef>> = HashMap::new();
    for (owner, id, name, slug) in rows {
        grouped
            .entry(owner)
            .or_default()
            .push(TagRef { id, name, slug });
    }
    grouped
}

fn hydrate_recipes(conn: &mut PgConnection, rows: Vec<RecipeRow>) -> QueryResult<Vec<Recipe>> {
    let mut refs = recipe_tag_refs(conn, rows.iter().map(|r| r.id).collect())?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let tags = refs.remove(&row.id).unwrap_or_default();
            row.into_recipe(tags)
        })
        .collect())
}

fn hydrate_posts(
    conn: &mut PgConnection,
    rows: Vec<BlogPostRow>,
) -> Result<Vec<BlogPost>, StoreError> {
    let mut refs = post_tag_refs(conn, rows.iter().map(|p| p.id).collect()).map_err(store_error)?;
    rows.into_iter()
        .map(|row| {
            let tags = refs.remove(&row.id).unwrap_or_default();
            row.into_post(tags)
        })
        .collect()
}

fn load_post(conn: &mut PgConnection, id: Uuid) -> Result<BlogPost, StoreError> {
    let row = blog_posts::table
        .find(id)
        .select(BlogPostRow::as_select())
        .first(conn)
        .map_err(store_error)?;
    hydrate_posts(conn, vec![row])?
        .pop()
        .ok_or(StoreError::NotFound)
}

fn load_tag(conn: &mut PgConnection, id: Uuid) -> QueryResult<TagRow> {
    tags::table.find(id).select(TagRow::as_select()).first(conn)
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn list_recipes(&self, query: &ListingQuery) -> Result<Page<Recipe>, StoreError> {
        let query = query.clone();
        self.run(move |conn| {
            let total: i64 = filters::recipe_count_query(filters::recipe_predicates(&query.filters)?)
                .get_result(conn)
                .map_err(store_error)?;

            let rows: Vec<RecipeRow> = filters::recipe_page_query(
                filters::recipe_predicates(&query.filters)?,
                query.sort,
            )
            .limit(query.page.limit())
            .offset(query.page.offset())
            .load(conn)
            .map_err(store_error)?;

            let recipes = hydrate_recipes(conn, rows).map_err(store_error)?;
            Ok(Page::new(recipes, total, query.page))
        })
        .await
    }

    async fn recipe_by_slug(
        &self,
        slug: &str,
        visibility: Visibility,
    ) -> Result<Option<Recipe>, StoreError> {
        let slug = slug.to_string();
        self.run(move |conn| {
            let mut query = recipes::table
                .filter(recipes::slug.eq(slug))
                .select(RecipeRow::as_select())
                .into_boxed();
            if visibility == Visibility::Published {
                query = query.filter(recipes::published.eq(true));
            }

            let Some(row) = query.first(conn).optional().map_err(store_error)? else {
                return Ok(None);
            };
            Ok(hydrate_recipes(conn, vec![row]).map_err(store_error)?.pop())
        })
        .await
    }

    async fn insert_recipe(&self, recipe: NewRecipe) -> Result<Recipe, StoreError> {
        self.run(move |conn| {
            conn.transaction::<_, DieselError, _>(|conn| {
                let row: RecipeRow = diesel::insert_into(recipes::table)
                    .values(NewRecipeRow {
                        slug: &recipe.slug,
                        title: &recipe.title,
                        description: &recipe.description,
                        category: &recipe.category,
                        cuisine: recipe.cuisine.as_deref(),
                        difficulty: &recipe.difficulty,
                        servings: recipe.servings,
                        prep_time_minutes: recipe.prep_time_minutes,
                        cook_time_minutes: recipe.cook_time_minutes,
                        published: recipe.published,
                        featured: recipe.featured,
                        author_id: recipe.author_id,
                    })
                    .returning(RecipeRow::as_returning())
                    .get_result(conn)?;

                let links: Vec<RecipeTagRow> = recipe
                    .tag_ids
                    .iter()
                    .enumerate()
                    .map(|(position, tag_id)| RecipeTagRow {
                        recipe_id: row.id,
                        tag_id: *tag_id,
                        position: position as i32,
                    })
                    .collect();
                if !links.is_empty() {
                    diesel::insert_into(recipe_tags::table)
                        .values(&links)
                        .execute(conn)?;
                }
                recompute_usage(conn, recipe.tag_ids.clone())?;

                Ok(hydrate_recipes(conn, vec![row])?.pop())
            })
            .map_err(store_error)?
            .ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn list_posts(&self, query: &ListingQuery) -> Result<Page<BlogPost>, StoreError> {
        let query = query.clone();
        self.run(move |conn| {
            let total: i64 = filters::post_count_query(filters::post_predicates(&query.filters)?)
                .get_result(conn)
                .map_err(store_error)?;

            let rows: Vec<BlogPostRow> =
                filters::post_page_query(filters::post_predicates(&query.filters)?, query.sort)
                    .limit(query.page.limit())
                    .offset(query.page.offset())
                    .load(conn)
                    .map_err(store_error)?;

            let posts = hydrate_posts(conn, rows)?;
            Ok(Page::new(posts, total, query.page))
        })
        .await
    }

    async fn post_by_slug(
        &self,
        slug: &str,
        visibility: Visibility,
    ) -> Result<Option<BlogPost>, StoreError> {
        let slug = slug.to_string();
        self.run(move |conn| {
            let mut query = blog_posts::table
                .filter(blog_posts::slug.eq(slug))
                .select(BlogPostRow::as_select())
                .into_boxed();
            if visibility == Visibility::Published {
                query = query.filter(blog_posts::status.eq(PostStatus::Published.as_str()));
            }

            let Some(row) = query.first(conn).optional().map_err(store_error)? else {
                return Ok(None);
            };
            Ok(hydrate_posts(conn, vec![row])?.pop())
        })
        .await
    }

    async fn insert_post(&self, post: NewBlogPost) -> Result<BlogPost, StoreError> {
        self.run(move |conn| {
            let id = conn
                .transaction::<_, DieselError, _>(|conn| {
                    let published_at = (post.status == PostStatus::Published).then(Utc::now);
                    let id: Uuid = diesel::insert_into(blog_posts::table)
                        .values(NewBlogPostRow {
                            slug: &post.slug,
                            title: &post.title,
                            excerpt: &post.excerpt,
                            content: &post.content,
                            status: post.status.as_str(),
                            category: &post.category,
                            featured: post.featured,
                            author_id: post.author_id,
                            published_at,
                        })
                        .returning(blog_posts::id)
                        .get_result(conn)?;

                    let links: Vec<BlogPostTagRow> = post
                        .tag_ids
                        .iter()
                        .enumerate()
                        .map(|(position, tag_id)| BlogPostTagRow {
                            blog_post_id: id,
                            tag_id: *tag_id,
                            position: position as i32,
                        })
                        .collect();
                    if !links.is_empty() {
                        diesel::insert_into(blog_post_tags::table)
                            .values(&links)
                            .execute(conn)?;
                    }
                    recompute_usage(conn, post.tag_ids.clone())?;
                    Ok(id)
                })
                .map_err(store_error)?;

            load_post(conn, id)
        })
        .await
    }

    async fn publish_post(&self, id: Uuid, at: DateTime<Utc>) -> Result<BlogPost, StoreError> {
        self.run(move |conn| {
            conn.transaction::<_, DieselError, _>(|conn| {
                let status: String = blog_posts::table
                    .find(id)
                    .select(blog_posts::status)
                    .for_update()
                    .first(conn)?;
                if status == PostStatus::Published.as_str() {
                    return Ok(());
                }

                diesel::update(blog_posts::table.find(id))
                    .set((
                        blog_posts::status.eq(PostStatus::Published.as_str()),
                        blog_posts::published_at.eq(Some(at)),
                        blog_posts::updated_at.eq(at),
                    ))
                    .execute(conn)?;

                let tag_ids: Vec<Uuid> = blog_post_tags::table
                    .filter(blog_post_tags::blog_post_id.eq(id))
                    .select(blog_post_tags::tag_id)
                    .load(conn)?;
                recompute_usage(conn, tag_ids)?;
                Ok(())
            })
            .map_err(store_error)?;

            load_post(conn, id)
        })
        .await
    }

    async fn record_post_view(&self, id: Uuid) -> Result<(), StoreError> {
        self.run(move |conn| {
            let updated = diesel::update(blog_posts::table.find(id))
                .set(blog_posts::view_count.eq(blog_posts::view_count + 1))
                .execute(conn)
                .map_err(store_error)?;
            if updated == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        self.run(|conn| {
            let rows: Vec<TagRow> = tags::table
                .select(TagRow::as_select())
                .order((filters::lower(tags::name).asc(), tags::id.asc()))
                .load(conn)
                .map_err(store_error)?;
            Ok(rows.into_iter().map(Tag::from).collect())
        })
        .await
    }

    async fn tag_by_id(&self, id: Uuid) -> Result<Option<Tag>, StoreError> {
        self.run(move |conn| {
            Ok(load_tag(conn, id)
                .optional()
                .map_err(store_error)?
                .map(Tag::from))
        })
        .await
    }

    async fn tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, StoreError> {
        let slug = slug.to_string();
        self.run(move |conn| {
            let row: Option<TagRow> = tags::table
                .filter(tags::slug.eq(slug))
                .select(TagRow::as_select())
                .first(conn)
                .optional()
                .map_err(store_error)?;
            Ok(row.map(Tag::from))
        })
        .await
    }

    async fn insert_tag(&self, tag: NewTag) -> Result<Tag, StoreError> {
        self.run(move |conn| {
            let row: TagRow = diesel::insert_into(tags::table)
                .values(NewTagRow {
                    name: &tag.name,
                    slug: &tag.slug,
                    color: &tag.color,
                })
                .returning(TagRow::as_returning())
                .get_result(conn)
                .map_err(store_error)?;
            Ok(row.into())
        })
        .await
    }

    async fn update_tag(&self, id: Uuid, changes: TagChanges) -> Result<Tag, StoreError> {
        self.run(move |conn| {
            let changeset = TagChangeset {
                name: changes.name.as_deref(),
                slug: changes.slug.as_deref(),
                color: changes.color.as_deref(),
            };
            // Diesel refuses an empty SET clause
            let row = if changeset.name.is_none()
                && changeset.slug.is_none()
                && changeset.color.is_none()
            {
                load_tag(conn, id)
            } else {
                diesel::update(tags::table.find(id))
                    .set(&changeset)
                    .returning(TagRow::as_returning())
                    .get_result(conn)
            };
            Ok(row.map_err(store_error)?.into())
        })
        .await
    }

    async fn delete_tag(&self, id: Uuid) -> Result<(), StoreError> {
        self.run(move |conn| {
            let deleted = conn
                .transaction::<_, DieselError, _>(|conn| {
                    diesel::delete(recipe_tags::table.filter(recipe_tags::tag_id.eq(id)))
                        .execute(conn)?;
                    diesel::delete(blog_post_tags::table.filter(blog_post_tags::tag_id.eq(id)))
                        .execute(conn)?;
                    diesel::delete(tags::table.find(id)).execute(conn)
                })
                .map_err(store_error)?;
            if deleted == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn merge_tags(&self, source: Uuid, target: Uuid) -> Result<Tag, StoreError> {
        self.run(move |conn| {
            let merged = conn
                .transaction::<_, DieselError, _>(|conn| {
                    let locked: Vec<Uuid> = tags::table
                        .filter(tags::id.eq_any(vec![source, target]))
                        .select(tags::id)
                        .for_update()
                        .load(conn)?;
                    if locked.len() != 2 {
                        return Err(DieselError::NotFound);
                    }

                    diesel::sql_query(DROP_REDUNDANT_RECIPE_TAGS_SQL)
                        .bind::<SqlUuid, _>(source)
                        .bind::<SqlUuid, _>(target)
                        .execute(conn)?;
                    diesel::update(recipe_tags::table.filter(recipe_tags::tag_id.eq(source)))
                        .set(recipe_tags::tag_id.eq(target))
                        .execute(conn)?;

                    diesel::sql_query(DROP_REDUNDANT_POST_TAGS_SQL)
                        .bind::<SqlUuid, _>(source)
                        .bind::<SqlUuid, _>(target)
                        .execute(conn)?;
                    diesel::update(blog_post_tags::table.filter(blog_post_tags::tag_id.eq(source)))
                        .set(blog_post_tags::tag_id.eq(target))
                        .execute(conn)?;

                    diesel::delete(tags::table.find(source)).execute(conn)?;
                    recompute_usage(conn, vec![target])?;
                    load_tag(conn, target)
                })
                .map_err(store_error)?;
            Ok(merged.into())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_tag_refs_keeps_order() {
        let (recipe, a, b) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let grouped = group_tag_refs(vec![
            (recipe, a, "Soup".to_string(), "soup".to_string()),
            (recipe, b, "Quick".to_string(), "quick".to_string()),
        ]);
        let slugs: Vec<&str> = grouped[&recipe].iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["soup", "quick"]);
    }

    #[test]
    fn test_not_found_maps_through() {
        assert!(matches!(
            store_error(DieselError::NotFound),
            StoreError::NotFound
        ));
        assert!(matches!(
            store_error(DieselError::RollbackTransaction),
            StoreError::Query(_)
        ));
    }
}
