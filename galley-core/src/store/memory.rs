use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use super::{ContentStore, Visibility};
use crate::error::StoreError;
use crate::filters::SortOrder;
use crate::pagination::Page;
use crate::query::{matches_all, ListingQuery};
use crate::types::{
    BlogPost, NewBlogPost, NewRecipe, NewTag, PostStatus, Recipe, Tag, TagChanges, TagRef,
};

#[derive(Debug, Clone)]
struct StoredTag {
    id: Uuid,
    name: String,
    slug: String,
    color: String,
    created_at: DateTime<Utc>,
}

/// Entity plus its tag ids; `tags` on the entity itself is filled on read.
#[derive(Debug, Clone)]
struct Stored<T> {
    seq: u64,
    entity: T,
    tag_ids: Vec<Uuid>,
}

#[derive(Debug, Default)]
struct State {
    next_seq: u64,
    recipes: Vec<Stored<Recipe>>,
    posts: Vec<Stored<BlogPost>>,
    tags: BTreeMap<Uuid, StoredTag>,
}

impl State {
    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn tag_refs(&self, ids: &[Uuid]) -> Vec<TagRef> {
        ids.iter()
            .filter_map(|id| self.tags.get(id))
            .map(|t| TagRef {
                id: t.id,
                name: t.name.clone(),
                slug: t.slug.clone(),
            })
            .collect()
    }

    fn recipe(&self, stored: &Stored<Recipe>) -> Recipe {
        let mut recipe = stored.entity.clone();
        recipe.tags = self.tag_refs(&stored.tag_ids);
        recipe
    }

    fn post(&self, stored: &Stored<BlogPost>) -> BlogPost {
        let mut post = stored.entity.clone();
        post.tags = self.tag_refs(&stored.tag_ids);
        post
    }

    fn usage_count(&self, tag_id: Uuid) -> i64 {
        let recipes = self
            .recipes
            .iter()
            .filter(|r| r.entity.published && r.tag_ids.contains(&tag_id))
            .count();
        let posts = self
            .posts
            .iter()
            .filter(|p| p.entity.status == PostStatus::Published && p.tag_ids.contains(&tag_id))
            .count();
        (recipes + posts) as i64
    }

    fn tag(&self, stored: &StoredTag) -> Tag {
        Tag {
            id: stored.id,
            name: stored.name.clone(),
            slug: stored.slug.clone(),
            color: stored.color.clone(),
            usage_count: self.usage_count(stored.id),
            created_at: stored.created_at,
        }
    }

    fn slug_owner(&self, slug: &str) -> Option<Uuid> {
        self.tags.values().find(|t| t.slug == slug).map(|t| t.id)
    }

    fn check_tag_ids(&self, ids: &[Uuid]) -> Result<(), StoreError> {
        match ids.iter().find(|id| !self.tags.contains_key(id)) {
            Some(missing) => Err(StoreError::Query(format!("unknown tag {}", missing))),
            None => Ok(()),
        }
    }
}

/// Replace `source` with `target` in a tag list, keeping position and
/// avoiding a duplicate when `target` is already present.
fn reassign(tag_ids: &mut Vec<Uuid>, source: Uuid, target: Uuid) {
    if !tag_ids.contains(&source) {
        return;
    }
    if tag_ids.contains(&target) {
        tag_ids.retain(|id| *id != source);
    } else {
        for id in tag_ids.iter_mut() {
            if *id == source {
                *id = target;
            }
        }
    }
}

fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn sort_recipes(rows: &mut [(u64, Recipe)], sort: SortOrder) {
    rows.sort_by(|(seq_a, a), (seq_b, b)| {
        let newest = (b.created_at, seq_b).cmp(&(a.created_at, seq_a));
        match sort {
            SortOrder::Newest => newest,
            SortOrder::Oldest => newest.reverse(),
            SortOrder::TitleAsc => compare_titles(&a.title, &b.title),
            SortOrder::TitleDesc => compare_titles(&b.title, &a.title),
            SortOrder::Popular => b.featured.cmp(&a.featured).then(newest),
        }
    });
}

fn sort_posts(rows: &mut [(u64, BlogPost)], sort: SortOrder) {
    rows.sort_by(|(seq_a, a), (seq_b, b)| {
        let newest = (b.sort_date(), seq_b).cmp(&(a.sort_date(), seq_a));
        match sort {
            SortOrder::Newest => newest,
            SortOrder::Oldest => newest.reverse(),
            SortOrder::TitleAsc => compare_titles(&a.title, &b.title),
            SortOrder::TitleDesc => compare_titles(&b.title, &a.title),
            SortOrder::Popular => b.view_count.cmp(&a.view_count).then(newest),
        }
    });
}

/// In-process [`ContentStore`]. Every operation runs under a single lock, so
/// merges and deletes are atomic with respect to readers.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    state: RwLock<State>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn list_recipes(&self, query: &ListingQuery) -> Result<Page<Recipe>, StoreError> {
        let state = self.read()?;
        let mut rows: Vec<(u64, Recipe)> = state
            .recipes
            .iter()
            .map(|stored| (stored.seq, state.recipe(stored)))
            .filter(|(_, recipe)| matches_all(&query.filters, recipe))
            .collect();
        sort_recipes(&mut rows, query.sort);

        let recipes = rows.into_iter().map(|(_, recipe)| recipe).collect();
        Ok(Page::from_sorted(recipes, query.page))
    }

    async fn recipe_by_slug(
        &self,
        slug: &str,
        visibility: Visibility,
    ) -> Result<Option<Recipe>, StoreError> {
        let state = self.read()?;
        Ok(state
            .recipes
            .iter()
            .find(|r| r.entity.slug == slug)
            .filter(|r| visibility == Visibility::Any || r.entity.published)
            .map(|r| state.recipe(r)))
    }

    async fn insert_recipe(&self, recipe: NewRecipe) -> Result<Recipe, StoreError> {
        let mut state = self.write()?;
        if state.recipes.iter().any(|r| r.entity.slug == recipe.slug) {
            return Err(StoreError::Conflict(format!(
                "recipe slug {} already exists",
                recipe.slug
            )));
        }
        state.check_tag_ids(&recipe.tag_ids)?;

        let now = Utc::now();
        let seq = state.next_seq();
        let stored = Stored {
            seq,
            entity: Recipe {
                id: Uuid::new_v4(),
                slug: recipe.slug,
                title: recipe.title,
                description: recipe.description,
                category: recipe.category,
                cuisine: recipe.cuisine,
                difficulty: recipe.difficulty,
                servings: recipe.servings,
                prep_time_minutes: recipe.prep_time_minutes,
                cook_time_minutes: recipe.cook_time_minutes,
                published: recipe.published,
                featured: recipe.featured,
                author_id: recipe.author_id,
                tags: Vec::new(),
                created_at: now,
                updated_at: now,
            },
            tag_ids: recipe.tag_ids,
        };
        let hydrated = state.recipe(&stored);
        state.recipes.push(stored);
        Ok(hydrated)
    }

    async fn list_posts(&self, query: &ListingQuery) -> Result<Page<BlogPost>, StoreError> {
        let state = self.read()?;
        let mut rows: Vec<(u64, BlogPost)> = state
            .posts
            .iter()
            .map(|stored| (stored.seq, state.post(stored)))
            .filter(|(_, post)| matches_all(&query.filters, post))
            .collect();
        sort_posts(&mut rows, query.sort);

        let posts = rows.into_iter().map(|(_, post)| post).collect();
        Ok(Page::from_sorted(posts, query.page))
    }

    async fn post_by_slug(
        &self,
        slug: &str,
        visibility: Visibility,
    ) -> Result<Option<BlogPost>, StoreError> {
        let state = self.read()?;
        Ok(state
            .posts
            .iter()
            .find(|p| p.entity.slug == slug)
            .filter(|p| {
                visibility == Visibility::Any || p.entity.status == PostStatus::Published
            })
            .map(|p| state.post(p)))
    }

    async fn insert_post(&self, post: NewBlogPost) -> Result<BlogPost, StoreError> {
        let mut state = self.write()?;
        if state.posts.iter().any(|p| p.entity.slug == post.slug) {
            return Err(StoreError::Conflict(format!(
                "post slug {} already exists",
                post.slug
            )));
        }
        state.check_tag_ids(&post.tag_ids)?;

        let now = Utc::now();
        let seq = state.next_seq();
        let published_at = (post.status == PostStatus::Published).then_some(now);
        let stored = Stored {
            seq,
            entity: BlogPost {
                id: Uuid::new_v4(),
                slug: post.slug,
                title: post.title,
                excerpt: post.excerpt,
                content: post.content,
                status: post.status,
                category: post.category,
                featured: post.featured,
                view_count: 0,
                author_id: post.author_id,
                tags: Vec::new(),
                published_at,
                created_at: now,
                updated_at: now,
            },
            tag_ids: post.tag_ids,
        };
        let hydrated = state.post(&stored);
        state.posts.push(stored);
        Ok(hydrated)
    }

    async fn publish_post(&self, id: Uuid, at: DateTime<Utc>) -> Result<BlogPost, StoreError> {
        let mut state = self.write()?;
        let stored = state
            .posts
            .iter_mut()
            .find(|p| p.entity.id == id)
            .ok_or(StoreError::NotFound)?;

        if stored.entity.status == PostStatus::Draft {
            stored.entity.status = PostStatus::Published;
            stored.entity.published_at = Some(at);
            stored.entity.updated_at = at;
        }
        let stored = stored.clone();
        Ok(state.post(&stored))
    }

    async fn record_post_view(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let stored = state
            .posts
            .iter_mut()
            .find(|p| p.entity.id == id)
            .ok_or(StoreError::NotFound)?;
        stored.entity.view_count += 1;
        Ok(())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        let state = self.read()?;
        let mut tags: Vec<Tag> = state.tags.values().map(|t| state.tag(t)).collect();
        tags.sort_by(|a, b| compare_titles(&a.name, &b.name));
        Ok(tags)
    }

    async fn tag_by_id(&self, id: Uuid) -> Result<Option<Tag>, StoreError> {
        let state = self.read()?;
        Ok(state.tags.get(&id).map(|t| state.tag(t)))
    }

    async fn tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, StoreError> {
        let state = self.read()?;
        Ok(state
            .tags
            .values()
            .find(|t| t.slug == slug)
            .map(|t| state.tag(t)))
    }

    async fn insert_tag(&self, tag: NewTag) -> Result<Tag, StoreError> {
        let mut state = self.write()?;
        if state.slug_owner(&tag.slug).is_some() {
            return Err(StoreError::Conflict(format!(
                "tag slug {} already exists",
                tag.slug
            )));
        }

        let stored = StoredTag {
            id: Uuid::new_v4(),
            name: tag.name,
            slug: tag.slug,
            color: tag.color,
            created_at: Utc::now(),
        };
        let created = state.tag(&stored);
        state.tags.insert(stored.id, stored);
        Ok(created)
    }

    async fn update_tag(&self, id: Uuid, changes: TagChanges) -> Result<Tag, StoreError> {
        let mut state = self.write()?;
        if let Some(ref slug) = changes.slug {
            if state.slug_owner(slug).is_some_and(|owner| owner != id) {
                return Err(StoreError::Conflict(format!(
                    "tag slug {} already exists",
                    slug
                )));
            }
        }

        let stored = state.tags.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(name) = changes.name {
            stored.name = name;
        }
        if let Some(slug) = changes.slug {
            stored.slug = slug;
        }
        if let Some(color) = changes.color {
            stored.color = color;
        }
        let stored = stored.clone();
        Ok(state.tag(&stored))
    }

    async fn delete_tag(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.tags.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        for recipe in state.recipes.iter_mut() {
            recipe.tag_ids.retain(|tag_id| *tag_id != id);
        }
        for post in state.posts.iter_mut() {
            post.tag_ids.retain(|tag_id| *tag_id != id);
        }
        Ok(())
    }

    async fn merge_tags(&self, source: Uuid, target: Uuid) -> Result<Tag, StoreError> {
        let mut state = self.write()?;
        if !state.tags.contains_key(&source) || !state.tags.contains_key(&target) {
            return Err(StoreError::NotFound);
        }

        for recipe in state.recipes.iter_mut() {
            reassign(&mut recipe.tag_ids, source, target);
        }
        for post in state.posts.iter_mut() {
            reassign(&mut post.tag_ids, source, target);
        }
        state.tags.remove(&source);

        let merged = state.tags.get(&target).ok_or(StoreError::NotFound)?;
        Ok(state.tag(merged))
    }
}
