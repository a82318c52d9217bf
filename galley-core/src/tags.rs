//! Tag registry: validation, slug derivation and the write operations the
//! back-office exposes.

use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::error::{StoreError, ValidationError};
use crate::slug::slugify;
use crate::store::ContentStore;
use crate::types::{NewTag, Tag, TagChanges};

pub const MAX_TAG_NAME_LEN: usize = 50;
pub const DEFAULT_TAG_COLOR: &str = "#6b7280";

#[derive(Error, Debug)]
pub enum TagError {
    #[error("Invalid tag: {0}")]
    Validation(#[from] ValidationError),

    #[error("Tag not found")]
    NotFound,

    #[error("Tag storage failed: {0}")]
    Store(StoreError),
}

impl From<StoreError> for TagError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => TagError::NotFound,
            other => TagError::Store(other),
        }
    }
}

/// Trim and length-check a tag name, returning it with its slug.
pub fn validate_name(raw: &str) -> Result<(String, String), ValidationError> {
    let name = raw.trim();
    let len = name.chars().count();
    if len == 0 {
        return Err(ValidationError::new("name", "Tag name cannot be empty"));
    }
    if len > MAX_TAG_NAME_LEN {
        return Err(ValidationError::new(
            "name",
            format!("Tag name must be at most {} characters", MAX_TAG_NAME_LEN),
        ));
    }

    let slug = slugify(name);
    if slug.is_empty() {
        return Err(ValidationError::new(
            "name",
            "Tag name must contain at least one letter or digit",
        ));
    }
    Ok((name.to_string(), slug))
}

/// Accept `#RRGGBB` or `RRGGBB` and normalize to lowercase `#rrggbb`.
/// Missing or blank input yields the default color.
pub fn normalize_color(raw: Option<&str>) -> Result<String, ValidationError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(DEFAULT_TAG_COLOR.to_string());
    };

    let hex = raw.strip_prefix('#').unwrap_or(raw);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::new(
            "color",
            "Color must be a 6-digit hex code like #1a2b3c",
        ));
    }
    Ok(format!("#{}", hex.to_ascii_lowercase()))
}

pub struct TagRegistry {
    store: Arc<dyn ContentStore>,
}

impl TagRegistry {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Tag>, TagError> {
        Ok(self.store.list_tags().await?)
    }

    /// Create a new tag. A name whose slug already exists is rejected.
    pub async fn create(&self, name: &str, color: Option<&str>) -> Result<Tag, TagError> {
        let (name, slug) = validate_name(name)?;
        let color = normalize_color(color)?;

        match self.store.insert_tag(NewTag { name, slug, color }).await {
            Ok(tag) => {
                tracing::info!(tag_id = %tag.id, slug = %tag.slug, "tag created");
                Ok(tag)
            }
            Err(StoreError::Conflict(_)) => Err(duplicate_name().into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Return the tag with `name`'s slug, creating it with the default color
    /// if none exists.
    pub async fn find_or_create(&self, name: &str) -> Result<Tag, TagError> {
        let (name, slug) = validate_name(name)?;

        if let Some(existing) = self.store.tag_by_slug(&slug).await? {
            return Ok(existing);
        }

        let new_tag = NewTag {
            name,
            slug: slug.clone(),
            color: DEFAULT_TAG_COLOR.to_string(),
        };
        match self.store.insert_tag(new_tag).await {
            Ok(tag) => {
                tracing::info!(tag_id = %tag.id, slug = %tag.slug, "tag created");
                Ok(tag)
            }
            // Lost a race with a concurrent insert of the same slug
            Err(StoreError::Conflict(_)) => self
                .store
                .tag_by_slug(&slug)
                .await?
                .ok_or(TagError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// One tag per distinct slug among `names`, in first-seen order. Every
    /// name is validated before anything is written.
    pub async fn bulk_create<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Tag>, TagError> {
        let mut seen: Vec<String> = Vec::new();
        let mut unique: Vec<&str> = Vec::new();
        for raw in names {
            let (_, slug) = validate_name(raw.as_ref())?;
            if !seen.contains(&slug) {
                seen.push(slug);
                unique.push(raw.as_ref());
            }
        }

        let mut tags = Vec::with_capacity(unique.len());
        for name in unique {
            tags.push(self.find_or_create(name).await?);
        }
        Ok(tags)
    }

    pub async fn update(
        &self,
        id: Uuid,
        name: Option<&str>,
        color: Option<&str>,
    ) -> Result<Tag, TagError> {
        let mut changes = TagChanges::default();
        if let Some(name) = name {
            let (name, slug) = validate_name(name)?;
            changes.name = Some(name);
            changes.slug = Some(slug);
        }
        if let Some(color) = color.filter(|c| !c.trim().is_empty()) {
            changes.color = Some(normalize_color(Some(color))?);
        }

        match self.store.update_tag(id, changes).await {
            Ok(tag) => {
                tracing::info!(tag_id = %tag.id, slug = %tag.slug, "tag updated");
                Ok(tag)
            }
            Err(StoreError::Conflict(_)) => Err(duplicate_name().into()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), TagError> {
        self.store.delete_tag(id).await?;
        tracing::info!(tag_id = %id, "tag deleted");
        Ok(())
    }

    /// Fold `source` into `target`. Every reference moves over and `source`
    /// is deleted; readers never observe a partial merge.
    pub async fn merge(&self, source: Uuid, target: Uuid) -> Result<Tag, TagError> {
        if source == target {
            return Err(ValidationError::new("target_id", "Cannot merge a tag into itself").into());
        }

        let merged = self.store.merge_tags(source, target).await?;
        tracing::info!(
            source_id = %source,
            target_id = %target,
            usage_count = merged.usage_count,
            "tags merged"
        );
        Ok(merged)
    }
}

fn duplicate_name() -> ValidationError {
    ValidationError::new("name", "A tag with that name already exists")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name_bounds() {
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(50)).is_ok());
        let err = validate_name(&"x".repeat(51)).unwrap_err();
        assert_eq!(err.field, "name");
    }

    #[test]
    fn test_validate_name_needs_slug() {
        assert!(validate_name("???").is_err());
        assert_eq!(
            validate_name("  Web Development ").unwrap(),
            ("Web Development".to_string(), "web-development".to_string())
        );
    }

    #[test]
    fn test_normalize_color() {
        assert_eq!(normalize_color(None).unwrap(), DEFAULT_TAG_COLOR);
        assert_eq!(normalize_color(Some("")).unwrap(), DEFAULT_TAG_COLOR);
        assert_eq!(normalize_color(Some("#A1B2C3")).unwrap(), "#a1b2c3");
        assert_eq!(normalize_color(Some("ff0000")).unwrap(), "#ff0000");
    }

    #[test]
    fn test_normalize_color_rejects_bad_input() {
        for bad in ["#fff", "#12345g", "red", "#1234567"] {
            let err = normalize_color(Some(bad)).unwrap_err();
            assert_eq!(err.field, "color", "{bad} should be rejected");
        }
    }
}
