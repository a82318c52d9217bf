//! Raw SQL fragments that can't be expressed in Diesel's type-safe DSL.
//!
//! # Safety
//!
//! All SQL in this module has been reviewed for SQL injection safety:
//! - User input is ALWAYS passed via `.bind()` parameters
//! - No string concatenation or interpolation with user data

/// Recompute the denormalized `usage_count` for a set of tags.
///
/// Only published recipes and posts count. Bind the tag ids as `$1`
/// (`Array<Uuid>`).
///
/// # Why raw SQL?
/// Diesel can't express an UPDATE whose SET value sums two correlated
/// subqueries.
pub const RECOMPUTE_USAGE_SQL: &str = "UPDATE tags SET usage_count = \
    (SELECT COUNT(*) FROM recipe_tags rt \
        JOIN recipes r ON r.id = rt.recipe_id \
        WHERE rt.tag_id = tags.id AND r.published) + \
    (SELECT COUNT(*) FROM blog_post_tags bt \
        JOIN blog_posts p ON p.id = bt.blog_post_id \
        WHERE bt.tag_id = tags.id AND p.status = 'published') \
    WHERE tags.id = ANY($1)";

/// Drop recipe references to the source tag (`$1`) where the recipe already
/// references the target (`$2`), so the reassignment below can't produce a
/// duplicate key.
///
/// # Why raw SQL?
/// Self-referencing subquery on the join table.
pub const DROP_REDUNDANT_RECIPE_TAGS_SQL: &str = "DELETE FROM recipe_tags \
    WHERE tag_id = $1 \
    AND recipe_id IN (SELECT recipe_id FROM recipe_tags WHERE tag_id = $2)";

/// Post counterpart of [`DROP_REDUNDANT_RECIPE_TAGS_SQL`].
pub const DROP_REDUNDANT_POST_TAGS_SQL: &str = "DELETE FROM blog_post_tags \
    WHERE tag_id = $1 \
    AND blog_post_id IN (SELECT blog_post_id FROM blog_post_tags WHERE tag_id = $2)";
