//! Translation of [`FilterExpr`] and [`SortOrder`] into Diesel expressions.
//!
//! Every predicate is boxed so a listing can apply the same filters to both
//! the page query and the count query.

use diesel::dsl::{count_star, sql, AsSelect};
use diesel::expression::SqlLiteral;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Bool, Nullable, Text, Timestamptz};
use galley_core::{Field, FilterExpr, SortOrder, StoreError, Value};

use crate::models::{BlogPostRow, RecipeRow};
use crate::schema::{blog_post_tags, blog_posts, recipe_tags, recipes, tags};

diesel::define_sql_function!(fn lower(x: Text) -> Text);
diesel::define_sql_function!(fn coalesce(x: Nullable<Timestamptz>, y: Timestamptz) -> Timestamptz);

pub type RecipePredicate = Box<dyn BoxableExpression<recipes::table, Pg, SqlType = Bool>>;
pub type PostPredicate = Box<dyn BoxableExpression<blog_posts::table, Pg, SqlType = Bool>>;

pub type RecipePageQuery<'a> = recipes::BoxedQuery<'a, Pg, AsSelect<RecipeRow, Pg>>;
pub type PostPageQuery<'a> = blog_posts::BoxedQuery<'a, Pg, AsSelect<BlogPostRow, Pg>>;

/// ILIKE pattern matching `needle` anywhere, with wildcards in the needle
/// escaped.
pub fn contains_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn clamp_i32(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// prep + cook summed as bigint so legacy rows cannot overflow the addition.
fn total_time() -> SqlLiteral<BigInt> {
    sql::<BigInt>("(recipes.prep_time_minutes::bigint + recipes.cook_time_minutes::bigint)")
}

fn unsupported(expr: &FilterExpr, entity: &str) -> StoreError {
    StoreError::Unsupported(format!("{:?} on {}", expr, entity))
}

pub fn recipe_predicates(filters: &[FilterExpr]) -> Result<Vec<RecipePredicate>, StoreError> {
    let mut predicates = Vec::new();
    for expr in filters {
        push_recipe_predicates(expr, &mut predicates)?;
    }
    Ok(predicates)
}

/// A single expression may expand to several predicates (both range bounds,
/// one subquery per required tag); the query ANDs them all.
fn push_recipe_predicates(
    expr: &FilterExpr,
    out: &mut Vec<RecipePredicate>,
) -> Result<(), StoreError> {
    match expr {
        FilterExpr::Equals { field, value } => match (field, value) {
            (Field::Published, Value::Bool(flag)) => out.push(Box::new(recipes::published.eq(*flag))),
            (Field::Category, Value::Text(text)) => {
                out.push(Box::new(lower(recipes::category).eq(text.to_lowercase())))
            }
            (Field::Difficulty, Value::Text(text)) => {
                out.push(Box::new(lower(recipes::difficulty).eq(text.to_lowercase())))
            }
            _ => return Err(unsupported(expr, "recipes")),
        },
        FilterExpr::Range { field, min, max } => match field {
            Field::TotalTime => {
                if let Some(min) = min {
                    out.push(Box::new(total_time().ge(*min)));
                }
                if let Some(max) = max {
                    out.push(Box::new(total_time().le(*max)));
                }
            }
            Field::Servings => {
                if let Some(min) = min {
                    out.push(Box::new(recipes::servings.ge(clamp_i32(*min))));
                }
                if let Some(max) = max {
                    out.push(Box::new(recipes::servings.le(clamp_i32(*max))));
                }
            }
            _ => return Err(unsupported(expr, "recipes")),
        },
        FilterExpr::SubstringAnyOf { fields, needle } => {
            let pattern = contains_pattern(needle);
            let mut alternatives: Vec<RecipePredicate> = Vec::new();
            for field in fields {
                let predicate: RecipePredicate = match field {
                    Field::Title => Box::new(recipes::title.ilike(pattern.clone())),
                    Field::Description => Box::new(recipes::description.ilike(pattern.clone())),
                    Field::Category => Box::new(recipes::category.ilike(pattern.clone())),
                    _ => return Err(unsupported(expr, "recipes")),
                };
                alternatives.push(predicate);
            }
            let mut alternatives = alternatives.into_iter();
            let first = alternatives
                .next()
                .ok_or_else(|| unsupported(expr, "recipes"))?;
            out.push(alternatives.fold(first, |acc, next| Box::new(acc.or(next))));
        }
        FilterExpr::TagsAll(slugs) => {
            for slug in slugs {
                out.push(Box::new(
                    recipes::id.eq_any(
                        recipe_tags::table
                            .inner_join(tags::table)
                            .filter(tags::slug.eq(slug.clone()))
                            .select(recipe_tags::recipe_id),
                    ),
                ));
            }
        }
    }
    Ok(())
}

pub fn post_predicates(filters: &[FilterExpr]) -> Result<Vec<PostPredicate>, StoreError> {
    let mut predicates = Vec::new();
    for expr in filters {
        push_post_predicates(expr, &mut predicates)?;
    }
    Ok(predicates)
}

fn push_post_predicates(expr: &FilterExpr, out: &mut Vec<PostPredicate>) -> Result<(), StoreError> {
    match expr {
        FilterExpr::Equals { field, value } => match (field, value) {
            (Field::Status, Value::Text(text)) => out.push(Box::new(blog_posts::status.eq(text.clone()))),
            (Field::Category, Value::Text(text)) => {
                out.push(Box::new(lower(blog_posts::category).eq(text.to_lowercase())))
            }
            _ => return Err(unsupported(expr, "posts")),
        },
        FilterExpr::Range { .. } => return Err(unsupported(expr, "posts")),
        FilterExpr::SubstringAnyOf { fields, needle } => {
            let pattern = contains_pattern(needle);
            let mut alternatives: Vec<PostPredicate> = Vec::new();
            for field in fields {
                let predicate: PostPredicate = match field {
                    Field::Title => Box::new(blog_posts::title.ilike(pattern.clone())),
                    Field::Excerpt => Box::new(blog_posts::excerpt.ilike(pattern.clone())),
                    Field::Category => Box::new(blog_posts::category.ilike(pattern.clone())),
                    _ => return Err(unsupported(expr, "posts")),
                };
                alternatives.push(predicate);
            }
            let mut alternatives = alternatives.into_iter();
            let first = alternatives
                .next()
                .ok_or_else(|| unsupported(expr, "posts"))?;
            out.push(alternatives.fold(first, |acc, next| Box::new(acc.or(next))));
        }
        FilterExpr::TagsAll(slugs) => {
            for slug in slugs {
                out.push(Box::new(
                    blog_posts::id.eq_any(
                        blog_post_tags::table
                            .inner_join(tags::table)
                            .filter(tags::slug.eq(slug.clone()))
                            .select(blog_post_tags::blog_post_id),
                    ),
                ));
            }
        }
    }
    Ok(())
}

pub fn recipe_page_query<'a>(
    predicates: Vec<RecipePredicate>,
    sort: SortOrder,
) -> RecipePageQuery<'a> {
    let mut query = recipes::table.select(RecipeRow::as_select()).into_boxed();
    for predicate in predicates {
        query = query.filter(predicate);
    }

    match sort {
        SortOrder::Newest => query
            .order(recipes::created_at.desc())
            .then_order_by(recipes::id.desc()),
        SortOrder::Oldest => query
            .order(recipes::created_at.asc())
            .then_order_by(recipes::id.asc()),
        SortOrder::TitleAsc => query
            .order(lower(recipes::title).asc())
            .then_order_by(recipes::id.asc()),
        SortOrder::TitleDesc => query
            .order(lower(recipes::title).desc())
            .then_order_by(recipes::id.desc()),
        SortOrder::Popular => query
            .order(recipes::featured.desc())
            .then_order_by(recipes::created_at.desc())
            .then_order_by(recipes::id.desc()),
    }
}

pub fn recipe_count_query<'a>(
    predicates: Vec<RecipePredicate>,
) -> recipes::BoxedQuery<'a, Pg, diesel::sql_types::BigInt> {
    let mut query = recipes::table.select(count_star()).into_boxed();
    for predicate in predicates {
        query = query.filter(predicate);
    }
    query
}

pub fn post_page_query<'a>(predicates: Vec<PostPredicate>, sort: SortOrder) -> PostPageQuery<'a> {
    let mut query = blog_posts::table
        .select(BlogPostRow::as_select())
        .into_boxed();
    for predicate in predicates {
        query = query.filter(predicate);
    }

    let sort_date = || coalesce(blog_posts::published_at, blog_posts::created_at);
    match sort {
        SortOrder::Newest => query
            .order(sort_date().desc())
            .then_order_by(blog_posts::id.desc()),
        SortOrder::Oldest => query
            .order(sort_date().asc())
            .then_order_by(blog_posts::id.asc()),
        SortOrder::TitleAsc => query
            .order(lower(blog_posts::title).asc())
            .then_order_by(blog_posts::id.asc()),
        SortOrder::TitleDesc => query
            .order(lower(blog_posts::title).desc())
            .then_order_by(blog_posts::id.desc()),
        SortOrder::Popular => query
            .order(blog_posts::view_count.desc())
            .then_order_by(sort_date().desc())
            .then_order_by(blog_posts::id.desc()),
    }
}

pub fn post_count_query<'a>(
    predicates: Vec<PostPredicate>,
) -> blog_posts::BoxedQuery<'a, Pg, diesel::sql_types::BigInt> {
    let mut query = blog_posts::table.select(count_star()).into_boxed();
    for predicate in predicates {
        query = query.filter(predicate);
    }
    query
}
