//! End-to-end listing behaviour: raw parameters through the normalizer and
//! query builder into the in-memory store.

use galley_core::content::{create_post, create_recipe, publish_post, view_post};
use galley_core::query::{post_listing, recipe_listing};
use galley_core::{
    ContentError, ContentStore, MemoryContentStore, NewRecipe, PostCriteria, PostDraft,
    RawListingParams, RecipeCriteria, RecipeDraft, TagRegistry, Visibility,
};
use std::sync::Arc;
use uuid::Uuid;

struct Fixture {
    store: Arc<MemoryContentStore>,
    registry: TagRegistry,
    author: Uuid,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(MemoryContentStore::new());
        let registry = TagRegistry::new(store.clone());
        Self {
            store,
            registry,
            author: Uuid::new_v4(),
        }
    }

    async fn recipe(&self, draft: RecipeDraft) {
        create_recipe(self.store.as_ref(), &self.registry, draft, self.author)
            .await
            .unwrap();
    }

    async fn list(&self, params: RawListingParams) -> Vec<String> {
        let query = recipe_listing(&RecipeCriteria::from_raw(&params));
        self.store
            .list_recipes(&query)
            .await
            .unwrap()
            .items
            .into_iter()
            .map(|r| r.title)
            .collect()
    }
}

fn published(title: &str) -> RecipeDraft {
    RecipeDraft {
        title: title.to_string(),
        category: "dinner".to_string(),
        difficulty: "easy".to_string(),
        servings: 4,
        prep_time_minutes: 10,
        cook_time_minutes: 20,
        published: true,
        ..Default::default()
    }
}

fn params() -> RawListingParams {
    RawListingParams::default()
}

#[tokio::test]
async fn test_unpublished_recipes_never_listed() {
    let fx = Fixture::new();
    fx.recipe(RecipeDraft {
        tags: vec!["vegan".to_string()],
        ..published("Public Chili")
    })
    .await;
    fx.recipe(RecipeDraft {
        published: false,
        tags: vec!["vegan".to_string()],
        ..published("Secret Chili")
    })
    .await;

    let combos = vec![
        params(),
        RawListingParams {
            q: Some("chili".to_string()),
            ..params()
        },
        RawListingParams {
            tags: Some("vegan".to_string()),
            category: Some("dinner".to_string()),
            difficulty: Some("easy".to_string()),
            ..params()
        },
        RawListingParams {
            max_time: Some("60".to_string()),
            servings: Some("2".to_string()),
            sort: Some("title-desc".to_string()),
            ..params()
        },
    ];

    for combo in combos {
        let titles = fx.list(combo).await;
        assert_eq!(titles, vec!["Public Chili"]);
    }

    assert!(fx
        .store
        .recipe_by_slug("secret-chili", Visibility::Published)
        .await
        .unwrap()
        .is_none());
    assert!(fx
        .store
        .recipe_by_slug("secret-chili", Visibility::Any)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_tag_filter_requires_all_tags() {
    let fx = Fixture::new();
    fx.recipe(RecipeDraft {
        tags: vec!["Vegan".to_string(), "Quick".to_string()],
        ..published("Both")
    })
    .await;
    fx.recipe(RecipeDraft {
        tags: vec!["Vegan".to_string()],
        ..published("Only Vegan")
    })
    .await;

    let titles = fx
        .list(RawListingParams {
            tags: Some("vegan,quick".to_string()),
            ..params()
        })
        .await;
    assert_eq!(titles, vec!["Both"]);
}

#[tokio::test]
async fn test_pagination_past_the_end() {
    let fx = Fixture::new();
    for i in 0..25 {
        fx.recipe(published(&format!("Recipe {:02}", i))).await;
    }

    let criteria = RecipeCriteria::from_raw(&RawListingParams {
        page: Some("3".to_string()),
        ..params()
    });
    let page = fx
        .store
        .list_recipes(&recipe_listing(&criteria))
        .await
        .unwrap();
    assert_eq!(page.total, 25);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.items.len(), 1);

    let criteria = RecipeCriteria::from_raw(&RawListingParams {
        page: Some("4".to_string()),
        ..params()
    });
    let page = fx
        .store
        .list_recipes(&recipe_listing(&criteria))
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total_pages, 3);
}

#[tokio::test]
async fn test_text_search_matches_title_or_description() {
    let fx = Fixture::new();
    fx.recipe(published("Lemon Tart")).await;
    fx.recipe(RecipeDraft {
        description: "Bright with LEMON zest".to_string(),
        ..published("Poppy Seed Cake")
    })
    .await;
    fx.recipe(published("Beef Stew")).await;

    let mut titles = fx
        .list(RawListingParams {
            q: Some("lemon".to_string()),
            ..params()
        })
        .await;
    titles.sort();
    assert_eq!(titles, vec!["Lemon Tart", "Poppy Seed Cake"]);
}

#[tokio::test]
async fn test_time_and_servings_bounds() {
    let fx = Fixture::new();
    fx.recipe(RecipeDraft {
        prep_time_minutes: 5,
        cook_time_minutes: 10,
        servings: 2,
        ..published("Fast For Two")
    })
    .await;
    fx.recipe(RecipeDraft {
        prep_time_minutes: 30,
        cook_time_minutes: 90,
        servings: 8,
        ..published("Slow Feast")
    })
    .await;

    let titles = fx
        .list(RawListingParams {
            max_time: Some("15".to_string()),
            ..params()
        })
        .await;
    assert_eq!(titles, vec!["Fast For Two"]);

    let titles = fx
        .list(RawListingParams {
            servings: Some("6".to_string()),
            ..params()
        })
        .await;
    assert_eq!(titles, vec!["Slow Feast"]);

    // Garbage numbers mean "no bound"
    let titles = fx
        .list(RawListingParams {
            max_time: Some("quick".to_string()),
            servings: Some("lots".to_string()),
            ..params()
        })
        .await;
    assert_eq!(titles.len(), 2);
}

#[tokio::test]
async fn test_absurd_times_are_rejected() {
    let fx = Fixture::new();
    let err = create_recipe(
        fx.store.as_ref(),
        &fx.registry,
        RecipeDraft {
            prep_time_minutes: i32::MAX,
            cook_time_minutes: 1,
            ..published("Forever Stew")
        },
        fx.author,
    )
    .await
    .unwrap_err();

    match err {
        ContentError::Validation(e) => assert_eq!(e.field, "prep_time_minutes"),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_max_time_filter_survives_huge_stored_times() {
    let fx = Fixture::new();
    fx.recipe(published("Toast")).await;
    // Rows written before validation existed bypass the cap
    fx.store
        .insert_recipe(NewRecipe {
            slug: "forever-stew".to_string(),
            title: "Forever Stew".to_string(),
            description: String::new(),
            category: "dinner".to_string(),
            cuisine: None,
            difficulty: "hard".to_string(),
            servings: 4,
            prep_time_minutes: i32::MAX,
            cook_time_minutes: 1,
            published: true,
            featured: false,
            author_id: fx.author,
            tag_ids: Vec::new(),
        })
        .await
        .unwrap();

    let titles = fx
        .list(RawListingParams {
            max_time: Some("30".to_string()),
            ..params()
        })
        .await;
    assert_eq!(titles, vec!["Toast"]);
}

#[tokio::test]
async fn test_sort_orders() {
    let fx = Fixture::new();
    fx.recipe(published("banana bread")).await;
    fx.recipe(RecipeDraft {
        featured: true,
        ..published("Apple Pie")
    })
    .await;
    fx.recipe(published("Carrot Cake")).await;

    let sorted = |sort: &str| RawListingParams {
        sort: Some(sort.to_string()),
        ..params()
    };

    assert_eq!(
        fx.list(sorted("title-asc")).await,
        vec!["Apple Pie", "banana bread", "Carrot Cake"]
    );
    assert_eq!(
        fx.list(sorted("title-desc")).await,
        vec!["Carrot Cake", "banana bread", "Apple Pie"]
    );
    assert_eq!(
        fx.list(sorted("newest")).await,
        vec!["Carrot Cake", "Apple Pie", "banana bread"]
    );
    assert_eq!(
        fx.list(sorted("oldest")).await,
        vec!["banana bread", "Apple Pie", "Carrot Cake"]
    );
    assert_eq!(fx.list(sorted("popular")).await[0], "Apple Pie");
    assert_eq!(fx.list(sorted("bogus")).await, fx.list(sorted("newest")).await);
}

#[tokio::test]
async fn test_duplicate_titles_get_suffixed_slugs() {
    let fx = Fixture::new();
    fx.recipe(published("Pancakes")).await;
    fx.recipe(published("Pancakes")).await;

    assert!(fx
        .store
        .recipe_by_slug("pancakes-2", Visibility::Published)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_blog_drafts_hidden_until_published() {
    let fx = Fixture::new();
    let draft = create_post(
        fx.store.as_ref(),
        &fx.registry,
        PostDraft {
            title: "Hello Axum".to_string(),
            excerpt: "First steps".to_string(),
            ..Default::default()
        },
        fx.author,
    )
    .await
    .unwrap();

    let listing = post_listing(&PostCriteria::default());
    assert!(fx.store.list_posts(&listing).await.unwrap().items.is_empty());
    assert!(view_post(fx.store.as_ref(), "hello-axum")
        .await
        .unwrap()
        .is_none());

    publish_post(fx.store.as_ref(), draft.id).await.unwrap();
    let page = fx.store.list_posts(&listing).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert!(page.items[0].published_at.is_some());

    // Publishing again is a no-op
    let again = publish_post(fx.store.as_ref(), draft.id).await.unwrap();
    assert_eq!(again.published_at, page.items[0].published_at);
}

#[tokio::test]
async fn test_post_views_and_popular_sort() {
    let fx = Fixture::new();
    for title in ["Quiet Post", "Busy Post"] {
        create_post(
            fx.store.as_ref(),
            &fx.registry,
            PostDraft {
                title: title.to_string(),
                publish: true,
                ..Default::default()
            },
            fx.author,
        )
        .await
        .unwrap();
    }

    for expected in 1..=3 {
        let post = view_post(fx.store.as_ref(), "busy-post")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(post.view_count, expected);
    }

    let popular = post_listing(&PostCriteria::from_raw(&RawListingParams {
        sort: Some("popular".to_string()),
        ..params()
    }));
    let titles: Vec<String> = fx
        .store
        .list_posts(&popular)
        .await
        .unwrap()
        .items
        .into_iter()
        .map(|p| p.title)
        .collect();
    assert_eq!(titles, vec!["Busy Post", "Quiet Post"]);
}
