/**
 * Blog Routes
 * Public listing and reading of published posts
 */
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::models::{BlogPost, Category, PostCard};
use crate::error::ApiError;
use crate::listing::{ListingFilter, Relations, EMPTY_POSTS_MESSAGE};
use crate::routes::validate_slug;
use crate::AppState;

// ============================================================================
// Response Types
// ============================================================================

/// Response for GET /api/blog
#[derive(Debug, Serialize, Deserialize)]
pub struct BlogListResponse {
    /// Lead article, only on the unfiltered listing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<PostCard>,
    pub posts: Vec<PostCard>,
    pub categories: Vec<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/blog?search=...&category=...
pub async fn list_posts(
    State(state): State<AppState>,
    Query(filter): Query<ListingFilter>,
) -> Result<Json<BlogListResponse>, ApiError> {
    let posts = filter.apply(state.store.list_live_posts(Utc::now()).await?);
    let categories = state.store.list_active_categories().await?;
    let posts = Relations::for_posts(state.store.as_ref(), &posts)
        .await?
        .post_cards(posts);

    let featured = if filter.is_empty() {
        posts.first().cloned()
    } else {
        None
    };
    let message = posts.is_empty().then(|| EMPTY_POSTS_MESSAGE.to_string());

    Ok(Json(BlogListResponse {
        featured,
        posts,
        categories,
        message,
    }))
}

/// GET /api/blog/{slug}
/// Counts a view on every successful read
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BlogPost>, ApiError> {
    validate_slug(&slug)?;

    let mut post = match state.store.get_post(&slug).await? {
        Some(post) if post.is_live(Utc::now()) => post,
        _ => return Err(ApiError::not_found()),
    };

    match state.store.record_post_view(post.id).await {
        Ok(()) => post.view_count += 1,
        Err(e) => tracing::warn!(slug = %slug, error = %e, "failed to record post view"),
    }

    Ok(Json(post))
}
