/**
 * Admin Routes
 * Role-gated CRUD over projects, posts, users, contacts and categories
 */
use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{
    BlogPost, BlogPostChanges, Category, ContactStatus, ContactSubmission, DashboardCounts,
    NewBlogPost, NewCategory, NewProject, PostCard, Project, ProjectCard, ProjectUpdate,
    PublishStatus, Role, User, UserAccessUpdate,
};
use crate::error::ApiError;
use crate::listing::Relations;
use crate::routes::{auth::current_user, optional, present, validate_slug};
use crate::AppState;

const RECENT_LIMIT: usize = 5;
const WORDS_PER_MINUTE: usize = 200;

lazy_static::lazy_static! {
    static ref TAG_REGEX: Regex = Regex::new(r"<[^>]*>").unwrap();
}

// ============================================================================
// Gate
// ============================================================================

/// Lets staff through with their `User` in the request extensions.
/// Visitors without a session go to the login page, everyone else home.
pub async fn require_staff(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match current_user(&state, request.headers()).await {
        Ok(Some(user)) if user.role.is_staff() => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(Some(user)) => {
            tracing::warn!(user_id = %user.id, role = %user.role, "admin access denied");
            Redirect::to("/").into_response()
        }
        Ok(None) => Redirect::to("/auth/login").into_response(),
        Err(e) => e.into_response(),
    }
}

// ============================================================================
// Content helpers
// ============================================================================

/// Strips scripts, event handlers and other unsafe markup.
fn sanitize_html(html: &str) -> String {
    ammonia::clean(html)
}

/// Minutes to read `html` at 200 words per minute, never less than one.
pub fn reading_time(html: &str) -> i32 {
    let text = TAG_REGEX.replace_all(html, " ");
    let words = text.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as i32
}

/// Publishing without a date publishes now.
fn publish_date(
    status: PublishStatus,
    requested: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    match (status, requested) {
        (PublishStatus::Published, None) => Some(Utc::now()),
        (_, requested) => requested,
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub viewer: User,
    pub counts: DashboardCounts,
    pub recent_projects: Vec<Project>,
    pub recent_posts: Vec<BlogPost>,
    pub recent_contacts: Vec<ContactSubmission>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub featured_image: Option<String>,
    pub status: Option<PublishStatus>,
    pub published_at: Option<DateTime<Utc>>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ContactStatusUpdate {
    pub status: ContactStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/admin
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(viewer): Extension<User>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let counts = state.store.dashboard_counts().await?;
    let mut recent_projects = state.store.list_projects(false).await?;
    let mut recent_posts = state.store.list_posts().await?;
    let mut recent_contacts = state.store.list_contacts().await?;
    recent_projects.truncate(RECENT_LIMIT);
    recent_posts.truncate(RECENT_LIMIT);
    recent_contacts.truncate(RECENT_LIMIT);

    Ok(Json(DashboardResponse {
        viewer,
        counts,
        recent_projects,
        recent_posts,
        recent_contacts,
    }))
}

/// GET /api/admin/projects
pub async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProjectCard>>, ApiError> {
    let projects = state.store.list_projects(false).await?;
    let relations = Relations::for_projects(state.store.as_ref(), &projects).await?;
    Ok(Json(relations.project_cards(projects)))
}

/// POST /api/admin/projects
pub async fn create_project(
    State(state): State<AppState>,
    Json(mut payload): Json<NewProject>,
) -> Result<impl IntoResponse, ApiError> {
    payload.title = payload.title.trim().to_string();
    if payload.title.is_empty() {
        return Err(ApiError::validation("Title is required"));
    }
    validate_slug(&payload.slug)?;
    payload.description = payload.description.as_deref().map(sanitize_html);
    payload.content = payload.content.as_deref().map(sanitize_html);

    let project = state.store.insert_project(payload).await?;
    tracing::info!(slug = %project.slug, "project created");
    Ok((StatusCode::CREATED, Json(project)))
}

/// PATCH /api/admin/projects/{slug}
pub async fn update_project(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(mut update): Json<ProjectUpdate>,
) -> Result<Json<Project>, ApiError> {
    validate_slug(&slug)?;
    if update.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::validation("Title is required"));
    }
    update.description = update.description.as_deref().map(sanitize_html);
    update.content = update.content.as_deref().map(sanitize_html);

    let project = state
        .store
        .update_project(&slug, update)
        .await?
        .ok_or_else(ApiError::not_found)?;
    Ok(Json(project))
}

/// GET /api/admin/posts
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<PostCard>>, ApiError> {
    let posts = state.store.list_posts().await?;
    let relations = Relations::for_posts(state.store.as_ref(), &posts).await?;
    Ok(Json(relations.post_cards(posts)))
}

/// POST /api/admin/posts
pub async fn create_post(
    State(state): State<AppState>,
    Extension(author): Extension<User>,
    Json(payload): Json<PostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = present(&payload.title)
        .ok_or_else(|| ApiError::validation("Title is required"))?
        .to_string();
    let slug = present(&payload.slug)
        .ok_or_else(|| ApiError::validation("Slug is required"))?
        .to_string();
    validate_slug(&slug)?;

    let content = payload.content.as_deref().map(sanitize_html);
    let status = payload.status.unwrap_or_default();

    let post = state
        .store
        .insert_post(NewBlogPost {
            title,
            slug,
            excerpt: optional(payload.excerpt),
            reading_time: reading_time(content.as_deref().unwrap_or_default()),
            content,
            featured_image: optional(payload.featured_image),
            status,
            published_at: publish_date(status, payload.published_at),
            author_id: Some(author.id),
            category_id: payload.category_id,
        })
        .await?;

    tracing::info!(slug = %post.slug, author = %author.id, "blog post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// PATCH /api/admin/posts/{slug}
pub async fn update_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(payload): Json<PostRequest>,
) -> Result<Json<BlogPost>, ApiError> {
    validate_slug(&slug)?;

    let existing = state
        .store
        .get_post(&slug)
        .await?
        .ok_or_else(ApiError::not_found)?;

    let title = match payload.title {
        Some(title) if title.trim().is_empty() => {
            return Err(ApiError::validation("Title is required"))
        }
        Some(title) => title.trim().to_string(),
        None => existing.title,
    };
    let content = payload
        .content
        .as_deref()
        .map(sanitize_html)
        .or(existing.content);
    let status = payload.status.unwrap_or(existing.status);
    let published_at = publish_date(status, payload.published_at.or(existing.published_at));

    let changes = BlogPostChanges {
        title,
        excerpt: payload.excerpt.or(existing.excerpt),
        reading_time: reading_time(content.as_deref().unwrap_or_default()),
        content,
        featured_image: payload.featured_image.or(existing.featured_image),
        status,
        published_at,
        category_id: payload.category_id.or(existing.category_id),
    };

    let post = state
        .store
        .update_post(&slug, changes)
        .await?
        .ok_or_else(ApiError::not_found)?;
    Ok(Json(post))
}

/// DELETE /api/admin/posts/{slug}
pub async fn delete_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    validate_slug(&slug)?;
    if !state.store.delete_post(&slug).await? {
        return Err(ApiError::not_found());
    }
    tracing::info!(slug = %slug, "blog post deleted");
    Ok(Json(DeleteResponse { success: true }))
}

/// GET /api/admin/users
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.store.list_users().await?))
}

/// PATCH /api/admin/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(id): Path<Uuid>,
    Json(update): Json<UserAccessUpdate>,
) -> Result<Json<User>, ApiError> {
    if !actor.role.can_manage_users() {
        return Err(ApiError::Forbidden("Insufficient permissions".to_string()));
    }
    // super admins are only made (or unmade) by super admins
    let touches_super_admin = update.role == Some(Role::SuperAdmin)
        || state
            .store
            .get_user(id)
            .await?
            .is_some_and(|target| target.role == Role::SuperAdmin);
    if touches_super_admin && actor.role != Role::SuperAdmin {
        return Err(ApiError::Forbidden("Insufficient permissions".to_string()));
    }

    let user = state
        .store
        .update_user_access(id, update)
        .await?
        .ok_or_else(ApiError::not_found)?;

    tracing::info!(
        actor = %actor.id,
        user_id = %user.id,
        role = %user.role,
        active = user.is_active,
        "user access updated"
    );
    Ok(Json(user))
}

/// GET /api/admin/contacts
pub async fn list_contacts(
    State(state): State<AppState>,
) -> Result<Json<Vec<ContactSubmission>>, ApiError> {
    Ok(Json(state.store.list_contacts().await?))
}

/// PATCH /api/admin/contacts/{id}
pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<ContactStatusUpdate>,
) -> Result<Json<ContactSubmission>, ApiError> {
    let contact = state
        .store
        .update_contact_status(id, update.status)
        .await?
        .ok_or_else(ApiError::not_found)?;
    Ok(Json(contact))
}

/// POST /api/admin/categories
pub async fn create_category(
    State(state): State<AppState>,
    Json(mut payload): Json<NewCategory>,
) -> Result<impl IntoResponse, ApiError> {
    payload.name = payload.name.trim().to_string();
    if payload.name.is_empty() {
        return Err(ApiError::validation("Name is required"));
    }
    validate_slug(&payload.slug)?;
    payload.color = optional(payload.color);

    let category: Category = state.store.insert_category(payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}
