/**
 * Portfolio Routes
 * Public project grid and category list
 */
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::models::{Category, ProjectCard, PublishStatus};
use crate::error::ApiError;
use crate::listing::{ListingFilter, Relations, EMPTY_PROJECTS_MESSAGE};
use crate::routes::validate_slug;
use crate::AppState;

// ============================================================================
// Response Types
// ============================================================================

/// Response for GET /api/portfolio
#[derive(Debug, Serialize, Deserialize)]
pub struct PortfolioResponse {
    pub projects: Vec<ProjectCard>,
    pub categories: Vec<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/portfolio?search=...&category=...
/// Published projects, featured first, narrowed by the filter
pub async fn list_projects(
    State(state): State<AppState>,
    Query(filter): Query<ListingFilter>,
) -> Result<Json<PortfolioResponse>, ApiError> {
    let projects = filter.apply(state.store.list_projects(true).await?);
    let categories = state.store.list_active_categories().await?;
    let projects = Relations::for_projects(state.store.as_ref(), &projects)
        .await?
        .project_cards(projects);

    tracing::debug!(count = projects.len(), filtered = !filter.is_empty(), "portfolio listed");

    let message = projects
        .is_empty()
        .then(|| EMPTY_PROJECTS_MESSAGE.to_string());
    Ok(Json(PortfolioResponse {
        projects,
        categories,
        message,
    }))
}

/// GET /api/portfolio/{slug}
/// Counts a view on every successful read
pub async fn get_project(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProjectCard>, ApiError> {
    validate_slug(&slug)?;

    let mut project = match state.store.get_project(&slug).await? {
        Some(project) if project.status == PublishStatus::Published => project,
        _ => return Err(ApiError::not_found()),
    };

    match state.store.record_project_view(project.id).await {
        Ok(()) => project.view_count += 1,
        Err(e) => tracing::warn!(slug = %slug, error = %e, "failed to record project view"),
    }

    let relations =
        Relations::for_projects(state.store.as_ref(), std::slice::from_ref(&project)).await?;
    Ok(Json(relations.project_card(project)))
}

/// GET /api/categories
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.store.list_active_categories().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_app;
    use crate::db::models::{CategorySummary, NewCategory, NewProject};
    use chrono::NaiveDate;
    use serde_json::Value;
    use crate::test_support::{body_json, send, test_state};
    use axum::{body::Body, http::Request, http::StatusCode};

    fn project(title: &str, slug: &str, category: Option<uuid::Uuid>) -> NewProject {
        NewProject {
            title: title.to_string(),
            slug: slug.to_string(),
            category_id: category,
            status: Some(PublishStatus::Published),
            ..NewProject::default()
        }
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_listing_filters_and_reports_empty() {
        let state = test_state();
        let retail = state
            .store
            .insert_category(NewCategory {
                name: "Retail".into(),
                slug: "retail".into(),
                color: None,
            })
            .await
            .unwrap();
        state
            .store
            .insert_project(project("Store Analytics", "store-analytics", Some(retail.id)))
            .await
            .unwrap();
        state
            .store
            .insert_project(project("Fleet Routing", "fleet-routing", None))
            .await
            .unwrap();
        let mut draft = project("Secret Draft", "secret-draft", None);
        draft.status = Some(PublishStatus::Draft);
        state.store.insert_project(draft).await.unwrap();
        let app = create_app(state);

        let body: PortfolioResponse = body_json(send(&app, get("/api/portfolio")).await).await;
        assert_eq!(body.projects.len(), 2);
        assert_eq!(body.categories.len(), 1);
        assert!(body.message.is_none());

        let uri = format!("/api/portfolio?category={}", retail.id);
        let body: PortfolioResponse = body_json(send(&app, get(&uri)).await).await;
        assert_eq!(body.projects.len(), 1);
        assert_eq!(body.projects[0].project.slug, "store-analytics");
        assert_eq!(
            body.projects[0].category,
            Some(CategorySummary {
                name: "Retail".into(),
                color: "#3b82f6".into()
            })
        );

        let body: PortfolioResponse =
            body_json(send(&app, get("/api/portfolio?search=FLEET&category=all")).await).await;
        assert_eq!(body.projects.len(), 1);

        let body: PortfolioResponse =
            body_json(send(&app, get("/api/portfolio?search=nothing-like-this")).await).await;
        assert!(body.projects.is_empty());
        assert_eq!(body.message.as_deref(), Some(EMPTY_PROJECTS_MESSAGE));
    }

    #[tokio::test]
    async fn test_drafts_are_not_found() {
        let state = test_state();
        let mut draft = project("Secret Draft", "secret-draft", None);
        draft.status = Some(PublishStatus::Draft);
        state.store.insert_project(draft).await.unwrap();
        let app = create_app(state);

        let res = send(&app, get("/api/portfolio/secret-draft")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = send(&app, get("/api/portfolio/Not_A_Slug")).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_project_page_shows_details_and_counts_views() {
        let state = test_state();
        let web = state
            .store
            .insert_category(NewCategory {
                name: "E-commerce".into(),
                slug: "e-commerce".into(),
                color: Some("#F59E0B".into()),
            })
            .await
            .unwrap();
        state
            .store
            .insert_project(NewProject {
                title: "Storefront Redesign".into(),
                slug: "storefront-redesign".into(),
                description: Some("<p>Modern checkout</p>".into()),
                featured_image: Some("/storefront.png".into()),
                gallery: vec!["/storefront-home.png".into(), "/storefront-cart.png".into()],
                technologies: vec!["Next.js".into(), "Stripe".into()],
                project_url: Some("https://storefront.example".into()),
                completion_date: NaiveDate::from_ymd_opt(2024, 1, 15),
                category_id: Some(web.id),
                status: Some(PublishStatus::Published),
                ..NewProject::default()
            })
            .await
            .unwrap();
        let app = create_app(state.clone());

        let body: Value =
            body_json(send(&app, get("/api/portfolio/storefront-redesign")).await).await;
        assert_eq!(body["viewCount"], 1);
        assert_eq!(body["description"], "<p>Modern checkout</p>");
        assert_eq!(body["featuredImage"], "/storefront.png");
        assert_eq!(body["gallery"].as_array().unwrap().len(), 2);
        assert_eq!(body["technologies"][1], "Stripe");
        assert_eq!(body["projectUrl"], "https://storefront.example");
        assert_eq!(body["completionDate"], "2024-01-15");
        assert_eq!(body["category"]["name"], "E-commerce");
        assert_eq!(body["category"]["color"], "#F59E0B");

        let card: ProjectCard =
            body_json(send(&app, get("/api/portfolio/storefront-redesign")).await).await;
        assert_eq!(card.project.view_count, 2);

        let stored = state
            .store
            .get_project("storefront-redesign")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.view_count, 2);
    }
}
