/**
 * Form Routes
 * Contact form and newsletter subscription
 */
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;

use crate::db::models::{NewContactSubmission, NewSubscription, SubscriptionStatus};
use crate::db::StoreError;
use crate::error::{ApiError, FormSuccess};
use crate::routes::{optional, present};
use crate::AppState;

const CONTACT_FAILED: &str = "Failed to submit form. Please try again.";
const SUBSCRIBE_FAILED: &str = "Failed to subscribe. Please try again.";
const ALREADY_SUBSCRIBED: &str = "This email is already subscribed to our newsletter";
const NEWSLETTER_SOURCE: &str = "website";

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub project_type: Option<String>,
    #[serde(alias = "budgetRange")]
    pub budget: Option<String>,
    pub timeline: Option<String>,
}

impl ContactRequest {
    /// The submission to store, or `None` when a required field is blank.
    fn into_submission(self) -> Option<NewContactSubmission> {
        let name = present(&self.name)?.to_string();
        let email = present(&self.email)?.to_string();
        let subject = present(&self.subject)?.to_string();
        let message = present(&self.message)?.to_string();

        Some(NewContactSubmission {
            name,
            email,
            phone: optional(self.phone),
            company: optional(self.company),
            subject,
            message,
            project_type: optional(self.project_type),
            budget_range: optional(self.budget),
            timeline: optional(self.timeline),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NewsletterRequest {
    pub email: Option<String>,
    pub name: Option<String>,
}

fn normalized_email(email: &Option<String>) -> Option<String> {
    present(email).map(str::to_lowercase)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/contact
pub async fn submit_contact(
    State(state): State<AppState>,
    Json(payload): Json<ContactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let submission = payload
        .into_submission()
        .ok_or_else(|| ApiError::validation("Please fill in all required fields"))?;

    let contact = state.store.insert_contact(submission).await.map_err(|e| {
        tracing::error!(error = %e, "contact form error");
        ApiError::Failed(CONTACT_FAILED.to_string())
    })?;

    tracing::info!(contact_id = %contact.id, "contact submission received");
    Ok((
        StatusCode::CREATED,
        FormSuccess::new("Thank you for your message! We'll get back to you within 24 hours."),
    ))
}

/// POST /api/newsletter
/// Re-subscribing an unsubscribed address reactivates the same row
pub async fn subscribe(
    State(state): State<AppState>,
    Json(payload): Json<NewsletterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalized_email(&payload.email)
        .ok_or_else(|| ApiError::validation("Email address is required"))?;
    let name = optional(payload.name);

    let failed = |e: StoreError| {
        tracing::error!(error = %e, "newsletter subscription error");
        ApiError::Failed(SUBSCRIBE_FAILED.to_string())
    };

    match state.store.find_subscription(&email).await.map_err(failed)? {
        Some(existing) if existing.status == SubscriptionStatus::Active => {
            return Err(ApiError::Conflict(ALREADY_SUBSCRIBED.to_string()));
        }
        Some(existing) => {
            state
                .store
                .reactivate_subscription(existing.id, name)
                .await
                .map_err(failed)?;
            tracing::info!(subscription_id = %existing.id, "newsletter subscription reactivated");
        }
        None => {
            let subscription = state
                .store
                .insert_subscription(NewSubscription {
                    email,
                    name,
                    source: NEWSLETTER_SOURCE.to_string(),
                })
                .await
                .map_err(|e| match e {
                    StoreError::Duplicate(_) => ApiError::Conflict(ALREADY_SUBSCRIBED.to_string()),
                    other => failed(other),
                })?;
            tracing::info!(subscription_id = %subscription.id, "newsletter subscription created");
        }
    }

    Ok(FormSuccess::new("Successfully subscribed to our newsletter!"))
}

/// POST /api/newsletter/unsubscribe
pub async fn unsubscribe(
    State(state): State<AppState>,
    Json(payload): Json<NewsletterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalized_email(&payload.email)
        .ok_or_else(|| ApiError::validation("Email address is required"))?;

    let subscription = state
        .store
        .find_subscription(&email)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("This email is not subscribed to our newsletter".to_string())
        })?;

    if subscription.status == SubscriptionStatus::Active {
        state.store.unsubscribe(subscription.id).await?;
        tracing::info!(subscription_id = %subscription.id, "newsletter unsubscribed");
    }

    Ok(FormSuccess::new(
        "You have been unsubscribed from our newsletter.",
    ))
}
