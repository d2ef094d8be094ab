/**
 * Booking Routes
 * Consultation booking modal backend
 */
use axum::{extract::State, Json};
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;

use crate::error::{ApiError, UNEXPECTED_ERROR};
use crate::widgets::booking::{
    self, BookingConfirmation, BookingError, BookingForm, ConsultationType, CONSULTATION_TYPES,
    TIME_SLOTS,
};
use crate::AppState;

/// Response for GET /api/booking/options
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingOptions {
    pub consultation_types: &'static [ConsultationType],
    pub time_slots: &'static [&'static str],
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::InvalidTransition { .. } => {
                tracing::error!(error = %err, "booking state machine misuse");
                ApiError::Failed(UNEXPECTED_ERROR.to_string())
            }
            other => ApiError::Validation(other.to_string()),
        }
    }
}

/// GET /api/booking/options
pub async fn options() -> Json<BookingOptions> {
    Json(BookingOptions {
        consultation_types: CONSULTATION_TYPES,
        time_slots: TIME_SLOTS,
    })
}

/// POST /api/booking
/// Holds the request for the configured delay, then confirms with a meeting link
pub async fn submit(
    State(state): State<AppState>,
    Json(form): Json<BookingForm>,
) -> Result<Json<BookingConfirmation>, ApiError> {
    let mut rng = StdRng::from_rng(&mut rand::rng());
    let confirmation = booking::book(form, state.config.widgets.booking_delay, &mut rng).await?;

    tracing::info!(
        consultation_type = confirmation.consultation_type.value,
        preferred_date = %confirmation.preferred_date,
        "consultation booked"
    );
    Ok(Json(confirmation))
}
