//! Consultation booking widget.
//!
//! A linear wizard: the visitor fills the form (`Collecting`), submits it
//! (`Submitting`), and gets a confirmation with a meeting link (`Success`).
//! Nothing is scheduled anywhere; the link is a random placeholder.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const MEETING_BASE_URL: &str = "https://meet.google.com/";
const MEETING_ID_LEN: usize = 13;
const MEETING_ID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConsultationType {
    pub value: &'static str,
    pub label: &'static str,
}

pub const CONSULTATION_TYPES: &[ConsultationType] = &[
    ConsultationType { value: "ai-strategy", label: "AI Strategy Consultation" },
    ConsultationType { value: "ml-implementation", label: "ML Implementation" },
    ConsultationType { value: "digital-transformation", label: "Digital Transformation" },
    ConsultationType { value: "cloud-architecture", label: "Cloud Architecture" },
    ConsultationType { value: "data-analytics", label: "Data Analytics" },
    ConsultationType { value: "custom-solution", label: "Custom AI Solution" },
];

pub const TIME_SLOTS: &[&str] = &[
    "09:00 AM", "10:00 AM", "11:00 AM", "12:00 PM", "01:00 PM", "02:00 PM", "03:00 PM",
    "04:00 PM", "05:00 PM",
];

pub fn consultation_type(value: &str) -> Option<ConsultationType> {
    CONSULTATION_TYPES.iter().copied().find(|t| t.value == value)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BookingError {
    #[error("Please fill in all required fields")]
    MissingFields(Vec<&'static str>),
    #[error("Unknown consultation type '{0}'")]
    UnknownConsultationType(String),
    #[error("cannot {action} a booking that is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
}

/// Booking form as the modal collects it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub consultation_type: String,
    pub preferred_date: String,
    pub preferred_time: String,
    pub message: String,
}

impl BookingForm {
    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("email", &self.email),
            ("consultationType", &self.consultation_type),
            ("preferredDate", &self.preferred_date),
            ("preferredTime", &self.preferred_time),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }
}

/// What the success screen shows. Date, time and type are echoed unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub name: String,
    pub email: String,
    pub preferred_date: String,
    pub preferred_time: String,
    pub consultation_type: ConsultationType,
    pub meeting_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingState {
    Collecting(BookingForm),
    Submitting {
        form: BookingForm,
        consultation_type: ConsultationType,
    },
    Success(BookingConfirmation),
}

impl Default for BookingState {
    fn default() -> Self {
        BookingState::Collecting(BookingForm::default())
    }
}

impl BookingState {
    pub fn name(&self) -> &'static str {
        match self {
            BookingState::Collecting(_) => "collecting",
            BookingState::Submitting { .. } => "submitting",
            BookingState::Success(_) => "success",
        }
    }

    fn invalid(&self, action: &'static str) -> BookingError {
        BookingError::InvalidTransition {
            action,
            state: self.name(),
        }
    }

    /// Replaces the form contents; only while collecting.
    pub fn fill(&mut self, form: BookingForm) -> Result<(), BookingError> {
        match self {
            BookingState::Collecting(current) => {
                *current = form;
                Ok(())
            }
            other => Err(other.invalid("edit")),
        }
    }

    /// `Collecting -> Submitting` once every required field is present.
    pub fn submit(&mut self) -> Result<(), BookingError> {
        let form = match &mut *self {
            BookingState::Collecting(form) => form,
            other => return Err(other.invalid("submit")),
        };

        let missing = form.missing_fields();
        if !missing.is_empty() {
            return Err(BookingError::MissingFields(missing));
        }
        let consultation_type = consultation_type(form.consultation_type.trim()).ok_or_else(
            || BookingError::UnknownConsultationType(form.consultation_type.clone()),
        )?;

        let form = std::mem::take(form);
        *self = BookingState::Submitting {
            form,
            consultation_type,
        };
        Ok(())
    }

    /// `Submitting -> Success` with the fabricated meeting link.
    pub fn confirm(&mut self, meeting_link: String) -> Result<BookingConfirmation, BookingError> {
        let (form, consultation_type) = match &mut *self {
            BookingState::Submitting {
                form,
                consultation_type,
            } => (std::mem::take(form), *consultation_type),
            other => return Err(other.invalid("confirm")),
        };

        let confirmation = BookingConfirmation {
            name: form.name,
            email: form.email,
            preferred_date: form.preferred_date,
            preferred_time: form.preferred_time,
            consultation_type,
            meeting_link,
        };
        *self = BookingState::Success(confirmation.clone());
        Ok(confirmation)
    }

    /// Closing the modal from any state starts over with an empty form.
    pub fn close(&mut self) {
        *self = BookingState::default();
    }
}

/// `https://meet.google.com/` followed by 13 random `[a-z0-9]` characters.
pub fn generate_meeting_link<R: Rng + ?Sized>(rng: &mut R) -> String {
    let id: String = (0..MEETING_ID_LEN)
        .map(|_| MEETING_ID_CHARSET[rng.random_range(0..MEETING_ID_CHARSET.len())] as char)
        .collect();
    format!("{}{}", MEETING_BASE_URL, id)
}

/// Runs one submission through the whole wizard.
pub async fn book<R: Rng + Send + ?Sized>(
    form: BookingForm,
    delay: Duration,
    rng: &mut R,
) -> Result<BookingConfirmation, BookingError> {
    let mut state = BookingState::default();
    state.fill(form)?;
    state.submit()?;

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let link = generate_meeting_link(rng);
    let confirmation = state.confirm(link)?;
    tracing::debug!(
        consultation_type = confirmation.consultation_type.value,
        "booking confirmed"
    );
    Ok(confirmation)
}
