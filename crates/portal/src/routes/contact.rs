//! Public contact form.
//!
//! The form is validated before anything is sent to the data service; an
//! invalid submission re-renders with the typed values and no external call.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use jack_machine_core::{ContactForm, UserMessage};

use crate::backend::DataService;
use crate::db::MessageRepository;
use crate::filters;
use crate::middleware::OptionalUser;
use crate::models::SessionUser;
use crate::state::AppState;

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/contact.html")]
pub struct ContactTemplate {
    pub viewer: Option<SessionUser>,
    pub form: ContactForm,
    pub error: Option<String>,
    pub sent: bool,
}

#[derive(Debug, Deserialize)]
pub struct ContactQuery {
    pub sent: Option<String>,
}

/// Validate and store a contact form submission.
///
/// Returns the message to show above the form on failure.
pub(crate) async fn submit_contact(
    data: &dyn DataService,
    form: &ContactForm,
) -> Result<UserMessage, String> {
    let message = form.validate().map_err(|e| e.to_string())?;
    match MessageRepository::new(data).create(&message).await {
        Ok(stored) => {
            tracing::info!(message_id = %stored.id, "Contact message stored");
            Ok(stored)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to store contact message");
            Err(e.user_message())
        }
    }
}

/// Display the contact form.
pub async fn contact_page(
    OptionalUser(viewer): OptionalUser,
    Query(query): Query<ContactQuery>,
) -> impl IntoResponse {
    let viewer = viewer.map(|auth| auth.user);
    let form = ContactForm {
        name: viewer.as_ref().map(|u| u.username.clone()).unwrap_or_default(),
        email: viewer.as_ref().map(|u| u.email.clone()).unwrap_or_default(),
        ..ContactForm::default()
    };
    ContactTemplate {
        viewer,
        form,
        error: None,
        sent: query.sent.is_some(),
    }
}

/// Handle contact form submission.
#[instrument(skip(state, viewer, form))]
pub async fn submit(
    State(state): State<AppState>,
    OptionalUser(viewer): OptionalUser,
    Form(form): Form<ContactForm>,
) -> Response {
    match submit_contact(state.data(), &form).await {
        Ok(_) => Redirect::to("/contact?sent=1").into_response(),
        Err(error) => ContactTemplate {
            viewer: viewer.map(|auth| auth.user),
            form,
            error: Some(error),
            sent: false,
        }
        .into_response(),
    }
}
