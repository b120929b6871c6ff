//! Admin service management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use jack_machine_core::{ServiceForm, ServiceIcon, ServiceId, filter_by_query};

use super::{ListQuery, deleted, mutation_failed, redirect_with_notice, wants_partial};
use crate::db::ServiceRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::SessionUser;
use crate::routes::views::ServiceCard;
use crate::state::AppState;

const LIST_PATH: &str = "/admin/services";

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "admin/services.html")]
pub struct ServicesTemplate {
    pub admin: SessionUser,
    pub current_path: &'static str,
    pub q: String,
    pub services: Vec<ServiceCard>,
    pub total: usize,
    pub error: Option<String>,
    pub notice: Option<String>,
}

/// One table row, returned alone for partial requests.
#[derive(Template, WebTemplate)]
#[template(path = "admin/_service_row.html")]
pub struct ServiceRowTemplate {
    pub service: ServiceCard,
}

/// An icon choice in the editor.
pub struct IconOption {
    pub value: &'static str,
    pub glyph: &'static str,
    pub selected: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/service_form.html")]
pub struct ServiceFormTemplate {
    pub admin: SessionUser,
    pub current_path: &'static str,
    pub heading: &'static str,
    pub action: String,
    pub form: ServiceForm,
    pub icons: Vec<IconOption>,
    pub error: Option<String>,
}

impl ServiceFormTemplate {
    fn new(admin: SessionUser, action: String, form: ServiceForm, error: Option<String>) -> Self {
        let selected = form.icon.parse::<ServiceIcon>().unwrap_or_default();
        let icons = ServiceIcon::ALL
            .iter()
            .map(|&icon| IconOption {
                value: icon.as_str(),
                glyph: icon.glyph(),
                selected: icon == selected,
            })
            .collect();
        let heading = if action == LIST_PATH {
            "New Service"
        } else {
            "Edit Service"
        };
        Self {
            admin,
            current_path: LIST_PATH,
            heading,
            action,
            form,
            icons,
            error,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// List services, filtered by name or category.
#[instrument(skip(state, auth, query), fields(user_id = %auth.user.id, q = ?query.q))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let (services, total, error) = match ServiceRepository::new(state.data()).list().await {
        Ok(all) => {
            let matching = filter_by_query(&all, query.q.as_deref());
            (
                matching.iter().map(ServiceCard::from).collect(),
                all.len(),
                query.error.clone(),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load services");
            (Vec::new(), 0, Some(e.user_message()))
        }
    };

    ServicesTemplate {
        admin: auth.user,
        current_path: LIST_PATH,
        q: query.search(),
        services,
        total,
        error,
        notice: query.notice,
    }
}

/// Blank editor.
pub async fn new_form(RequireAdmin(auth): RequireAdmin) -> impl IntoResponse {
    ServiceFormTemplate::new(auth.user, LIST_PATH.to_string(), ServiceForm::default(), None)
}

/// Editor prefilled from the stored row.
#[instrument(skip(state, auth), fields(user_id = %auth.user.id))]
pub async fn edit_form(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let service = ServiceRepository::new(state.data())
        .get(ServiceId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("service {id}")))?;
    Ok(ServiceFormTemplate::new(
        auth.user,
        format!("{LIST_PATH}/{id}"),
        ServiceForm::from_service(&service),
        None,
    ))
}

/// Create a service.
#[instrument(skip(state, auth, headers, form), fields(user_id = %auth.user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    headers: HeaderMap,
    Form(form): Form<ServiceForm>,
) -> Response {
    let new = match form.validate() {
        Ok(new) => new,
        Err(e) => {
            return ServiceFormTemplate::new(auth.user, LIST_PATH.to_string(), form, Some(e.to_string()))
                .into_response();
        }
    };

    match ServiceRepository::new(state.data()).create(&new).await {
        Ok(service) => {
            state.catalog().invalidate().await;
            tracing::info!(service_id = %service.id, "Service created");
            if wants_partial(&headers) {
                ServiceRowTemplate {
                    service: ServiceCard::from(&service),
                }
                .into_response()
            } else {
                redirect_with_notice(LIST_PATH, "Service created.")
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Service create failed");
            ServiceFormTemplate::new(auth.user, LIST_PATH.to_string(), form, Some(e.user_message()))
                .into_response()
        }
    }
}

/// Replace a service's fields.
#[instrument(skip(state, auth, headers, form), fields(user_id = %auth.user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Form(form): Form<ServiceForm>,
) -> Response {
    let action = format!("{LIST_PATH}/{id}");
    let new = match form.validate() {
        Ok(new) => new,
        Err(e) => {
            return ServiceFormTemplate::new(auth.user, action, form, Some(e.to_string()))
                .into_response();
        }
    };

    match ServiceRepository::new(state.data())
        .update(ServiceId::new(id), &new)
        .await
    {
        Ok(service) => {
            state.catalog().invalidate().await;
            tracing::info!(service_id = %service.id, "Service updated");
            if wants_partial(&headers) {
                ServiceRowTemplate {
                    service: ServiceCard::from(&service),
                }
                .into_response()
            } else {
                redirect_with_notice(LIST_PATH, "Service updated.")
            }
        }
        Err(e) if wants_partial(&headers) => mutation_failed(&headers, LIST_PATH, &e),
        Err(e) => {
            tracing::warn!(error = %e, "Service update failed");
            ServiceFormTemplate::new(auth.user, action, form, Some(e.user_message())).into_response()
        }
    }
}

/// Delete a service.
#[instrument(skip(state, auth, headers), fields(user_id = %auth.user.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    match ServiceRepository::new(state.data())
        .delete(ServiceId::new(id))
        .await
    {
        Ok(()) => {
            state.catalog().invalidate().await;
            tracing::info!(service_id = id, "Service deleted");
            deleted(&headers, LIST_PATH, "Service deleted.")
        }
        Err(e) => mutation_failed(&headers, LIST_PATH, &e),
    }
}
