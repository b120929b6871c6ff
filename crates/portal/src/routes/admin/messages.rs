//! Admin inbox for contact form messages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use jack_machine_core::{MessageId, filter_by_query};

use super::{ListQuery, deleted, mutation_failed, redirect_with_notice, wants_partial};
use crate::db::MessageRepository;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::SessionUser;
use crate::routes::views::MessageRow;
use crate::state::AppState;

const LIST_PATH: &str = "/admin/messages";

#[derive(Template, WebTemplate)]
#[template(path = "admin/messages.html")]
pub struct MessagesTemplate {
    pub admin: SessionUser,
    pub current_path: &'static str,
    pub q: String,
    pub messages: Vec<MessageRow>,
    pub total: usize,
    pub unread: usize,
    pub error: Option<String>,
    pub notice: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/_message_row.html")]
pub struct MessageRowTemplate {
    pub message: MessageRow,
}

/// List messages, filtered by name, e-mail or subject.
#[instrument(skip(state, auth, query), fields(user_id = %auth.user.id, q = ?query.q))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let (messages, total, unread, error) = match MessageRepository::new(state.data()).list().await {
        Ok(all) => (
            filter_by_query(&all, query.q.as_deref())
                .iter()
                .map(MessageRow::from)
                .collect(),
            all.len(),
            all.iter().filter(|m| !m.is_read).count(),
            query.error.clone(),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load messages");
            (Vec::new(), 0, 0, Some(e.user_message()))
        }
    };

    MessagesTemplate {
        admin: auth.user,
        current_path: LIST_PATH,
        q: query.search(),
        messages,
        total,
        unread,
        error,
        notice: query.notice,
    }
}

/// Flag a message as read.
#[instrument(skip(state, auth, headers), fields(user_id = %auth.user.id))]
pub async fn mark_read(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    match MessageRepository::new(state.data())
        .mark_read(MessageId::new(id))
        .await
    {
        Ok(message) => {
            tracing::info!(message_id = id, "Message marked read");
            if wants_partial(&headers) {
                MessageRowTemplate {
                    message: MessageRow::from(&message),
                }
                .into_response()
            } else {
                redirect_with_notice(LIST_PATH, "Message marked as read.")
            }
        }
        Err(e) => mutation_failed(&headers, LIST_PATH, &e),
    }
}

/// Delete a message.
#[instrument(skip(state, auth, headers), fields(user_id = %auth.user.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    match MessageRepository::new(state.data())
        .delete(MessageId::new(id))
        .await
    {
        Ok(()) => {
            tracing::info!(message_id = id, "Message deleted");
            deleted(&headers, LIST_PATH, "Message deleted.")
        }
        Err(e) => mutation_failed(&headers, LIST_PATH, &e),
    }
}
