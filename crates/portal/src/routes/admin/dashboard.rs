//! Admin dashboard: aggregate counts, recent activity and the live
//! new-message feed.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::instrument;

use crate::db::{
    ActivityRepository, ApplicationRepository, JobRepository, MessageRepository,
    RepositoryError, ServiceRepository,
};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::SessionUser;
use crate::routes::views::ActivityRow;
use crate::services::notifications::dashboard_feed;
use crate::state::AppState;

/// Activity entries shown on the dashboard.
const RECENT_ACTIVITY: usize = 5;

#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub admin: SessionUser,
    pub current_path: &'static str,
    pub services: u64,
    pub jobs: u64,
    pub pending: u64,
    pub unread: u64,
    /// Notification sequence the counts were read at.
    pub since: u64,
    pub activity: Vec<ActivityRow>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    /// Unread count the page was rendered with.
    #[serde(default)]
    pub unread: u64,
    /// Notification sequence the page was rendered at.
    pub since: Option<u64>,
}

/// Keep the first failure for the banner and fall back to zero.
fn count_or_zero(result: Result<u64, RepositoryError>, error: &mut Option<String>) -> u64 {
    result.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Dashboard count failed");
        error.get_or_insert_with(|| e.user_message());
        0
    })
}

/// Display the dashboard.
#[instrument(skip(state, auth), fields(user_id = %auth.user.id))]
pub async fn index(State(state): State<AppState>, RequireAdmin(auth): RequireAdmin) -> impl IntoResponse {
    let data = state.data();
    let services = ServiceRepository::new(data);
    let jobs = JobRepository::new(data);
    let applications = ApplicationRepository::new(data);
    let messages = MessageRepository::new(data);
    let activity = ActivityRepository::new(data);

    let (services, jobs, pending, unread, recent) = tokio::join!(
        services.count(),
        jobs.count(),
        applications.count_pending(),
        messages.count_unread(),
        activity.recent(RECENT_ACTIVITY),
    );
    let since = state.notifications().sequence();

    let mut error = None;
    let services = count_or_zero(services, &mut error);
    let jobs = count_or_zero(jobs, &mut error);
    let pending = count_or_zero(pending, &mut error);
    let unread = count_or_zero(unread, &mut error);
    let activity = match recent {
        Ok(entries) => entries.iter().map(ActivityRow::from).collect(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load recent activity");
            error.get_or_insert_with(|| e.user_message());
            Vec::new()
        }
    };

    DashboardTemplate {
        admin: auth.user,
        current_path: "/admin/dashboard",
        services,
        jobs,
        pending,
        unread,
        since,
        activity,
        error,
    }
}

/// Server-sent events for new contact messages.
///
/// Each event carries the toast text and the unread counter; the page never
/// re-fetches the message list. The stream ends when the client disconnects.
#[instrument(skip(state, auth), fields(user_id = %auth.user.id))]
pub async fn events(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    tracing::debug!(unread = query.unread, since = ?query.since, "Dashboard feed opened");
    let feed = dashboard_feed(state.notifications(), query.unread, query.since)
        .map(|update| Event::default().event("message").json_data(update));
    Sse::new(feed).keep_alive(KeepAlive::default())
}
