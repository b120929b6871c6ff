//! Public marketing pages: home, services and careers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use crate::filters;
use crate::middleware::OptionalUser;
use crate::models::SessionUser;
use crate::routes::views::{JobCard, ServiceCard};
use crate::state::AppState;

/// Services featured on the home page.
const FEATURED_SERVICES: usize = 3;

// =============================================================================
// Static content
// =============================================================================

/// A slide in the home page hero.
#[derive(Clone)]
pub struct HeroSlide {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub button_text: &'static str,
    pub button_url: &'static str,
    pub image_path: &'static str,
}

const HERO_SLIDES: &[HeroSlide] = &[
    HeroSlide {
        title: "Heavy equipment repair you can count on",
        subtitle: "Field and shop service for hydraulics, engines and drivetrains.",
        button_text: "Our Services",
        button_url: "/services",
        image_path: "/static/images/hero-workshop.jpg",
    },
    HeroSlide {
        title: "Back to work, faster",
        subtitle: "Mobile crews on site within 24 hours across the region.",
        button_text: "Contact Us",
        button_url: "/contact",
        image_path: "/static/images/hero-field.jpg",
    },
    HeroSlide {
        title: "Build your career with us",
        subtitle: "We are hiring technicians, welders and service planners.",
        button_text: "View Careers",
        button_url: "/careers",
        image_path: "/static/images/hero-team.jpg",
    },
];

/// A customer quote on the home page.
#[derive(Clone)]
pub struct Testimonial {
    pub quote: &'static str,
    pub author: &'static str,
    pub company: &'static str,
}

const TESTIMONIALS: &[Testimonial] = &[
    Testimonial {
        quote: "Their crew rebuilt our excavator's hydraulic pump on site and had us running the same day.",
        author: "Maria Lopez",
        company: "Lopez Earthworks",
    },
    Testimonial {
        quote: "Preventive maintenance from Jack Machine cut our fleet downtime in half.",
        author: "Dev Patel",
        company: "Northline Haulage",
    },
    Testimonial {
        quote: "Straight answers, fair quotes and work that holds up.",
        author: "Tom Becker",
        company: "Becker Aggregates",
    },
];

// =============================================================================
// Templates
// =============================================================================

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub viewer: Option<SessionUser>,
    pub slides: &'static [HeroSlide],
    pub featured: Vec<ServiceCard>,
    pub testimonials: &'static [Testimonial],
    pub error: Option<String>,
}

/// Services grouped under one category heading.
pub struct CategoryGroup {
    pub name: String,
    pub services: Vec<ServiceCard>,
}

/// Services page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/services.html")]
pub struct ServicesTemplate {
    pub viewer: Option<SessionUser>,
    pub groups: Vec<CategoryGroup>,
    pub error: Option<String>,
}

/// Careers page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/careers.html")]
pub struct CareersTemplate {
    pub viewer: Option<SessionUser>,
    pub jobs: Vec<JobCard>,
    pub applied: bool,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CareersQuery {
    pub applied: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the home page.
#[instrument(skip(state, viewer))]
pub async fn home(State(state): State<AppState>, OptionalUser(viewer): OptionalUser) -> impl IntoResponse {
    let (featured, error) = match state.catalog().services(state.data()).await {
        Ok(services) => (
            services
                .iter()
                .take(FEATURED_SERVICES)
                .map(ServiceCard::from)
                .collect(),
            None,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load featured services");
            (Vec::new(), Some(e.user_message()))
        }
    };

    HomeTemplate {
        viewer: viewer.map(|auth| auth.user),
        slides: HERO_SLIDES,
        featured,
        testimonials: TESTIMONIALS,
        error,
    }
}

/// Display all services grouped by category.
#[instrument(skip(state, viewer))]
pub async fn services(
    State(state): State<AppState>,
    OptionalUser(viewer): OptionalUser,
) -> impl IntoResponse {
    let (groups, error) = match state.catalog().services(state.data()).await {
        Ok(services) => (
            group_by_category(services.iter().map(ServiceCard::from)),
            None,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load services");
            (Vec::new(), Some(e.user_message()))
        }
    };

    ServicesTemplate {
        viewer: viewer.map(|auth| auth.user),
        groups,
        error,
    }
}

/// Display open positions.
#[instrument(skip(state, viewer))]
pub async fn careers(
    State(state): State<AppState>,
    OptionalUser(viewer): OptionalUser,
    Query(query): Query<CareersQuery>,
) -> impl IntoResponse {
    let (jobs, error) = match state.catalog().jobs(state.data()).await {
        Ok(jobs) => (jobs.iter().map(JobCard::from).collect(), None),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load job listings");
            (Vec::new(), Some(e.user_message()))
        }
    };

    CareersTemplate {
        viewer: viewer.map(|auth| auth.user),
        jobs,
        applied: query.applied.is_some_and(|v| v == "1"),
        error,
    }
}

/// Group services by category, keeping the order each category first appears.
fn group_by_category(services: impl Iterator<Item = ServiceCard>) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    for service in services {
        let name = match service.category.trim() {
            "" => "General".to_string(),
            category => category.to_string(),
        };
        match groups.iter_mut().find(|g| g.name == name) {
            Some(group) => group.services.push(service),
            None => groups.push(CategoryGroup {
                name,
                services: vec![service],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(name: &str, category: &str) -> ServiceCard {
        ServiceCard {
            id: 1,
            name: name.to_string(),
            category: category.to_string(),
            description: String::new(),
            clients: 0,
            image_url: None,
            icon: "wrench",
            glyph: "🔧",
            created: String::new(),
        }
    }

    #[test]
    fn test_group_by_category_keeps_first_seen_order() {
        let groups = group_by_category(
            vec![
                card("Pump rebuild", "Hydraulics"),
                card("Engine overhaul", "Engines"),
                card("Cylinder reseal", "Hydraulics"),
                card("Inspection", " "),
            ]
            .into_iter(),
        );
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Hydraulics", "Engines", "General"]);
        assert_eq!(groups[0].services.len(), 2);
    }
}
