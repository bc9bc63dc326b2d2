//! Member profile routes
//!
//! - `GET /members`: paginated listing, filters `status` and `handles`
//! - `GET /members/search`: paginated full-text search
//! - `GET /members/{handle}`: one profile, optional `fields` projection
//! - `PATCH /members/{handle}`: partial profile update
//! - `PUT /members/{handle}/photo`: replace the profile photo
//! - `GET /members/{handle}/traits`: trait categories, optional `traitIds`
//! - `POST /members/{handle}/traits`: record a trait category

pub mod handlers;
pub mod service;

pub use service::MemberService;

use crate::server::host::ServiceHost;
use axum::Router;
use axum::routing::{get, put};
use handlers::{
    create_trait, get_member, list_members, list_traits, search_members, update_member,
    upload_photo,
};
use std::sync::Arc;

/// Build the member routes over `host`
pub fn routes(host: Arc<ServiceHost>) -> Router {
    Router::new()
        .route("/members", get(list_members))
        .route("/members/search", get(search_members))
        .route("/members/{handle}", get(get_member).patch(update_member))
        .route("/members/{handle}/photo", put(upload_photo))
        .route(
            "/members/{handle}/traits",
            get(list_traits).post(create_trait),
        )
        .with_state(host)
}
