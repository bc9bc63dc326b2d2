//! HTTP handlers for member routes

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::core::error::HandlerResult;
use crate::core::extractors::{CurrentPrincipal, RequestUrl};
use crate::core::query::{PageParams, PaginatedResponse};
use crate::entities::MemberTrait;
use crate::members::service::{MemberFilter, MemberService, PhotoUpload};
use crate::server::host::ServiceHost;

/// Query string of `GET /members`
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListMembersQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub status: Option<String>,
    pub handles: Option<String>,
}

/// Query string of `GET /members/search`
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchMembersQuery {
    pub query: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct FieldsQuery {
    pub fields: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TraitsQuery {
    pub trait_ids: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PhotoQuery {
    pub file_name: Option<String>,
}

/// GET /members
pub async fn list_members(
    State(host): State<Arc<ServiceHost>>,
    principal: CurrentPrincipal,
    RequestUrl(url): RequestUrl,
    Query(query): Query<ListMembersQuery>,
) -> HandlerResult<PaginatedResponse<Value>> {
    let filter = MemberFilter {
        status: query.status,
        handles: query.handles,
    };
    let params = PageParams {
        page: query.page,
        per_page: query.per_page,
    };

    let envelope = MemberService::new(host)
        .list_members(&filter, &params, principal.principal())
        .await?;
    Ok(PaginatedResponse::new(envelope, url))
}

/// GET /members/search
pub async fn search_members(
    State(host): State<Arc<ServiceHost>>,
    principal: CurrentPrincipal,
    RequestUrl(url): RequestUrl,
    Query(query): Query<SearchMembersQuery>,
) -> HandlerResult<PaginatedResponse<Value>> {
    let params = PageParams {
        page: query.page,
        per_page: query.per_page,
    };

    let envelope = MemberService::new(host)
        .search_members(query.query.as_deref(), &params, principal.principal())
        .await?;
    Ok(PaginatedResponse::new(envelope, url))
}

/// GET /members/{handle}
pub async fn get_member(
    State(host): State<Arc<ServiceHost>>,
    principal: CurrentPrincipal,
    Path(handle): Path<String>,
    Query(query): Query<FieldsQuery>,
) -> HandlerResult<Json<Value>> {
    let member = MemberService::new(host)
        .get_member(&handle, query.fields.as_deref(), principal.principal())
        .await?;
    Ok(Json(member))
}

/// PATCH /members/{handle}
pub async fn update_member(
    State(host): State<Arc<ServiceHost>>,
    principal: CurrentPrincipal,
    Path(handle): Path<String>,
    Json(data): Json<Map<String, Value>>,
) -> HandlerResult<Json<Value>> {
    let member = MemberService::new(host)
        .update_member(&handle, data, principal.principal())
        .await?;
    Ok(Json(member))
}

/// PUT /members/{handle}/photo
///
/// The body is the raw image; its type comes from `Content-Type` and the
/// original file name, if any, from the `fileName` query parameter.
pub async fn upload_photo(
    State(host): State<Arc<ServiceHost>>,
    principal: CurrentPrincipal,
    Path(handle): Path<String>,
    Query(query): Query<PhotoQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> HandlerResult<Json<Value>> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let file_name = query
        .file_name
        .unwrap_or_else(|| default_file_name(&content_type));

    let photo = PhotoUpload {
        file_name,
        content_type,
        body: body.to_vec(),
    };
    let result = MemberService::new(host)
        .upload_photo(&handle, photo, principal.principal())
        .await?;
    Ok(Json(result))
}

/// GET /members/{handle}/traits
pub async fn list_traits(
    State(host): State<Arc<ServiceHost>>,
    Path(handle): Path<String>,
    Query(query): Query<TraitsQuery>,
) -> HandlerResult<Json<Vec<MemberTrait>>> {
    let traits = MemberService::new(host)
        .list_traits(&handle, query.trait_ids.as_deref())
        .await?;
    Ok(Json(traits))
}

/// POST /members/{handle}/traits
pub async fn create_trait(
    State(host): State<Arc<ServiceHost>>,
    principal: CurrentPrincipal,
    Path(handle): Path<String>,
    Json(data): Json<Map<String, Value>>,
) -> HandlerResult<impl IntoResponse> {
    let created = MemberService::new(host)
        .create_trait(&handle, data, principal.principal())
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// File name standing in for a photo uploaded without one
fn default_file_name(content_type: &str) -> String {
    let subtype = content_type
        .split(';')
        .next()
        .and_then(|mime| mime.trim().strip_prefix("image/"))
        .unwrap_or("bin");
    let extension = match subtype {
        "jpeg" | "pjpeg" => "jpg",
        "svg+xml" => "svg",
        other => other,
    };
    format!("photo.{}", extension)
}
