//! Pagination envelope and navigation headers
//!
//! List endpoints return a [`ResultEnvelope`]; [`build_navigation`] turns it
//! into the `X-*` pagination headers and an RFC 8288 `Link` header whose
//! anchors keep every query parameter of the original request except `page`.

use crate::core::error::{ServiceError, ServiceResult};
use axum::Json;
use axum::http::header::{ACCESS_CONTROL_EXPOSE_HEADERS, LINK};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use url::Url;

pub const X_PAGE: &str = "x-page";
pub const X_PER_PAGE: &str = "x-per-page";
pub const X_TOTAL: &str = "x-total";
pub const X_TOTAL_PAGES: &str = "x-total-pages";
pub const X_PREV_PAGE: &str = "x-prev-page";
pub const X_NEXT_PAGE: &str = "x-next-page";

const EXPOSED_HEADERS: &str =
    "X-Page, X-Per-Page, X-Total, X-Total-Pages, X-Prev-Page, X-Next-Page, Link";

/// Pagination parameters extracted from the query string
///
/// ```text
/// GET /members?page=2&perPage=10
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    /// Page number (starts at 1)
    pub page: Option<usize>,

    /// Number of items per page
    pub per_page: Option<usize>,
}

impl PageParams {
    pub fn new(page: usize, per_page: usize) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    /// Page number, ensuring minimum of 1
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    /// Items per page, falling back to `default` and capped at `max`
    pub fn per_page(&self, default: usize, max: usize) -> usize {
        self.per_page.unwrap_or(default).clamp(1, max.max(1))
    }
}

/// One page of results plus the total number of matches
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
}

impl<T> ResultEnvelope<T> {
    /// Build an envelope, enforcing `page >= 1`, `perPage >= 1` and
    /// `items.len() <= perPage`
    pub fn new(items: Vec<T>, page: usize, per_page: usize, total: usize) -> ServiceResult<Self> {
        if page < 1 {
            return Err(ServiceError::BadRequest("page must be at least 1".into()));
        }
        if per_page < 1 {
            return Err(ServiceError::BadRequest("perPage must be at least 1".into()));
        }
        if items.len() > per_page {
            return Err(ServiceError::Internal(format!(
                "page holds {} items but perPage is {}",
                items.len(),
                per_page
            )));
        }
        Ok(Self {
            items,
            page,
            per_page,
            total,
        })
    }

    /// Cut the requested page out of the complete result list
    pub fn paginate(all: Vec<T>, page: usize, per_page: usize) -> ServiceResult<Self> {
        let total = all.len();
        let start = page.saturating_sub(1).saturating_mul(per_page);
        let items: Vec<T> = all.into_iter().skip(start).take(per_page).collect();
        Self::new(items, page, per_page, total)
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.total, self.per_page)
    }

    /// Transform the items, keeping the pagination metadata
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<ResultEnvelope<U>, E> {
        Ok(ResultEnvelope {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            page: self.page,
            per_page: self.per_page,
            total: self.total,
        })
    }
}

/// Number of pages needed for `total` items, `0` when there are none
pub fn total_pages(total: usize, per_page: usize) -> usize {
    total.div_ceil(per_page.max(1))
}

/// Navigation metadata derived from a result envelope
#[derive(Debug, Clone, PartialEq)]
pub struct Navigation {
    /// `X-*` headers in emission order
    pub headers: Vec<(&'static str, String)>,
    /// Value of the `Link` header, absent when there are no pages
    pub link: Option<String>,
}

impl Navigation {
    /// Value of the named `X-*` header, if emitted
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Write the navigation headers into a response header map
    ///
    /// `Access-Control-Expose-Headers` is extended rather than replaced.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for (name, value) in &self.headers {
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.insert(HeaderName::from_static(name), value);
            }
        }

        if let Some(link) = &self.link {
            match HeaderValue::from_str(link) {
                Ok(value) => {
                    headers.insert(LINK, value);
                }
                Err(e) => tracing::warn!(error = %e, "dropping unrepresentable Link header"),
            }
        }

        let exposed = match headers
            .get(ACCESS_CONTROL_EXPOSE_HEADERS)
            .and_then(|v| v.to_str().ok())
        {
            Some(existing) if !existing.is_empty() => format!("{}, {}", existing, EXPOSED_HEADERS),
            _ => EXPOSED_HEADERS.to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&exposed) {
            headers.insert(ACCESS_CONTROL_EXPOSE_HEADERS, value);
        }
    }
}

/// Build pagination headers for `envelope` served at `request_url`
pub fn build_navigation<T>(envelope: &ResultEnvelope<T>, request_url: &Url) -> Navigation {
    let page = envelope.page;
    let total_pages = envelope.total_pages();
    let has_prev = page > 1;
    let has_next = page < total_pages;

    let mut headers = vec![
        (X_PAGE, page.to_string()),
        (X_PER_PAGE, envelope.per_page.to_string()),
        (X_TOTAL, envelope.total.to_string()),
        (X_TOTAL_PAGES, total_pages.to_string()),
    ];
    if has_prev {
        headers.push((X_PREV_PAGE, (page - 1).to_string()));
    }
    if has_next {
        headers.push((X_NEXT_PAGE, (page + 1).to_string()));
    }

    let link = (total_pages > 0).then(|| {
        let mut anchors = vec![
            format!("<{}>; rel=\"first\"", page_link(request_url, 1)),
            format!("<{}>; rel=\"last\"", page_link(request_url, total_pages)),
        ];
        if has_prev {
            anchors.push(format!("<{}>; rel=\"prev\"", page_link(request_url, page - 1)));
        }
        if has_next {
            anchors.push(format!("<{}>; rel=\"next\"", page_link(request_url, page + 1)));
        }
        anchors.join(", ")
    });

    Navigation { headers, link }
}

/// `request_url` with its `page` parameter set to `page`
///
/// The raw query is edited in place: other parameters keep their order and
/// their exact encoding. An existing `page` keeps its position, later
/// duplicates are dropped, and a missing one is appended.
pub fn page_link(request_url: &Url, page: usize) -> String {
    let page = format!("page={}", page);
    let mut replaced = false;
    let mut segments: Vec<&str> = Vec::new();

    for segment in request_url.query().unwrap_or_default().split('&') {
        if segment.is_empty() {
            continue;
        }
        let key = segment.split_once('=').map_or(segment, |(key, _)| key);
        if key == "page" {
            if !replaced {
                segments.push(&page);
                replaced = true;
            }
        } else {
            segments.push(segment);
        }
    }
    if !replaced {
        segments.push(&page);
    }

    let mut url = request_url.clone();
    url.set_query(Some(&segments.join("&")));
    url.to_string()
}

/// A JSON array response carrying pagination headers
pub struct PaginatedResponse<T> {
    pub envelope: ResultEnvelope<T>,
    pub request_url: Url,
}

impl<T> PaginatedResponse<T> {
    pub fn new(envelope: ResultEnvelope<T>, request_url: Url) -> Self {
        Self {
            envelope,
            request_url,
        }
    }
}

impl<T: Serialize> IntoResponse for PaginatedResponse<T> {
    fn into_response(self) -> Response {
        let navigation = build_navigation(&self.envelope, &self.request_url);
        let mut response = Json(self.envelope.items).into_response();
        navigation.apply(response.headers_mut());
        response
    }
}
