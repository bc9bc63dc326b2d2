//! Member operations composing stores, authorization, search, storage and bus

use crate::core::auth::{Principal, ensure_can_manage, visible_view};
use crate::core::entity::{Entity, merge_fields};
use crate::core::error::{ServiceError, ServiceResult};
use crate::core::events::BusEvent;
use crate::core::field::FieldValue;
use crate::core::params::{parse_comma_separated_string, select_fields};
use crate::core::query::{PageParams, ResultEnvelope};
use crate::core::store::{Condition, QueryDescriptor, ScanParams};
use crate::entities::{Member, MemberTrait};
use crate::server::host::ServiceHost;
use chrono::Utc;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;

/// Trait categories a member may record
pub const TRAIT_IDS: &[&str] = &[
    "basic_info",
    "education",
    "work",
    "communities",
    "languages",
    "hobby",
    "organization",
    "device",
    "software",
    "service_provider",
    "subscription",
    "personalization",
    "connect_info",
    "onboarding_checklist",
];

/// Attributes full-text search looks into
const SEARCH_FIELDS: &[&str] = &["handle", "firstName", "lastName", "description"];

/// Deepest result a search page may reach (the index's `max_result_window`)
const MAX_RESULT_WINDOW: usize = 10_000;

/// Filters of the member listing
#[derive(Debug, Clone, Default)]
pub struct MemberFilter {
    pub status: Option<String>,
    /// Comma-separated handles
    pub handles: Option<String>,
}

/// A photo to attach to a member profile
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Member operations on behalf of the acting principal
pub struct MemberService {
    host: Arc<ServiceHost>,
}

impl MemberService {
    pub fn new(host: Arc<ServiceHost>) -> Self {
        Self { host }
    }

    fn page_size(&self, params: &PageParams) -> (usize, usize) {
        let pagination = &self.host.config().pagination;
        (
            params.page(),
            params.per_page(pagination.default_per_page, pagination.max_per_page),
        )
    }

    async fn publish(&self, topic: &str, payload: Value) -> ServiceResult<()> {
        let event = BusEvent::new(topic, &self.host.config().bus.originator, payload);
        self.host.event_publisher().await.post_event(event).await
    }

    /// Load a member by handle, case-insensitively
    pub async fn find_member(&self, handle: &str) -> ServiceResult<Member> {
        self.host
            .members()
            .get_by_unique_key("handleLower", &FieldValue::from(handle.to_lowercase()))
            .await
    }

    /// A member profile as `principal` may see it, optionally projected on `fields`
    pub async fn get_member(
        &self,
        handle: &str,
        fields: Option<&str>,
        principal: Option<&Principal>,
    ) -> ServiceResult<Value> {
        let fields = parse_comma_separated_string(fields, Some(Member::FIELDS))?;
        let member = self.find_member(handle).await?;
        let view = visible_view(&member, principal)?;

        Ok(match fields {
            Some(fields) => select_fields(view, &fields),
            None => view,
        })
    }

    /// One page of members matching `filter`, ordered by handle
    pub async fn list_members(
        &self,
        filter: &MemberFilter,
        params: &PageParams,
        principal: Option<&Principal>,
    ) -> ServiceResult<ResultEnvelope<Value>> {
        let mut scan = ScanParams::new();
        if let Some(status) = filter.status.as_deref().filter(|s| !s.is_empty()) {
            scan = scan.filter(Condition::eq("status", status));
        }
        if let Some(handles) = parse_comma_separated_string(filter.handles.as_deref(), None)? {
            let lowered = handles.iter().map(|h| h.to_lowercase()).collect::<Vec<_>>();
            scan = scan.filter(Condition::one_of("handleLower", lowered));
        }

        let mut members = self.host.members().scan(&scan).await?;
        members.sort_by(|a, b| a.handle_lower.cmp(&b.handle_lower));

        let (page, per_page) = self.page_size(params);
        ResultEnvelope::paginate(members, page, per_page)?
            .try_map(|member| visible_view(&member, principal))
    }

    /// Full-text member search through the search index
    pub async fn search_members(
        &self,
        query: Option<&str>,
        params: &PageParams,
        principal: Option<&Principal>,
    ) -> ServiceResult<ResultEnvelope<Value>> {
        let (page, per_page) = self.page_size(params);
        let from = page
            .saturating_sub(1)
            .checked_mul(per_page)
            .filter(|from| from.saturating_add(per_page) <= MAX_RESULT_WINDOW)
            .ok_or_else(|| {
                ServiceError::BadRequest(format!(
                    "page {} is beyond the {} searchable results",
                    page, MAX_RESULT_WINDOW
                ))
            })?;
        let must = match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(text) => json!({ "multi_match": { "query": text, "fields": SEARCH_FIELDS } }),
            None => json!({ "match_all": {} }),
        };
        let body = json!({
            "from": from,
            "size": per_page,
            "query": {
                "bool": {
                    "must": must,
                    "filter": [{ "term": { "status": "ACTIVE" } }]
                }
            }
        });

        let client = self.host.search_client().await?;
        let results = client
            .search(&self.host.config().search.member_index, &body)
            .await?;

        let members = results
            .hits
            .into_iter()
            .map(|hit| {
                serde_json::from_value::<Member>(hit).map_err(|e| {
                    ServiceError::external("search", format!("unexpected member document: {}", e))
                })
            })
            .collect::<ServiceResult<Vec<_>>>()?;

        let total = usize::try_from(results.total).unwrap_or(usize::MAX);
        ResultEnvelope::new(members, page, per_page, total)?
            .try_map(|member| visible_view(&member, principal))
    }

    /// Apply a partial profile update
    ///
    /// Immutable attributes in `data` are ignored. The merged profile must
    /// still validate; the update is then persisted and announced on the bus.
    pub async fn update_member(
        &self,
        handle: &str,
        mut data: Map<String, Value>,
        principal: Option<&Principal>,
    ) -> ServiceResult<Value> {
        let member = self.find_member(handle).await?;
        ensure_can_manage(principal, &member)?;

        data.retain(|field, _| !Member::IMMUTABLE_FIELDS.contains(&field.as_str()));
        if data.is_empty() {
            return Err(ServiceError::BadRequest(
                "The request does not contain any updatable field".to_string(),
            ));
        }
        data.insert("updatedAt".to_string(), json!(Utc::now()));
        data.insert("updatedBy".to_string(), json!(audit_id(principal)));

        let candidate = merge_fields(&member, &data)
            .map_err(|e| ServiceError::BadRequest(e.to_string()))?;
        candidate.validate()?;

        let updated = self.host.members().update(member, &data).await?;
        tracing::info!(handle = %updated.handle, fields = data.len(), "member profile updated");

        let payload = serde_json::to_value(&updated)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        self.publish(&self.host.config().bus.topics.profile_update, payload)
            .await?;

        visible_view(&updated, principal)
    }

    /// Store a new profile photo and point the profile at it
    pub async fn upload_photo(
        &self,
        handle: &str,
        photo: PhotoUpload,
        principal: Option<&Principal>,
    ) -> ServiceResult<Value> {
        if !photo.content_type.starts_with("image/") {
            return Err(ServiceError::BadRequest(format!(
                "Unsupported photo content type: {}",
                photo.content_type
            )));
        }
        if photo.body.is_empty() {
            return Err(ServiceError::BadRequest("The photo is empty".to_string()));
        }

        let member = self.find_member(handle).await?;
        ensure_can_manage(principal, &member)?;

        let metadata = HashMap::from([("handle".to_string(), member.handle.clone())]);
        let url = self
            .host
            .photo_uploader()?
            .upload(&photo.file_name, &photo.content_type, photo.body, metadata)
            .await?;

        let mut data = Map::new();
        data.insert("photoURL".to_string(), json!(url));
        data.insert("updatedAt".to_string(), json!(Utc::now()));
        data.insert("updatedBy".to_string(), json!(audit_id(principal)));
        let updated = self.host.members().update(member, &data).await?;

        self.publish(
            &self.host.config().bus.topics.photo_update,
            json!({ "userId": updated.user_id, "handle": updated.handle, "photoURL": url }),
        )
        .await?;

        Ok(json!({ "photoURL": url }))
    }

    /// Traits of a member, optionally restricted to some categories
    pub async fn list_traits(
        &self,
        handle: &str,
        trait_ids: Option<&str>,
    ) -> ServiceResult<Vec<MemberTrait>> {
        let trait_ids = parse_comma_separated_string(trait_ids, Some(TRAIT_IDS))?;
        let member = self.find_member(handle).await?;

        let mut descriptor = QueryDescriptor::new("userId", member.user_id);
        if let Some(ids) = trait_ids {
            descriptor = descriptor.filter(Condition::one_of("traitId", ids));
        }
        self.host.traits().query(&descriptor).await
    }

    /// Record a new trait category for a member
    pub async fn create_trait(
        &self,
        handle: &str,
        mut data: Map<String, Value>,
        principal: Option<&Principal>,
    ) -> ServiceResult<MemberTrait> {
        let trait_id = data
            .get("traitId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ServiceError::BadRequest("traitId is required".to_string()))?;
        if !TRAIT_IDS.contains(&trait_id.as_str()) {
            return Err(ServiceError::BadRequest(format!("Invalid value: {}", trait_id)));
        }

        let member = self.find_member(handle).await?;
        ensure_can_manage(principal, &member)?;

        let existing = self
            .host
            .traits()
            .query(
                &QueryDescriptor::new("userId", member.user_id)
                    .filter(Condition::eq("traitId", trait_id.as_str())),
            )
            .await?;
        if !existing.is_empty() {
            return Err(ServiceError::BadRequest(format!(
                "The trait {} already exists for {}",
                trait_id, member.handle
            )));
        }

        for field in ["updatedAt", "updatedBy"] {
            data.remove(field);
        }
        data.insert("userId".to_string(), json!(member.user_id));
        data.insert("createdAt".to_string(), json!(Utc::now()));
        data.insert("createdBy".to_string(), json!(audit_id(principal)));

        let created = MemberTrait::parse_data(data)
            .map_err(|e| ServiceError::BadRequest(format!("Invalid trait: {}", e)))?;
        self.host.traits().insert(&created).await?;
        tracing::info!(handle = %member.handle, trait_id = %trait_id, "member trait created");

        let payload = serde_json::to_value(&created)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        self.publish(&self.host.config().bus.topics.trait_create, payload)
            .await?;

        Ok(created)
    }
}

fn audit_id(principal: Option<&Principal>) -> String {
    principal
        .map(Principal::audit_id)
        .unwrap_or_else(|| "unknown".to_string())
}
