//! Authorization predicates for member records
//!
//! Raw authentication claims are translated once per request into a
//! [`Principal`]. The translation is the only place where role strings are
//! compared (case-insensitively) against the administrative role set; after
//! that every decision is a pure function over [`Capability`] values:
//!
//! - `Admin`: the principal holds an administrative role
//! - `Machine`: the principal is a machine (M2M) token
//! - `Owner`: the principal's handle is the member's handle

use crate::core::entity::{Entity, MemberOwned};
use crate::core::error::{ServiceError, ServiceResult};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};

/// Claims decoded from an authentication token by an upstream layer
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub is_machine: bool,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Capabilities a principal can hold over a member record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    Admin,
    Machine,
    Owner,
}

/// The administrative role set, matched case-insensitively
#[derive(Debug, Clone)]
pub struct AdminRoles(HashSet<String>);

impl AdminRoles {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            roles
                .into_iter()
                .map(|r| r.as_ref().trim().to_lowercase())
                .filter(|r| !r.is_empty())
                .collect(),
        )
    }

    /// Whether any of `roles` is administrative
    pub fn matches<S: AsRef<str>>(&self, roles: impl IntoIterator<Item = S>) -> bool {
        roles
            .into_iter()
            .any(|r| self.0.contains(&r.as_ref().to_lowercase()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for AdminRoles {
    fn default() -> Self {
        Self::new(["administrator", "admin"])
    }
}

/// The acting identity of a request
///
/// Built once from [`Claims`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    roles: BTreeSet<String>,
    is_machine: bool,
    handle: Option<String>,
    user_id: Option<String>,
    scopes: BTreeSet<String>,
    capabilities: BTreeSet<Capability>,
}

impl Principal {
    /// Translate raw claims, resolving role-based capabilities
    pub fn from_claims(claims: &Claims, admin_roles: &AdminRoles) -> Self {
        let mut capabilities = BTreeSet::new();
        if admin_roles.matches(&claims.roles) {
            capabilities.insert(Capability::Admin);
        }
        if claims.is_machine {
            capabilities.insert(Capability::Machine);
        }

        Self {
            roles: claims.roles.iter().cloned().collect(),
            is_machine: claims.is_machine,
            handle: claims.handle.clone(),
            user_id: claims.user_id.clone(),
            scopes: claims.scopes.iter().cloned().collect(),
            capabilities,
        }
    }

    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    pub fn is_machine(&self) -> bool {
        self.is_machine
    }

    pub fn handle(&self) -> Option<&str> {
        self.handle.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    /// Identifier recorded in `createdBy`/`updatedBy`
    pub fn audit_id(&self) -> String {
        self.user_id
            .clone()
            .or_else(|| self.handle.clone())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Role-derived capabilities, independent of any record
    pub fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }
}

/// Whether the principal holds an administrative role
pub fn has_admin_role(principal: &Principal) -> bool {
    principal.capabilities.contains(&Capability::Admin)
}

/// Every capability `principal` holds over `member`
pub fn capabilities_over<M: MemberOwned>(
    principal: Option<&Principal>,
    member: &M,
) -> BTreeSet<Capability> {
    let Some(principal) = principal else {
        return BTreeSet::new();
    };

    let mut capabilities = principal.capabilities.clone();
    let owns = match (principal.handle(), member.owner_handle_lower()) {
        (Some(handle), Some(owner)) => handle.to_lowercase() == owner,
        _ => false,
    };
    if owns {
        capabilities.insert(Capability::Owner);
    }
    capabilities
}

/// Whether `principal` may manage (mutate, see identifiable fields of) `member`
///
/// Machine, administrator and owner are each sufficient on their own.
pub fn can_manage_member<M: MemberOwned>(principal: Option<&Principal>, member: &M) -> bool {
    !capabilities_over(principal, member).is_empty()
}

/// Whether `field` of `member` may be shown to `principal`
pub fn field_is_visible<M: Entity + MemberOwned>(
    field: &str,
    principal: Option<&Principal>,
    member: &M,
) -> bool {
    !M::identifiable_fields().contains(&field) || can_manage_member(principal, member)
}

/// Serialize `member` for `principal`, dropping the fields it may not see
pub fn visible_view<M: Entity + MemberOwned>(
    member: &M,
    principal: Option<&Principal>,
) -> ServiceResult<Value> {
    let mut json = serde_json::to_value(member)
        .map_err(|e| ServiceError::Internal(format!("failed to serialize record: {}", e)))?;

    if !can_manage_member(principal, member) {
        if let Some(object) = json.as_object_mut() {
            object.retain(|field, _| !M::identifiable_fields().contains(&field.as_str()));
        }
    }
    Ok(json)
}

/// Fail with `Forbidden` unless `principal` may manage `member`
pub fn ensure_can_manage<M: MemberOwned>(
    principal: Option<&Principal>,
    member: &M,
) -> ServiceResult<()> {
    if can_manage_member(principal, member) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "You are not allowed to perform this action".to_string(),
        ))
    }
}
