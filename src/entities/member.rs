//! Member profile entity

use crate::core::entity::MemberOwned;
use crate::impl_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A postal address of a member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_addr1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_addr2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_code: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub address_type: Option<String>,
}

/// A member profile, keyed by `userId` and unique by `handleLower` and `email`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub user_id: i64,

    #[validate(length(min = 1, max = 64))]
    pub handle: String,

    pub handle_lower: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 64))]
    pub first_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 64))]
    pub last_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_country_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competition_country_code: Option<String>,

    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub photo_url: Option<String>,

    #[serde(default)]
    pub addresses: Vec<Address>,

    #[serde(default)]
    pub tracks: Vec<String>,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl_entity!(Member {
    collection: "Member",
    hash_key: "userId",
    indexes: {
        "handleLower" => "handleLower-index",
        "email" => "email-index",
    },
    identifiable: ["email", "firstName", "lastName", "addresses"],
    normalize: Member::derive_handle_lower,
});

impl MemberOwned for Member {
    fn owner_handle_lower(&self) -> Option<&str> {
        Some(&self.handle_lower)
    }
}

impl Member {
    /// Serialized names of every attribute
    pub const FIELDS: &'static [&'static str] = &[
        "userId",
        "handle",
        "handleLower",
        "email",
        "firstName",
        "lastName",
        "description",
        "status",
        "homeCountryCode",
        "competitionCountryCode",
        "photoURL",
        "addresses",
        "tracks",
        "createdAt",
        "updatedAt",
        "createdBy",
        "updatedBy",
    ];

    /// Attributes a profile update may never change
    pub const IMMUTABLE_FIELDS: &'static [&'static str] = &[
        "userId",
        "handle",
        "handleLower",
        "createdAt",
        "createdBy",
        "updatedAt",
        "updatedBy",
        "photoURL",
    ];

    /// Create an active member with the given identity
    pub fn new(user_id: i64, handle: &str) -> Self {
        Self {
            user_id,
            handle: handle.to_string(),
            handle_lower: handle.to_lowercase(),
            email: None,
            first_name: None,
            last_name: None,
            description: None,
            status: "ACTIVE".to_string(),
            home_country_code: None,
            competition_country_code: None,
            photo_url: None,
            addresses: Vec::new(),
            tracks: Vec::new(),
            created_at: Utc::now(),
            updated_at: None,
            created_by: None,
            updated_by: None,
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn with_name(mut self, first_name: &str, last_name: &str) -> Self {
        self.first_name = Some(first_name.to_string());
        self.last_name = Some(last_name.to_string());
        self
    }

    /// `handleLower` always mirrors `handle`, whatever the raw data said
    pub fn derive_handle_lower(&mut self) {
        self.handle_lower = self.handle.to_lowercase();
    }
}
