//! # Member service core
//!
//! The shared service layer of a member-profile API.
//!
//! ## Features
//!
//! - **Generic entity stores**: one [`EntityStore`](core::service::EntityStore)
//!   trait for unique-key lookup, create, shallow-merge update, scan and query,
//!   with in-memory and DynamoDB backends
//! - **Authorization predicates**: admin, machine and owner capabilities
//!   deciding who may mutate a member and who sees its identifiable fields
//! - **Pagination headers**: `X-Page`, `X-Total`, `Link` and friends built
//!   from a result envelope and the request URL
//! - **External collaborators**: memoized search index client (plain or
//!   SigV4-signed), bus event client, photo object storage
//! - **Member routes**: an axum router exposing member profiles and traits
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use member::prelude::*;
//!
//! let config = ServiceConfig::from_yaml_file("config.yaml")?.with_env_overrides();
//! config.logging.init();
//!
//! let host = ServiceHost::in_memory(config)?
//!     .with_photo_storage(Arc::new(InMemoryObjectStorage::new()))?;
//! serve(Arc::new(host)).await?;
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod members;
pub mod server;
pub mod services;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Traits ===
    pub use crate::core::{
        auth::{
            AdminRoles, Capability, Claims, Principal, can_manage_member, field_is_visible,
            has_admin_role, visible_view,
        },
        entity::{Entity, MemberOwned},
        error::{HandlerResult, ServiceError, ServiceResult},
        events::{BusEvent, EventPublisher, LocalEventBus},
        extractors::{CurrentPrincipal, RequestUrl},
        field::FieldValue,
        params::{parse_comma_separated_string, select_fields},
        query::{PageParams, PaginatedResponse, ResultEnvelope, build_navigation},
        service::EntityStore,
        store::{Condition, QueryDescriptor, ScanParams},
    };

    // === Macros ===
    pub use crate::impl_entity;

    // === Entities ===
    pub use crate::entities::{Address, Member, MemberTrait};

    // === Storage ===
    pub use crate::storage::InMemoryStore;
    #[cfg(feature = "dynamodb")]
    pub use crate::storage::DynamoDBStore;

    // === Services ===
    pub use crate::services::{
        BusClient, InMemoryObjectStorage, ObjectStorage, PhotoUploader, SearchClient,
    };

    // === Config ===
    pub use crate::config::{LoggingConfig, ServiceConfig};

    // === Server ===
    pub use crate::members::MemberService;
    pub use crate::server::{ServiceHost, build_router, serve, with_error_pipeline};

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use std::sync::Arc;
}
