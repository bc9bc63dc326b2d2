//! Core module containing the fundamental traits and types of the service layer

pub mod auth;
pub mod entity;
pub mod error;
pub mod events;
pub mod extractors;
pub mod field;
pub mod params;
pub mod query;
pub mod service;
pub mod store;

pub use auth::{AdminRoles, Capability, Claims, Principal};
pub use entity::{Entity, MemberOwned};
pub use error::{ServiceError, ServiceResult};
pub use field::FieldValue;
pub use service::EntityStore;
