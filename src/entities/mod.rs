//! Stored entities of the member service

pub mod macros;
pub mod member;
pub mod member_trait;

pub use member::{Address, Member};
pub use member_trait::MemberTrait;
