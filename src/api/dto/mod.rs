//! Data Transfer Objects for REST request/response serialization.

pub mod event_dto;
pub mod user_dto;

pub use event_dto::*;
pub use user_dto::*;
