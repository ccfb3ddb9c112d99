// Core moderation module - the provider fallback pipeline.
// Models, the provider port, the parser and the service that ties them together.

pub mod moderation_models;
pub mod moderation_provider;
pub mod moderation_service;
pub mod response_parser;

pub use moderation_models::*;
pub use moderation_provider::*;
pub use moderation_service::*;
