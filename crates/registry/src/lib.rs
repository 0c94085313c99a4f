//! # Registry
//!
//! Frontend targets, secret resolution and cache-tag derivation.
//!
//! - `FrontendRegistry` lists configured frontends (never fails; falls back to
//!   the legacy `default` target) and resolves secret references
//! - `SecretStore` backends: none, environment, directory of files
//! - `tags_for_entity` maps a changed entity to its cache tags

mod frontends;
mod secrets;
mod tags;

pub use frontends::{FileFrontends, FrontendRegistry, StaticFrontends};
pub use secrets::{secret_store_from_config, EnvSecretStore, FileSecretStore, NoopSecretStore};
pub use tags::{tags_for, tags_for_entity};
