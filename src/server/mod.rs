pub mod authn;
pub mod authz;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod factory;
pub mod metadata;
pub mod store;
