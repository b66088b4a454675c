//! Authentication and authorization core of a multi-tenant deployment API
//! server.
//!
//! For every inbound request this crate decides who is making it and what
//! they may do: bearer tokens are located among several transport locations
//! (including chunked cookies), verified against either the server's own
//! signing key or a federated identity provider, and the resulting claims
//! are checked against a project-scoped, revocable rule set.
//!
//! The transport framework, TLS and resource storage are external
//! collaborators; they interact with this core through
//! [`server::metadata::RequestMetadata`] and [`server::store::ProjectStore`].

pub mod logs;
pub mod server;
pub mod types;
