pub mod enforcer;
pub mod policy;
pub mod registry;
pub mod store;
pub mod update;
