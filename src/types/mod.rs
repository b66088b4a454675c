pub mod claims;
pub mod project;
