pub mod application;
pub mod identity;
pub mod role_marker;
