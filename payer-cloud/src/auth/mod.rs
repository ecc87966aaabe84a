//! Authentication

pub mod customer_auth;

pub use customer_auth::{CustomerIdentity, customer_auth_middleware, optional_customer_auth_middleware};
