pub mod auth;
pub mod cache;
pub mod contacts;
pub mod form;
pub mod search;
pub mod validation;
