//! Route handlers: JSON API under `/api` and the HTML pages.

pub mod auth;
pub mod health;
pub mod pages;
pub mod profiles;
pub mod users;
