//! # nextgisweb-test
//!
//! Helpers for integration tests of nextgisweb applications.
//!
//! - [`client`] - [`TestClient`], which drives an axum router in-process
//! - [`fixtures`] - Scratch settings and authentication cookies

#![allow(clippy::result_large_err)]

pub mod client;
pub mod fixtures;

pub use client::{TestClient, TestResponse};
pub use fixtures::{auth_cookie, TestSettings, TEST_SECRET};
