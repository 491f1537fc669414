pub mod app;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod logging;
pub mod middleware;
pub mod onboarding;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;
