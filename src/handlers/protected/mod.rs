// handlers/protected/mod.rs - Protected handlers (valid session required)
//
// Security Level: Session token (Bearer header or session cookie)
// Routes: /dashboard, /api/onboarding/*, /api/auth/*
// Middleware: access gate redirects page routes; API handlers extract the session themselves

pub mod dashboard;
pub mod onboarding;
pub mod whoami;

pub use dashboard::dashboard_get;
pub use onboarding::complete_post;
pub use whoami::whoami_get;
