// handlers/elevated/mod.rs - Elevated handlers (admin role required)
//
// Security Level: Session whose claims carry `role: admin`, re-checked against
// the provider's current metadata before anything is served
// Routes: /admin*

pub mod admin;

pub use admin::admin_get;
