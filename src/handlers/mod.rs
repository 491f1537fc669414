// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (no session) → Protected (valid session) → Elevated (admin role).
// Tiers are enforced by the access gate before any handler here runs; handlers
// only re-check what the gate cannot see (current provider metadata).
pub mod public;    // Tier 1: /, /health, /sign-in, signed provider webhooks
pub mod protected; // Tier 2: /dashboard, /api/onboarding/*, /api/auth/*
pub mod elevated;  // Tier 3: /admin
