pub mod access_gate;
pub mod auth;
pub mod response;

pub use access_gate::{access_gate_middleware, AccessGate, GateDecision, RouteCategory, RouteClass, RouteRule};
pub use auth::{has_role, is_admin, AuthSession, MaybeSession};
pub use response::{ApiResponse, ApiResult};
