//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID
//! 4. Session layer (tower-sessions, signed cookie)
//! 5. Access gate (admission per navigation)

pub mod auth;
pub mod guard;
pub mod request_id;
pub mod session;

pub use auth::{AuthRejection, RequireSession, Sessions, is_api_path};
pub use guard::access_gate_middleware;
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
