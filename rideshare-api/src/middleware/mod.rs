pub mod auth;
pub mod resiliency;

pub use auth::{auth_middleware, issue_token, Claims};
pub use resiliency::{BreakerNotifier, CircuitBreaker, CircuitState};
