pub mod backend;
pub mod circuit_breaker;
pub mod payment;

pub use backend::BackendClient;
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use payment::PaymentService;
