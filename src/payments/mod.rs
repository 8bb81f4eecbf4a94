//! QRIS payment gateway client
//!
//! Creates signed payment intents and polls transaction status against the
//! external provider.

pub mod error;
pub mod gateway;
pub mod types;

pub use error::{GatewayError, GatewayResult};
pub use gateway::QrisGateway;
pub use types::{GatewayPaymentStatus, LineItem, PaymentIntent};
