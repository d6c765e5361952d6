mod rate_limit;
mod request_id;

pub use rate_limit::{RateLimiter, rate_limit_middleware};
pub use request_id::{RequestId, request_id_middleware};
