pub mod rate_limit;
pub mod request;
pub mod service;

pub use rate_limit::RateLimiter;
pub use request::SubmitRequest;
pub use service::{AttestConfig, AttestService, ChallengeResponse, SubmitOutcome};
