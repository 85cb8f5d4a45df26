pub mod arch_profiles;
pub mod checks;
pub mod device_age;
pub mod validator;

pub use checks::{CheckResult, FingerprintChecks};
pub use validator::{validate, ValidationOutcome};
