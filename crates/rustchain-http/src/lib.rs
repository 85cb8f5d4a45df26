pub mod admin;
pub mod error;
pub mod json;
pub mod net;
pub mod routes;
pub mod server;
pub mod state;

pub use server::build_router;
pub use state::{AppState, ConfigSnapshot};

pub(crate) fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs() as i64
}
