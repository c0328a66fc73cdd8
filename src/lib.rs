pub mod analysis;
pub mod config;
pub mod media;
pub mod pipeline;
pub mod profiles;
pub mod report;
pub mod transcribe;

pub const APP_NAME: &str = "meetscribe";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

use tracing_subscriber::EnvFilter;

/// Default log filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "meetscribe=info"
}

/// Initialize tracing for binaries and embedders.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_log_filter())),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_is_meetscribe() {
        assert_eq!(APP_NAME, "meetscribe");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }
}
