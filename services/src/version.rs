//! Build information embedded by `build.rs`.
//!
//! Version display format:
//! - Local/Test: `main:{commit}`
//! - Prod: `stable:{version}`

use crate::config::Env;

pub const BUILD_DATE: &str = env!("BUILD_DATE");
pub const BUILD_COMMIT: &str = env!("BUILD_COMMIT");
pub const BUILD_BRANCH: &str = env!("BUILD_BRANCH");
pub const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Format the version string advertised for a runtime environment.
pub fn format_version(env: &Env) -> String {
    match env {
        Env::Local | Env::Test => format!("main:{BUILD_COMMIT}"),
        Env::Prod => format!("stable:{BUILD_VERSION}"),
    }
}
