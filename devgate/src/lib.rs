//! devgate - local API gateway and CDN emulator
//!
//! Serves a serverless app's API definitions on a local port, running each
//! handler in a sandbox with the credentials of its deployed execution role,
//! and serves or proxies the app's static assets.

pub mod app;
pub mod assets;
pub mod config;
pub mod router;

pub use app::{aws_sdk_config, build_state};
pub use assets::{AssetsProxy, AssetsSource};
pub use config::{Config, RootOrigin};
pub use router::{create_router, AppState, Routing};
