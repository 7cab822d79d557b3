pub mod apis;
pub mod config;
pub mod constants;
pub mod error;
pub mod extract;
pub mod logging;
pub mod matcher;
pub mod metrics;
pub mod normalize;
pub mod notifier;
pub mod pdf;
pub mod pipeline;
pub mod reconstruct;
pub mod storage;
pub mod transport;
pub mod types;
