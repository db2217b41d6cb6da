pub mod composer;
pub mod config;
pub mod dedup;
pub mod error;
pub mod gap_fill;
pub mod narrative;
pub mod quality;
pub mod select;
pub mod types;
pub mod window;

pub use composer::DigestComposer;
pub use config::DigestConfig;
pub use error::{ComposeError, FetchStage};
pub use types::{ComposeRequest, DigestInsight, DigestMetrics, DigestPayload};
