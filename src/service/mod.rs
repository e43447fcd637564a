pub mod classifier;
pub mod dedup;
pub mod extractor;
pub mod fee_matrix;
pub mod pipeline;
pub mod session;

pub use classifier::{FeeClassifier, WhitelistMatch};
pub use dedup::{DedupOutcome, Deduplicator};
pub use extractor::{PatternFamily, TextFeeExtractor};
pub use fee_matrix::FeeMatrixResolver;
pub use pipeline::FeePipeline;
pub use session::FeeSession;
