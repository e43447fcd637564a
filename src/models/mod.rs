pub mod block;
pub mod fee;
pub mod matrix;

pub use block::{CandidateAmount, CaseInfo, Provenance, RawTextBlock};
pub use fee::{
    format_dollars, normalize_text, Approval, DedupKey, DroppedDuplicate, FeeRecord, FeeTable,
    FeeTables, MatchedAs, SourceSummary,
};
pub use matrix::{
    EntityTable, FeeDetailRow, FeeDetailTable, FeeMatrixRecord, MissReason, ResolveOutcome,
    SchemaMap, TableRole,
};
