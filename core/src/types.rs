//! Shared primitive types used across the ingestion core.

/// Synthetic per-record identifier (`row_<index>_<stamp>`).
pub type RecordId = String;

/// Identifier of one immutable dataset version (uuid v4).
pub type VersionId = String;

/// Partner code sentinel for rows without a community.
/// Not a real community: excluded from every community count.
pub const UNKNOWN_PARTNER: &str = "UNKNOWN";
