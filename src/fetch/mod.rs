/// Getting raw files onto disk: HTTP download with bounded retries, then
/// archive extraction filtered by member name.
pub mod archive;
pub mod download;

pub use archive::{extract, ArchiveKind, ExtractReport};
pub use download::{Fetcher, RetryPolicy};
