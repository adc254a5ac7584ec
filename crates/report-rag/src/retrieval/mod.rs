//! Dual-store index: surrogates are searched, original elements are returned

mod binding;
mod payload_store;
mod persistence;
mod search_store;
mod snapshot;

pub use binding::{IndexInput, RetrieverBinding};
pub use payload_store::{PayloadStore, StoredElement};
pub use persistence::SnapshotFile;
pub use search_store::{cosine_similarity, SearchHit, SearchStore, SurrogateRecord};
pub use snapshot::{IndexSnapshot, SnapshotMeta};
