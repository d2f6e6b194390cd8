pub mod persist;

pub use persist::{warm_start, CachePersister, EntryKind, PersistHandle, PersistOp};
