pub mod sync {
    pub use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
    pub use std::sync::Arc;
}

pub mod classifier;
pub mod config;
pub mod error;
pub mod keyspace;
pub mod namespace;
pub mod procedure;
pub mod store;
pub mod tokenizer;

pub use classifier::{Classifier, ClassifierBuilder};
pub use namespace::Namespace;
pub use procedure::Procedure;
pub use store::{Reply, Store};
pub use tokenizer::{TokenCounts, Tokenizer, WordTokenizer};

pub trait Extension {
    /// Returns an id of the extension. Should be the crate name (eg in a `tally-store-ext` format)
    fn id(&self) -> String;

    /// Returns the name of an extension
    fn name(&self) -> String;

    /// Returns the description of the extension
    fn description(&self) -> String {
        format!(
            "{} is an extension that is designed to be used as a classifier store",
            self.name()
        )
    }
}
