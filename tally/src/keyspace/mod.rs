pub mod memory;

pub use memory::{MemoryKeyspace, Transaction};

use crate::error::Error;

/// Primitive operations a store exposes to its procedures.
///
/// Three kinds of value live under a key: a set of strings, a hash of
/// field to integer, and a single integer counter. Using an operation of one
/// kind on a key holding another kind fails with [`Error::WrongType`]. Missing
/// keys read as empty. Sets and hashes that become empty are removed.
pub trait Keyspace {
    /// Members of the set at `key`, in lexicographic order
    fn members(&self, key: &str) -> Result<Vec<String>, Error>;

    /// Adds `member` to the set at `key`. Returns `true` if it was not present
    fn add_member(&mut self, key: &str, member: &str) -> Result<bool, Error>;

    /// Removes `member` from the set at `key`. Returns `true` if it was present
    fn remove_member(&mut self, key: &str, member: &str) -> Result<bool, Error>;

    /// Value of `field` in the hash at `key`
    fn field(&self, key: &str, field: &str) -> Result<Option<i64>, Error>;

    /// Adds `delta` to `field` in the hash at `key`, returning the new value
    fn increment_field(&mut self, key: &str, field: &str, delta: i64) -> Result<i64, Error>;

    /// Removes `field` from the hash at `key`. Returns `true` if it was present
    fn remove_field(&mut self, key: &str, field: &str) -> Result<bool, Error>;

    /// Every value stored in the hash at `key`
    fn field_values(&self, key: &str) -> Result<Vec<i64>, Error>;

    /// Value of the counter at `key`
    fn counter(&self, key: &str) -> Result<Option<i64>, Error>;

    /// Overwrites the counter at `key`
    fn set_counter(&mut self, key: &str, value: i64) -> Result<(), Error>;

    /// Adds `delta` to the counter at `key`, returning the new value
    fn increment_counter(&mut self, key: &str, delta: i64) -> Result<i64, Error>;

    /// Removes `key` whatever it holds. Returns `true` if it existed
    fn delete(&mut self, key: &str) -> Result<bool, Error>;
}
