use std::collections::{hash_map::Entry, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::Keyspace;
use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    Set(BTreeSet<String>),
    Hash(HashMap<String, i64>),
    Counter(i64),
}

/// In-memory [`Keyspace`].
///
/// Not synchronized. Whoever owns it is responsible for running one procedure
/// at a time, usually through [`MemoryKeyspace::atomically`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryKeyspace {
    entries: HashMap<String, Value>,
}

impl MemoryKeyspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys = self.entries.keys().cloned().collect::<Vec<_>>();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs `f` against a journaled view of the keyspace.
    ///
    /// If `f` fails, every write it made is undone before the error is returned.
    pub fn atomically<F, T>(&mut self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, Error>,
    {
        let mut transaction = Transaction {
            keyspace: self,
            undo: HashMap::new(),
        };
        match f(&mut transaction) {
            Ok(value) => Ok(value),
            Err(e) => {
                transaction.rollback();
                Err(e)
            }
        }
    }

    fn set(&self, key: &str) -> Result<Option<&BTreeSet<String>>, Error> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Value::Set(set)) => Ok(Some(set)),
            Some(_) => Err(wrong_type(key)),
        }
    }

    fn hash(&self, key: &str) -> Result<Option<&HashMap<String, i64>>, Error> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Value::Hash(hash)) => Ok(Some(hash)),
            Some(_) => Err(wrong_type(key)),
        }
    }
}

fn wrong_type(key: &str) -> Error {
    Error::WrongType {
        key: key.to_string(),
    }
}

fn overflow(key: &str) -> Error {
    Error::InvalidArguments(format!("increment of {key} overflows"))
}

impl Keyspace for MemoryKeyspace {
    fn members(&self, key: &str) -> Result<Vec<String>, Error> {
        Ok(self
            .set(key)?
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn add_member(&mut self, key: &str, member: &str) -> Result<bool, Error> {
        match self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Value::Set(BTreeSet::new()))
        {
            Value::Set(set) => Ok(set.insert(member.to_string())),
            _ => Err(wrong_type(key)),
        }
    }

    fn remove_member(&mut self, key: &str, member: &str) -> Result<bool, Error> {
        let (removed, now_empty) = match self.entries.get_mut(key) {
            None => return Ok(false),
            Some(Value::Set(set)) => (set.remove(member), set.is_empty()),
            Some(_) => return Err(wrong_type(key)),
        };
        if now_empty {
            self.entries.remove(key);
        }
        Ok(removed)
    }

    fn field(&self, key: &str, field: &str) -> Result<Option<i64>, Error> {
        Ok(self.hash(key)?.and_then(|hash| hash.get(field).copied()))
    }

    fn increment_field(&mut self, key: &str, field: &str, delta: i64) -> Result<i64, Error> {
        match self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Value::Hash(HashMap::new()))
        {
            Value::Hash(hash) => {
                let value = hash.entry(field.to_string()).or_insert(0);
                *value = value.checked_add(delta).ok_or_else(|| overflow(key))?;
                Ok(*value)
            }
            _ => Err(wrong_type(key)),
        }
    }

    fn remove_field(&mut self, key: &str, field: &str) -> Result<bool, Error> {
        let (removed, now_empty) = match self.entries.get_mut(key) {
            None => return Ok(false),
            Some(Value::Hash(hash)) => (hash.remove(field).is_some(), hash.is_empty()),
            Some(_) => return Err(wrong_type(key)),
        };
        if now_empty {
            self.entries.remove(key);
        }
        Ok(removed)
    }

    fn field_values(&self, key: &str) -> Result<Vec<i64>, Error> {
        Ok(self
            .hash(key)?
            .map(|hash| hash.values().copied().collect())
            .unwrap_or_default())
    }

    fn counter(&self, key: &str) -> Result<Option<i64>, Error> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Value::Counter(value)) => Ok(Some(*value)),
            Some(_) => Err(wrong_type(key)),
        }
    }

    fn set_counter(&mut self, key: &str, value: i64) -> Result<(), Error> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut entry) => match entry.get_mut() {
                Value::Counter(current) => *current = value,
                _ => return Err(wrong_type(key)),
            },
            Entry::Vacant(entry) => {
                entry.insert(Value::Counter(value));
            }
        }
        Ok(())
    }

    fn increment_counter(&mut self, key: &str, delta: i64) -> Result<i64, Error> {
        match self
            .entries
            .entry(key.to_string())
            .or_insert(Value::Counter(0))
        {
            Value::Counter(current) => {
                *current = current.checked_add(delta).ok_or_else(|| overflow(key))?;
                Ok(*current)
            }
            _ => Err(wrong_type(key)),
        }
    }

    fn delete(&mut self, key: &str) -> Result<bool, Error> {
        Ok(self.entries.remove(key).is_some())
    }
}

/// Journaled view over a [`MemoryKeyspace`].
///
/// The first write to each key records the value it held beforehand so the
/// whole transaction can be undone.
pub struct Transaction<'a> {
    keyspace: &'a mut MemoryKeyspace,
    undo: HashMap<String, Option<Value>>,
}

impl Transaction<'_> {
    fn record(&mut self, key: &str) {
        if !self.undo.contains_key(key) {
            let previous = self.keyspace.entries.get(key).cloned();
            self.undo.insert(key.to_string(), previous);
        }
    }

    fn rollback(self) {
        for (key, previous) in self.undo {
            match previous {
                Some(value) => {
                    self.keyspace.entries.insert(key, value);
                }
                None => {
                    self.keyspace.entries.remove(&key);
                }
            }
        }
    }
}

impl Keyspace for Transaction<'_> {
    fn members(&self, key: &str) -> Result<Vec<String>, Error> {
        self.keyspace.members(key)
    }

    fn add_member(&mut self, key: &str, member: &str) -> Result<bool, Error> {
        self.record(key);
        self.keyspace.add_member(key, member)
    }

    fn remove_member(&mut self, key: &str, member: &str) -> Result<bool, Error> {
        self.record(key);
        self.keyspace.remove_member(key, member)
    }

    fn field(&self, key: &str, field: &str) -> Result<Option<i64>, Error> {
        self.keyspace.field(key, field)
    }

    fn increment_field(&mut self, key: &str, field: &str, delta: i64) -> Result<i64, Error> {
        self.record(key);
        self.keyspace.increment_field(key, field, delta)
    }

    fn remove_field(&mut self, key: &str, field: &str) -> Result<bool, Error> {
        self.record(key);
        self.keyspace.remove_field(key, field)
    }

    fn field_values(&self, key: &str) -> Result<Vec<i64>, Error> {
        self.keyspace.field_values(key)
    }

    fn counter(&self, key: &str) -> Result<Option<i64>, Error> {
        self.keyspace.counter(key)
    }

    fn set_counter(&mut self, key: &str, value: i64) -> Result<(), Error> {
        self.record(key);
        self.keyspace.set_counter(key, value)
    }

    fn increment_counter(&mut self, key: &str, delta: i64) -> Result<i64, Error> {
        self.record(key);
        self.keyspace.increment_counter(key, delta)
    }

    fn delete(&mut self, key: &str) -> Result<bool, Error> {
        self.record(key);
        self.keyspace.delete(key)
    }
}
