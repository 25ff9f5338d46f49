use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

const LABELS_SUFFIX: &str = "labels";
const TALLY_PREFIX: &str = "tally_for:";

/// Prefix applied to every key owned by one classifier instance.
///
/// Classifiers sharing a store must use disjoint namespaces. The layout is:
///
/// - `<namespace>labels`: set of active labels
/// - `<namespace><label>`: token table of `label`
/// - `<namespace>tally_for:<label>`: tally of `label`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    pub fn new<S: Into<String>>(namespace: S) -> Result<Self, Error> {
        let namespace = namespace.into();
        if namespace.is_empty() {
            return Err(Error::NamespaceRequired);
        }
        Ok(Namespace(namespace))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key of the label set
    pub fn labels_key(&self) -> String {
        format!("{}{LABELS_SUFFIX}", self.0)
    }

    /// Key of the token table belonging to `label`
    pub fn table_key(&self, label: &str) -> String {
        format!("{}{label}", self.0)
    }

    /// Key of the tally belonging to `label`
    pub fn tally_key(&self, label: &str) -> String {
        format!("{}{TALLY_PREFIX}{label}", self.0)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Namespace {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Namespace::new(value)
    }
}

impl TryFrom<&str> for Namespace {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Namespace::new(value)
    }
}

impl From<Namespace> for String {
    fn from(namespace: Namespace) -> Self {
        namespace.0
    }
}

#[cfg(test)]
mod test {
    use super::Namespace;
    use crate::error::Error;

    #[test]
    fn key_layout() -> anyhow::Result<()> {
        let ns = Namespace::new("bayes:")?;
        assert_eq!(ns.labels_key(), "bayes:labels");
        assert_eq!(ns.table_key("spam"), "bayes:spam");
        assert_eq!(ns.tally_key("spam"), "bayes:tally_for:spam");
        Ok(())
    }

    #[test]
    fn empty_namespace_is_rejected() {
        assert!(matches!(Namespace::new(""), Err(Error::NamespaceRequired)));
        assert!(serde_json::from_str::<Namespace>("\"\"").is_err());
    }
}
