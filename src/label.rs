use std::fmt;

use crate::dictionary::Dictionary;
use crate::error::{Error, Result};

/// Name of the sentinel label preceding every sequence
pub const START: &str = "START";
/// Name of the sentinel label following every sequence
pub const STOP: &str = "STOP";

/// A label of a closed [`LabelSet`], stored as its dense index
///
/// Indices `0` and `1` are reserved for the `START` and `STOP` sentinels;
/// domain labels follow in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label(u32);

impl Label {
    pub const START: Label = Label(0);
    pub const STOP: Label = Label(1);

    pub(crate) const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Dense index of the label
    #[inline]
    pub const fn id(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns `true` for `START` and `STOP`
    #[inline]
    pub const fn is_sentinel(self) -> bool {
        self.0 < 2
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The closed enumeration of labels shared by counting, estimation and decoding
///
/// The set is fixed at construction; looking up a name outside of it is an
/// error rather than an insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSet {
    names: Dictionary,
}

impl LabelSet {
    /// Create a label set from domain label names
    pub fn new<I, S>(domain: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names = Dictionary::new();
        names.get_or_insert(START);
        names.get_or_insert(STOP);
        for name in domain {
            let name = name.as_ref();
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                return Err(Error::invalid_argument(format!(
                    "invalid label name: {:?}",
                    name
                )));
            }
            if name == START || name == STOP {
                return Err(Error::invalid_argument(format!(
                    "{} is a reserved label name",
                    name
                )));
            }
            let before = names.len();
            names.get_or_insert(name);
            if names.len() == before {
                return Err(Error::invalid_argument(format!(
                    "duplicate label: {}",
                    name
                )));
            }
        }
        if names.len() == 2 {
            return Err(Error::invalid_argument(
                "label set requires at least one domain label",
            ));
        }
        Ok(Self { names })
    }

    /// Create a BIO label set: `O` followed by `B-<class>` and `I-<class>` for each class
    pub fn bio<I, S>(classes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut domain = vec!["O".to_string()];
        for class in classes {
            let class = class.as_ref();
            domain.push(format!("B-{}", class));
            domain.push(format!("I-{}", class));
        }
        Self::new(domain)
    }

    /// Total number of labels, sentinels included
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always `false`; a label set holds at least the sentinels and one domain label
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Number of domain (emitting) labels
    pub fn num_domain(&self) -> usize {
        self.names.len() - 2
    }

    /// Resolve a label name
    pub fn get(&self, name: &str) -> Result<Label> {
        self.names
            .get(name)
            .map(Label)
            .ok_or_else(|| Error::UnknownLabel(name.to_string()))
    }

    /// Label from a dense id, if it belongs to this set
    pub fn label(&self, id: u32) -> Option<Label> {
        if (id as usize) < self.len() {
            Some(Label(id))
        } else {
            None
        }
    }

    /// Name of a label, `None` if it is not part of this set
    pub fn get_name(&self, label: Label) -> Option<&str> {
        self.names.get_name(label.0)
    }

    /// Name of a label
    ///
    /// # Panics
    ///
    /// Panics if `label` is not part of this set, see [`LabelSet::get_name`].
    pub fn name(&self, label: Label) -> &str {
        match self.get_name(label) {
            Some(name) => name,
            None => panic!("label {} is not part of this label set", label),
        }
    }

    /// Domain labels in enumeration order
    pub fn domain(&self) -> impl Iterator<Item = Label> + Clone {
        (2..self.len() as u32).map(Label)
    }

    /// All labels, sentinels first
    pub fn iter(&self) -> impl Iterator<Item = Label> + Clone {
        (0..self.len() as u32).map(Label)
    }

    pub(crate) fn names(&self) -> &Dictionary {
        &self.names
    }
}

impl Default for LabelSet {
    /// The sentiment BIO set: `O`, `B-positive`, `I-positive`, `B-neutral`,
    /// `I-neutral`, `B-negative`, `I-negative`
    fn default() -> Self {
        let mut names = Dictionary::new();
        for name in [
            START,
            STOP,
            "O",
            "B-positive",
            "I-positive",
            "B-neutral",
            "I-neutral",
            "B-negative",
            "I-negative",
        ] {
            names.get_or_insert(name);
        }
        Self { names }
    }
}
