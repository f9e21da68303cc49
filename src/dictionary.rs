use std::collections::HashMap;

/// A bidirectional map between strings and dense integer ids
///
/// Ids are assigned in insertion order starting at zero, so they can index
/// rows and columns of the count and probability tables directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    str_to_id: HashMap<String, u32>,
    id_to_str: Vec<String>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.id_to_str.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_str.is_empty()
    }

    /// Returns the id of `s`, assigning the next free id if it is new
    pub fn get_or_insert(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.str_to_id.get(s) {
            id
        } else {
            let id = self.id_to_str.len() as u32;
            self.str_to_id.insert(s.to_string(), id);
            self.id_to_str.push(s.to_string());
            id
        }
    }

    /// Looks up the id of `s` without inserting it
    pub fn get(&self, s: &str) -> Option<u32> {
        self.str_to_id.get(s).copied()
    }

    /// Looks up the string stored under `id`
    pub fn get_name(&self, id: u32) -> Option<&str> {
        self.id_to_str.get(id as usize).map(String::as_str)
    }

    /// Iterate over all (string, id) pairs in id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.id_to_str
            .iter()
            .enumerate()
            .map(|(id, s)| (s.as_str(), id as u32))
    }
}
