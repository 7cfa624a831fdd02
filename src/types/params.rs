//! Ordered multi-value parameter map.
//!
//! Used for query parameters and form bodies. Keys keep their first insertion
//! position; each key holds one or more values.

use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterMap {
    entries: Vec<(String, Vec<String>)>,
}

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// Replace every value of `key` with `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(i) => self.entries[i].1 = vec![value],
            None => self.entries.push((key, vec![value])),
        }
        self
    }

    /// Add `value` after any existing values of `key`.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(i) => self.entries[i].1.push(value),
            None => self.entries.push((key, vec![value])),
        }
        self
    }

    /// Replace-by-key merge: every key of `other` replaces this map's values
    /// for that key with all of `other`'s values. Other keys are untouched.
    pub fn set_all(&mut self, other: &ParameterMap) -> &mut Self {
        for (key, values) in &other.entries {
            match self.position(key) {
                Some(i) => self.entries[i].1 = values.clone(),
                None => self.entries.push((key.clone(), values.clone())),
            }
        }
        self
    }

    /// Append every pair of `other`.
    pub fn append_all(&mut self, other: &ParameterMap) -> &mut Self {
        for (key, value) in other.iter() {
            self.append(key, value);
        }
        self
    }

    /// First value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.position(key)
            .and_then(|i| self.entries[i].1.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, key: &str) -> Option<&[String]> {
        self.position(key).map(|i| self.entries[i].1.as_slice())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.position(key).map(|i| self.entries.remove(i).1)
    }

    pub fn has_value(&self, value: &str) -> bool {
        self.entries
            .iter()
            .any(|(_, values)| values.iter().any(|v| v == value))
    }

    /// Remove the first occurrence of `value` under any key.
    pub fn delete_value(&mut self, value: &str) -> bool {
        for (_, values) in &mut self.entries {
            if let Some(i) = values.iter().position(|v| v == value) {
                values.remove(i);
                return true;
            }
        }
        false
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Flattened `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(k, values)| values.iter().map(move |v| (k.as_str(), v.as_str())))
    }

    /// JSON object: single values become strings, repeated ones arrays.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::with_capacity(self.entries.len());
        for (key, values) in &self.entries {
            let value = match values.as_slice() {
                [single] => Value::String(single.clone()),
                many => Value::Array(many.iter().cloned().map(Value::String).collect()),
            };
            obj.insert(key.clone(), value);
        }
        Value::Object(obj)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.append(k, v);
        }
        map
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for ParameterMap {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for ParameterMap {
    fn from(pairs: Vec<(K, V)>) -> Self {
        pairs.into_iter().collect()
    }
}
