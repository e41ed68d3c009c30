use crate::error::{BlastError, Result};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Phone number -> delivered flag, in the order the numbers were first seen.
///
/// The order is part of the contract: campaigns contact numbers in the order
/// they appear in the state file, and persisting writes them back in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryRegistry {
    order: Vec<String>,
    states: HashMap<String, bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistrySummary {
    pub total: usize,
    pub sent: usize,
    pub pending: usize,
}

impl DeliveryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the state for `number`. New numbers are appended; existing ones keep
    /// their position.
    pub fn insert(&mut self, number: impl Into<String>, delivered: bool) {
        let number = number.into();
        if self.states.insert(number.clone(), delivered).is_none() {
            self.order.push(number);
        }
    }

    pub fn get(&self, number: &str) -> Option<bool> {
        self.states.get(number).copied()
    }

    /// Flip `number` to delivered. Returns false if the number is unknown.
    pub fn mark_sent(&mut self, number: &str) -> bool {
        match self.states.get_mut(number) {
            Some(state) => {
                *state = true;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> + '_ {
        self.order
            .iter()
            .map(move |n| (n.as_str(), self.states.get(n).copied().unwrap_or(false)))
    }

    /// Numbers still waiting for a confirmed send, in registry order.
    pub fn pending(&self) -> Vec<String> {
        self.iter()
            .filter(|(_, delivered)| !delivered)
            .map(|(n, _)| n.to_string())
            .collect()
    }

    pub fn summary(&self) -> RegistrySummary {
        let sent = self.iter().filter(|(_, delivered)| *delivered).count();
        RegistrySummary {
            total: self.len(),
            sent,
            pending: self.len() - sent,
        }
    }

    /// Read a state file without side effects. Missing or malformed files are
    /// [`BlastError::StateFile`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(BlastError::state_file(path, "file not found"));
        }
        let data = std::fs::read_to_string(path).map_err(|e| BlastError::state_file(path, e))?;
        Self::from_json(&data).map_err(|e| BlastError::state_file(path, e))
    }

    pub fn from_json(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }

    /// Pretty JSON with four-space indentation, keys in registry order.
    pub fn to_pretty_json(&self) -> serde_json::Result<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        Ok(buf)
    }
}

impl Serialize for DeliveryRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (number, delivered) in self.iter() {
            map.serialize_entry(number, &delivered)?;
        }
        map.end()
    }
}

struct RegistryVisitor;

impl<'de> Visitor<'de> for RegistryVisitor {
    type Value = DeliveryRegistry;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object mapping phone numbers to delivery states")
    }

    fn visit_map<A: MapAccess<'de>>(
        self,
        mut access: A,
    ) -> std::result::Result<Self::Value, A::Error> {
        let mut registry = DeliveryRegistry::new();
        while let Some((number, delivered)) = access.next_entry::<String, bool>()? {
            registry.insert(number, delivered);
        }
        Ok(registry)
    }
}

impl<'de> Deserialize<'de> for DeliveryRegistry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(RegistryVisitor)
    }
}
