//! Runtime registries for mark and inline-component kinds.
//!
//! Entries are data only. Behaviour (rendering, matching) belongs to
//! whoever looks an entry up by name.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::{Attributes, CORE_AUTHORITY, InlineComponent, Mark};

pub trait Registered {
    fn name(&self) -> &str;
}

/// Name-keyed, cheaply cloneable set of registered entries.
#[derive(Debug, Clone)]
pub struct Registry<T> {
    entries: BTreeMap<String, Arc<T>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T: Registered> Registry<T> {
    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.get(name).map(|entry| &**entry)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.values().map(|entry| &**entry)
    }

    /// Copy with `entry` added, replacing any entry of the same name.
    pub fn with(&self, entry: T) -> Registry<T> {
        let mut entries = self.entries.clone();
        entries.insert(entry.name().to_string(), Arc::new(entry));
        Registry { entries }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkSpec {
    pub name: String,
    #[serde(default = "default_authority")]
    pub authority: String,
    /// Higher priority marks nest outside lower ones when rendered through
    /// [`Notation::with_marks`](crate::notation::Notation::with_marks).
    #[serde(default)]
    pub priority: i32,
}

fn default_authority() -> String {
    CORE_AUTHORITY.to_string()
}

impl MarkSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            authority: default_authority(),
            priority: 0,
        }
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn mark(&self) -> Mark {
        Mark::new(self.name.clone()).with_authority(self.authority.clone())
    }
}

impl Registered for MarkSpec {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    #[serde(default)]
    pub default_props: Attributes,
}

impl ComponentSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_props: Attributes::new(),
        }
    }

    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_props.insert(key.into(), value.into());
        self
    }

    /// A component instance; `props` override the defaults.
    pub fn instantiate(&self, props: Attributes) -> InlineComponent {
        let mut merged = self.default_props.clone();
        merged.extend(props);
        InlineComponent::new(self.name.clone(), merged)
    }
}

impl Registered for ComponentSpec {
    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_registry_is_persistent() {
        let empty: Registry<MarkSpec> = Registry::default();
        let one = empty.with(MarkSpec::new("bold"));
        let two = one.with(MarkSpec::new("bold").with_priority(5));

        assert!(empty.is_empty());
        assert_eq!(one.get("bold").map(|spec| spec.priority), Some(0));
        assert_eq!(two.get("bold").map(|spec| spec.priority), Some(5));
        assert_eq!(two.len(), 1);
    }

    #[test]
    fn test_mark_spec_carries_authority() {
        let spec = MarkSpec::new("comment").with_authority("review");
        let mark = spec.mark();
        assert_eq!(mark.authority, "review");
        assert_eq!(mark.name, "comment");
    }

    #[test]
    fn test_component_defaults_are_overridable() {
        let spec = ComponentSpec::new("mention")
            .with_default("kind", "user")
            .with_default("id", "0");
        let mut props = Attributes::new();
        props.insert("id".to_string(), "42".to_string());

        let component = spec.instantiate(props);
        assert_eq!(component.name(), "mention");
        assert_eq!(component.prop("kind"), Some("user"));
        assert_eq!(component.prop("id"), Some("42"));
    }
}
