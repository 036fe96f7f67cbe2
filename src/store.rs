//! Sources of raw template values.

use std::collections::BTreeMap;

use crate::template::TemplateRecord;

/// A source of template records, such as the machine's template cache.
pub trait TemplateStore {
    /// Returns the record of the named template, if there is one.
    fn record(&self, name: &str) -> Option<TemplateRecord>;

    /// Returns the names of every template in the store.
    fn template_names(&self) -> Vec<String>;
}

/// An in-memory [`TemplateStore`], keyed by template name.
///
/// Like the registry it stands in for, names are matched without regard to
/// ASCII case when there's no exact match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MemoryStore {
    records: BTreeMap<String, TemplateRecord>,
}

impl MemoryStore {
    /// Adds a template, returning the record it replaced.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        record: TemplateRecord,
    ) -> Option<TemplateRecord> {
        self.records.insert(name.into(), record)
    }

    /// The number of templates in the store.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the store holds no templates.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<(String, TemplateRecord)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (String, TemplateRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl TemplateStore for MemoryStore {
    fn record(&self, name: &str) -> Option<TemplateRecord> {
        self.records
            .get(name)
            .or_else(|| {
                self.records
                    .iter()
                    .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
                    .map(|(_, record)| record)
            })
            .cloned()
    }

    fn template_names(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(display_name: &str) -> TemplateRecord {
        TemplateRecord {
            display_name: display_name.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_record_lookup() {
        let store = [
            ("WebServer".to_string(), record("Web Server")),
            ("webserver".to_string(), record("Lowercase")),
            ("User".to_string(), record("User")),
        ]
        .into_iter()
        .collect::<MemoryStore>();

        assert_eq!(store.len(), 3);
        assert_eq!(store.record("WebServer").unwrap().display_name, "Web Server");
        assert_eq!(store.record("webserver").unwrap().display_name, "Lowercase");
        assert_eq!(store.record("USER").unwrap().display_name, "User");
        assert!(store.record("Machine").is_none());
    }

    #[test]
    fn test_template_names() {
        let mut store = MemoryStore::default();
        assert!(store.is_empty());

        store.insert("User", record("User"));
        store.insert("Machine", record("Computer"));
        assert!(store.insert("User", record("User v2")).is_some());

        assert_eq!(store.template_names(), ["Machine", "User"]);
    }
}
