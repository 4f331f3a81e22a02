use std::collections::HashMap;

/// Translation key for the header title at the top of the tree.
pub const ROOT_TITLE: &str = "root-title";
/// Translation key for the placeholder shown in an empty column.
pub const NO_DATA: &str = "no-data";
/// Translation key for the alert shown when a load fails.
pub const FETCH_FAILED: &str = "fetch-failed";

/// Looks up human-readable strings by key.
///
/// A missing key translates to itself, which is ugly enough to get noticed and harmless enough
/// to ship.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Deref, derive_more::DerefMut)]
pub struct Dictionary(HashMap<String, String>);

impl Default for Dictionary {
    fn default() -> Self {
        let mut entries = HashMap::new();
        entries.insert(ROOT_TITLE.to_string(), "Overview".to_string());
        entries.insert(NO_DATA.to_string(), "No data available".to_string());
        entries.insert(FETCH_FAILED.to_string(), "Could not load".to_string());
        Self(entries)
    }
}

impl Dictionary {
    /// The defaults, overridden by `entries`.
    pub fn with_entries(entries: &HashMap<String, String>) -> Self {
        let mut dictionary = Self::default();
        dictionary.extend(entries.clone());
        dictionary
    }

    pub fn translate(&self, key: &str) -> String {
        self.0.get(key).cloned().unwrap_or_else(|| {
            tracing::trace!("No translation for {key}.");
            key.to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win_and_unknown_keys_echo() {
        let mut entries = HashMap::new();
        entries.insert(NO_DATA.to_string(), "Nichts".to_string());
        let dictionary = Dictionary::with_entries(&entries);
        assert_eq!(dictionary.translate(NO_DATA), "Nichts");
        assert_eq!(dictionary.translate(ROOT_TITLE), "Overview");
        assert_eq!(dictionary.translate("missing"), "missing");
    }
}
