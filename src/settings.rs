use crate::{Keys, Trek};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// The `Settings` struct holds everything a [`crate::Navigator`] needs to know before it starts.
///
/// Users specify settings in `Burrow.toml`, as in the example below.  Every field has a default,
/// so a missing file is no reason to stop.
///
/// ```toml
/// url = "/nodes"
/// container = "#navigation"
/// slide_millis = 250
/// limit = 20
/// search_key = "search"
///
/// [keys]
/// id = "id"
/// name = "name"
/// result = "items"
/// children_link = "children"
///
/// [translations]
/// root-title = "Overview"
/// ```
///
/// ### Fields
///
/// * url - Where the root of the tree lives.
/// * container - Where columns are placed.
/// * slide_millis - How long a column takes to slide.
/// * limit - Page size.  Without one, only the server decides how much comes back.
/// * search_key - Query parameter carrying the search term.
/// * buffer - Capacity of the command and signal channels.
/// * fixtures - A JSON file of canned responses for the `burrow` binary.
/// * keys - Field names used to read responses, see [`Keys`].
/// * translations - Overrides for the [`crate::Dictionary`].
#[derive(
    Debug,
    Clone,
    PartialEq,
    serde::Serialize,
    serde::Deserialize,
    derive_builder::Builder,
    derive_getters::Getters,
)]
#[builder(default, setter(into))]
#[serde(default)]
pub struct Settings {
    url: String,
    container: String,
    slide_millis: u64,
    limit: Option<u32>,
    search_key: String,
    buffer: usize,
    fixtures: Option<PathBuf>,
    keys: Keys,
    translations: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: "/".to_string(),
            container: "#navigation".to_string(),
            slide_millis: 250,
            limit: None,
            search_key: "search".to_string(),
            buffer: 32,
            fixtures: None,
            keys: Keys::default(),
            translations: HashMap::new(),
        }
    }
}

impl Settings {
    /// Reads settings from the file `name` (any format the [`config`] crate understands, with the
    /// extension left off) and from `BURROW__`-prefixed environment variables, which win.
    ///
    /// If the file is missing, we carry on with the defaults and say so.  Will
    /// [`crate::Snag::Config`] if a source is present but does not deserialize.
    #[tracing::instrument]
    pub fn load(name: &str) -> Trek<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(name).required(false))
            .add_source(config::Environment::with_prefix("BURROW").separator("__"))
            .build()?;
        let settings = config.try_deserialize::<Self>()?;
        // Read the settings to make sure they are correct.
        tracing::trace!("{:#?}", settings);
        Ok(settings)
    }

    /// Reads settings from a TOML string.
    pub fn from_toml(text: &str) -> Trek<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize::<Self>()?)
    }

    pub fn slide(&self) -> Duration {
        Duration::from_millis(self.slide_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_overrides_defaults() {
        let settings = Settings::from_toml(
            r#"
            url = "/api/folders"
            limit = 5

            [keys]
            result = "folders"

            [translations]
            no-data = "Empty"
            "#,
        )
        .unwrap();
        assert_eq!(settings.url(), "/api/folders");
        assert_eq!(settings.limit(), &Some(5));
        assert_eq!(settings.keys().result(), "folders");
        assert_eq!(settings.keys().id(), "id");
        assert_eq!(settings.container(), "#navigation");
        assert_eq!(
            settings.translations().get("no-data").map(String::as_str),
            Some("Empty")
        );
    }

    #[test]
    fn builder_fills_the_rest() {
        let settings = SettingsBuilder::default()
            .url("/nodes")
            .slide_millis(0u64)
            .build()
            .unwrap();
        assert_eq!(settings.slide(), Duration::ZERO);
        assert_eq!(settings.search_key(), "search");
        assert_eq!(settings.buffer(), &32);
    }

    #[test]
    fn missing_file_means_defaults() {
        let settings = Settings::load("does-not-exist-burrow").unwrap();
        assert_eq!(settings.url(), Settings::default().url());
    }
}
