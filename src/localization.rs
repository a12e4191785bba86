use anyhow::{anyhow, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use tracing::warn;
use unic_langid::LanguageIdentifier;

const DEFAULT_LOCALE: &str = "ro";
const RO_MESSAGES: &str = include_str!("../locales/ro/main.ftl");

/// User-facing messages of the bot
pub struct Localization {
    bundle: FluentBundle<FluentResource>,
}

impl Localization {
    /// Create the Romanian message bundle
    pub fn new() -> Result<Self> {
        Self::from_source(DEFAULT_LOCALE, RO_MESSAGES)
    }

    /// Create a bundle from Fluent source text
    pub fn from_source(locale: &str, source: &str) -> Result<Self> {
        let locale: LanguageIdentifier = locale.parse()?;
        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("Invalid Fluent resource: {errors:?}"))?;

        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Messages are embedded in HTML, where isolation marks would show up
        bundle.set_use_isolating(false);
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("Duplicate Fluent messages: {errors:?}"))?;

        Ok(Self { bundle })
    }

    /// Get a localized message
    pub fn get(&self, key: &str) -> String {
        self.format(key, None)
    }

    /// Get a localized message with simple string arguments
    pub fn get_with_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        let mut fluent_args = FluentArgs::new();
        for (name, value) in args {
            fluent_args.set(*name, FluentValue::from(*value));
        }
        self.format(key, Some(&fluent_args))
    }

    fn format(&self, key: &str, args: Option<&FluentArgs>) -> String {
        let Some(pattern) = self.bundle.get_message(key).and_then(|msg| msg.value()) else {
            warn!(key = %key, "Missing translation");
            return format!("Missing translation: {key}");
        };

        let mut errors = vec![];
        let value = self.bundle.format_pattern(pattern, args, &mut errors);
        if !errors.is_empty() {
            warn!(key = %key, errors = ?errors, "Errors while formatting message");
        }
        value.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_messages_load() {
        let localization = Localization::new().unwrap();

        assert_eq!(localization.get("no-results-inline"), "Niciun rezultat");
    }

    #[test]
    fn test_arguments_are_not_isolated() {
        let localization = Localization::new().unwrap();

        let message = localization.get_with_args("cache-missing", &[("query", "om")]);
        assert_eq!(message, "No cache for \"om\"");
    }

    #[test]
    fn test_invalid_source_is_rejected() {
        assert!(Localization::from_source("ro", "= broken").is_err());
    }
}
