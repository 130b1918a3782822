use crate::{Error, Result};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

type Bundle = HashMap<String, String>;

/**
Translated messages, grouped into one bundle per language plus a
default bundle.

Lookups try the exact language tag, then its primary subtag (`de-AT`
falls back to `de`), then the default bundle.

```
use trillium_mustache::Messages;

let messages = Messages::new()
    .with_default([("greeting", "hello")])
    .with_language("de", [("greeting", "hallo")]);

assert_eq!(messages.get("greeting", Some("de-AT")), Some("hallo"));
assert_eq!(messages.get("greeting", Some("fr")), Some("hello"));
assert_eq!(messages.get("greeting", None), Some("hello"));
assert_eq!(messages.get("farewell", Some("de")), None);
```
*/
#[derive(Clone, Debug, Default)]
pub struct Messages {
    default: Bundle,
    languages: HashMap<String, Bundle>,
}

impl Messages {
    /// an empty set of messages
    pub fn new() -> Self {
        Self::default()
    }

    /// adds entries to the default bundle
    pub fn with_default<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.default
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// adds entries to the bundle for `language`
    pub fn with_language<I, K, V>(mut self, language: impl AsRef<str>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.languages
            .entry(normalize(language.as_ref()))
            .or_default()
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /**
    Loads every `messages*.properties` file in `dir`.
    `messages.properties` becomes the default bundle and
    `messages_<lang>.properties` the bundle for `<lang>`. Underscores
    in the language part are read as hyphens, so
    `messages_pt_BR.properties` is the `pt-br` bundle.
    */
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let mut messages = Self::new();
        let mut paths = fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "properties"))
            .collect::<Vec<PathBuf>>();
        paths.sort();

        for path in paths {
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let entries = parse_properties(&path, &fs::read_to_string(&path)?)?;

            if stem == "messages" {
                messages = messages.with_default(entries);
            } else if let Some(language) = stem.strip_prefix("messages_") {
                log::debug!("loaded messages for {language} from {path:?}");
                messages = messages.with_language(language.replace('_', "-"), entries);
            }
        }

        Ok(messages)
    }

    /// retrieves a message by key for the given language
    pub fn get(&self, key: &str, language: Option<&str>) -> Option<&str> {
        let from_language = language.and_then(|language| {
            let language = normalize(language);
            self.languages
                .get(&language)
                .and_then(|bundle| bundle.get(key))
                .or_else(|| {
                    let (primary, _) = language.split_once('-')?;
                    self.languages.get(primary)?.get(key)
                })
        });

        from_language
            .or_else(|| self.default.get(key))
            .map(String::as_str)
    }

    /// retrieves a message by key, or returns the key itself when
    /// there is no such message
    pub fn get_or_key<'a>(&'a self, key: &'a str, language: Option<&str>) -> &'a str {
        self.get(key, language).unwrap_or(key)
    }

    /// whether any language bundle or the default bundle has entries
    pub fn is_empty(&self) -> bool {
        self.default.is_empty() && self.languages.values().all(HashMap::is_empty)
    }
}

fn normalize(language: &str) -> String {
    language.trim().replace('_', "-").to_ascii_lowercase()
}

fn parse_properties(path: &Path, source: &str) -> Result<Vec<(String, String)>> {
    let mut entries = vec![];
    for (index, line) in source.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let Some(split) = line.find(['=', ':']) else {
            return Err(Error::MessagesParse {
                path: path.to_path_buf(),
                line: index + 1,
            });
        };

        let (key, value) = line.split_at(split);
        entries.push((key.trim().to_string(), value[1..].trim().to_string()));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_parsing() {
        let entries = parse_properties(
            Path::new("messages.properties"),
            "# a comment\n! another\n\ngreeting = hello\nfarewell: goodbye\nurl=http://x?a=b\n",
        )
        .unwrap();

        assert_eq!(
            entries,
            vec![
                ("greeting".into(), "hello".into()),
                ("farewell".into(), "goodbye".into()),
                ("url".into(), "http://x?a=b".into()),
            ]
        );
    }

    #[test]
    fn properties_parse_errors_carry_line_numbers() {
        let error = parse_properties(Path::new("m.properties"), "a=b\nnot a pair\n").unwrap_err();
        assert!(matches!(error, Error::MessagesParse { line: 2, .. }));
    }

    #[test]
    fn loads_a_directory() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join("messages");
        let messages = Messages::from_dir(dir).unwrap();

        assert_eq!(messages.get("greeting", None), Some("Hello"));
        assert_eq!(messages.get("greeting", Some("de")), Some("Hallo"));
        assert_eq!(messages.get("greeting", Some("pt-BR")), Some("Olá"));
        assert_eq!(messages.get("greeting", Some("pt")), Some("Hello"));
        assert_eq!(messages.get("only.default", Some("de")), Some("default only"));
    }

    #[test]
    fn language_tags_are_case_insensitive() {
        let messages = Messages::new().with_language("en_GB", [("colour", "colour")]);
        assert_eq!(messages.get("colour", Some("EN-gb")), Some("colour"));
        assert_eq!(messages.get("colour", Some("en")), None);
        assert_eq!(messages.get_or_key("color", Some("en-GB")), "color");
        assert!(!messages.is_empty());
        assert!(Messages::new().is_empty());
    }
}
