use crate::{lang::resolve_language, Flash, Messages, MustacheConfig, Renderable};
use mustache::Data;
use serde_json::{Map, Value};
use std::{cell::RefCell, collections::HashMap, sync::Arc};
use trillium::Conn;
use trillium_sessions::Session;

/**
The data a template is rendered with.

Starting from a [`Renderable`], the following keys are added, replacing
any payload entries of the same name:

* `contextPath`: the configured context path
* `lang`: the resolved language, when there is one
* `session`: the session entries, when the session is not empty
* `flash`: the current flash entries, translated where a message exists
* `i18n`: a lambda translating its contents, as in
  `{{#i18n}}greeting{{/i18n}}`. The lambda is only part of the
  rendered [`Data`]; it is not included in [`TemplateProperties::values`].
*/
#[derive(Clone, Debug)]
pub struct TemplateProperties {
    values: Map<String, Value>,
    language: Option<String>,
    messages: Arc<Messages>,
}

impl TemplateProperties {
    /// assembles the properties for the current request
    pub fn for_conn(
        conn: &Conn,
        config: &MustacheConfig,
        messages: &Arc<Messages>,
        renderable: Renderable,
    ) -> Self {
        let mut values = renderable.into_map();
        let language = resolve_language(conn, config);

        values.insert(
            "contextPath".into(),
            Value::String(config.context_path().to_string()),
        );

        if let Some(language) = &language {
            values.insert("lang".into(), Value::String(language.clone()));
        }

        if let Some(session) = conn.state::<Session>().and_then(session_values) {
            values.insert("session".into(), Value::Object(session));
        }

        let flash = conn
            .state::<Flash>()
            .map(|flash| {
                flash
                    .current()
                    .iter()
                    .map(|(key, value)| {
                        let translated = messages.get_or_key(value, language.as_deref());
                        (key.clone(), Value::String(translated.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        values.insert("flash".into(), Value::Object(flash));

        Self {
            values,
            language,
            messages: Arc::clone(messages),
        }
    }

    /// retrieves a property by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// every property except the `i18n` lambda
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// the resolved language
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// translates a key the way the `i18n` lambda does
    pub fn translate(&self, key: &str) -> String {
        translate(&self.messages, self.language.as_deref(), key)
    }

    /// converts these properties into mustache [`Data`], attaching the
    /// `i18n` lambda
    pub fn into_data(self) -> Data {
        let Self {
            values,
            language,
            messages,
        } = self;

        let mut map = values
            .into_iter()
            .map(|(key, value)| (key, value_to_data(value)))
            .collect::<HashMap<_, _>>();

        map.insert(
            "i18n".into(),
            Data::Fun(RefCell::new(Box::new(move |key: String| {
                translate(&messages, language.as_deref(), &key)
            }))),
        );

        Data::Map(map)
    }
}

fn translate(messages: &Messages, language: Option<&str>, key: &str) -> String {
    let trimmed = key.trim();
    match messages.get(trimmed, language) {
        Some(message) => message.to_string(),
        None => key.to_string(),
    }
}

// session values are stored as json strings
fn session_values(session: &Session) -> Option<Map<String, Value>> {
    let serialized = serde_json::to_value(session).ok()?;
    let data = serialized.get("data")?.as_object()?;
    if data.is_empty() {
        return None;
    }

    Some(
        data.iter()
            .map(|(key, value)| {
                let decoded = match value {
                    Value::String(raw) => {
                        serde_json::from_str(raw).unwrap_or_else(|_| value.clone())
                    }
                    other => other.clone(),
                };
                (key.clone(), decoded)
            })
            .collect(),
    )
}

pub(crate) fn value_to_data(value: Value) -> Data {
    match value {
        Value::Null => Data::Null,
        Value::Bool(b) => Data::Bool(b),
        Value::Number(n) => Data::String(n.to_string()),
        Value::String(s) => Data::String(s),
        Value::Array(values) => Data::Vec(values.into_iter().map(value_to_data).collect()),
        Value::Object(map) => Data::Map(
            map.into_iter()
                .map(|(key, value)| (key, value_to_data(value)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_to_data() {
        let data = value_to_data(json!({
            "name": "trillium",
            "count": 3,
            "ok": true,
            "tags": ["a", null],
        }));

        let Data::Map(map) = data else {
            panic!("expected a map")
        };

        assert!(matches!(map.get("name"), Some(Data::String(s)) if s == "trillium"));
        assert!(matches!(map.get("count"), Some(Data::String(s)) if s == "3"));
        assert!(matches!(map.get("ok"), Some(Data::Bool(true))));
        assert!(matches!(
            map.get("tags"),
            Some(Data::Vec(tags)) if matches!(tags.as_slice(), [Data::String(_), Data::Null])
        ));
    }

    #[test]
    fn translation_falls_back_to_the_key() {
        let messages = Messages::new()
            .with_default([("greeting", "hello")])
            .with_language("de", [("greeting", "hallo")]);

        assert_eq!(translate(&messages, Some("de"), " greeting "), "hallo");
        assert_eq!(translate(&messages, None, "greeting"), "hello");
        assert_eq!(translate(&messages, Some("de"), "missing.key"), "missing.key");
    }

    #[test]
    fn i18n_lambda_is_attached() {
        let mut templates = crate::Templates::default();
        templates
            .register_template_string("t", "{{#i18n}}greeting{{/i18n}} {{name}}")
            .unwrap();

        let properties = TemplateProperties {
            values: json!({ "name": "world" }).as_object().unwrap().clone(),
            language: Some("de".into()),
            messages: Arc::new(Messages::new().with_language("de", [("greeting", "hallo")])),
        };

        assert_eq!(properties.translate("greeting"), "hallo");
        assert_eq!(templates.render("t", &properties.into_data()).unwrap(), "hallo world");
    }
}
