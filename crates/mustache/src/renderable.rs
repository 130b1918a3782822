use crate::Result;
use serde::Serialize;
use serde_json::{Map, Value};
use std::any::type_name;

/**
The payload of a response, before it is merged with the contextual
template properties.

* [`Renderable::Empty`] renders with only the contextual properties.
* [`Renderable::Map`] contributes each of its entries at the root of
  the template properties.
* [`Renderable::Named`] contributes a single entry, conventionally
  keyed by the lowerCamelCase type name of the value.
*/
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Renderable {
    /// nothing to render
    #[default]
    Empty,

    /// entries merged into the root of the template properties
    Map(Map<String, Value>),

    /// a single value available at `{{name}}`
    Named {
        /// the key the value is available under
        name: String,
        /// the value
        value: Value,
    },
}

impl Renderable {
    /**
    Builds a renderable from any serializable value. Values that
    serialize to `null` are [`Renderable::Empty`], values that
    serialize to a map are [`Renderable::Map`], and anything else is
    [`Renderable::Named`] after its type.

    ```
    use serde_json::json;
    use trillium_mustache::Renderable;

    #[derive(serde::Serialize)]
    struct Headline(&'static str);

    assert_eq!(Renderable::new(&()).unwrap(), Renderable::Empty);
    assert!(matches!(Renderable::new(&json!({"a": 1})).unwrap(), Renderable::Map(_)));
    assert_eq!(
        Renderable::new(&Headline("extra")).unwrap(),
        Renderable::Named { name: "headline".into(), value: json!("extra") }
    );
    ```
    */
    pub fn new<T: Serialize + ?Sized>(data: &T) -> Result<Self> {
        Ok(match serde_json::to_value(data)? {
            Value::Null => Self::Empty,
            Value::Object(map) => Self::Map(map),
            value => Self::Named {
                name: lower_camel_type_name::<T>(),
                value,
            },
        })
    }

    /**
    Builds a [`Renderable::Named`] regardless of the shape of the value,
    keyed by the lowerCamelCase type name.

    ```
    use trillium_mustache::Renderable;

    #[derive(serde::Serialize)]
    struct BlogPost { title: &'static str }

    let renderable = Renderable::object(&BlogPost { title: "hi" }).unwrap();
    assert!(matches!(renderable, Renderable::Named { name, .. } if name == "blogPost"));
    ```
    */
    pub fn object<T: Serialize + ?Sized>(data: &T) -> Result<Self> {
        Self::named(lower_camel_type_name::<T>(), data)
    }

    /// builds a [`Renderable::Named`] with an explicit name
    pub fn named<T: Serialize + ?Sized>(name: impl Into<String>, data: &T) -> Result<Self> {
        Ok(Self::Named {
            name: name.into(),
            value: serde_json::to_value(data)?,
        })
    }

    /// the template properties this renderable starts from
    pub fn into_map(self) -> Map<String, Value> {
        match self {
            Self::Empty => Map::new(),
            Self::Map(map) => map,
            Self::Named { name, value } => {
                let mut map = Map::new();
                map.insert(name, value);
                map
            }
        }
    }
}

impl From<Map<String, Value>> for Renderable {
    fn from(map: Map<String, Value>) -> Self {
        Self::Map(map)
    }
}

/// `my_app::models::BlogPost<T>` becomes `blogPost`
pub(crate) fn lower_camel_type_name<T: ?Sized>() -> String {
    lower_camel(type_name::<T>())
}

fn lower_camel(full_name: &str) -> String {
    let mut name = full_name.trim();
    while let Some(rest) = name.strip_prefix('&') {
        name = rest.trim_start_matches("mut ").trim_start();
    }

    // arrays and slices are named for their elements
    if let Some(inner) = name.strip_prefix('[').and_then(|n| n.strip_suffix(']')) {
        let element = match inner.rsplit_once("; ") {
            Some((element, len)) if len.bytes().all(|b| b.is_ascii_digit()) => element,
            _ => inner,
        };
        return lower_camel(element);
    }

    let without_generics = name.split('<').next().unwrap_or(name);
    let simple = without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics);

    if !is_identifier(simple) {
        return String::from("value");
    }

    let mut chars = simple.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::from("value"),
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_names() {
        assert_eq!(lower_camel("my_app::models::BlogPost"), "blogPost");
        assert_eq!(lower_camel("alloc::vec::Vec<my_app::User>"), "vec");
        assert_eq!(lower_camel("&str"), "str");
        assert_eq!(lower_camel("User"), "user");
        assert_eq!(lower_camel("()"), "value");
        assert_eq!(lower_camel_type_name::<String>(), "string");
        assert_eq!(lower_camel_type_name::<[u8]>(), "u8");
        assert_eq!(lower_camel("&mut my_app::User"), "user");
        assert_eq!(lower_camel("dyn core::fmt::Debug"), "value");
    }

    #[test]
    fn arrays_are_named_for_their_elements() {
        assert_eq!(lower_camel_type_name::<[i32; 2]>(), "i32");
        assert_eq!(lower_camel_type_name::<[[u8; 2]; 3]>(), "u8");
        assert_eq!(lower_camel_type_name::<&[[u8; 2]]>(), "u8");
        assert_eq!(lower_camel("[my_app::BlogPost; 4]"), "blogPost");

        let renderable = Renderable::new(&[1, 2]).unwrap();
        assert_eq!(
            renderable.into_map(),
            json!({ "i32": [1, 2] }).as_object().unwrap().clone()
        );
    }

    #[test]
    fn tuples_fall_back_to_value() {
        assert_eq!(lower_camel_type_name::<(i32, &str)>(), "value");

        let renderable = Renderable::new(&(1, "a")).unwrap();
        assert_eq!(
            renderable.into_map(),
            json!({ "value": [1, "a"] }).as_object().unwrap().clone()
        );
    }

    #[test]
    fn named_values_are_keyed_by_type() {
        let renderable = Renderable::new(&vec!["a", "b"]).unwrap();
        assert_eq!(
            renderable.into_map(),
            json!({ "vec": ["a", "b"] }).as_object().unwrap().clone()
        );
    }

    #[test]
    fn maps_are_merged_at_the_root() {
        let renderable = Renderable::new(&json!({ "title": "hi", "count": 2 })).unwrap();
        let map = renderable.into_map();
        assert_eq!(map.get("title"), Some(&json!("hi")));
        assert_eq!(map.get("count"), Some(&json!(2)));
    }

    #[test]
    fn empty_payloads() {
        assert_eq!(Renderable::new(&None::<String>).unwrap(), Renderable::Empty);
        assert!(Renderable::Empty.into_map().is_empty());
    }
}
