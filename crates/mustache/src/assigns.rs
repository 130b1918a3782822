use crate::Renderable;
use serde::Serialize;
use serde_json::{Map, Value};
use std::borrow::Cow;

/**
Key-value data accumulated on a conn by
[`MustacheConnExt::assign`](crate::MustacheConnExt::assign). Rendered as
a map payload, so each key is available at the root of the template.
*/
#[derive(Clone, Default, Serialize, Debug, PartialEq)]
#[serde(transparent)]
pub struct Assigns(Map<String, Value>);

impl Assigns {
    /// serializes `data` and stores it under `key`, replacing any
    /// previous value
    pub fn assign(
        &mut self,
        key: impl Into<Cow<'static, str>>,
        data: impl Serialize,
    ) -> serde_json::Result<()> {
        let value = serde_json::to_value(data)?;
        self.0.insert(key.into().into_owned(), value);
        Ok(())
    }

    /// retrieves an assigned value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// removes an assigned value, returning it
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// the number of assigned values
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// true when nothing has been assigned
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// the assigns as a render payload
    pub fn to_renderable(&self) -> Renderable {
        Renderable::Map(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn later_assigns_replace_earlier_ones() {
        let mut assigns = Assigns::default();
        assigns.assign("name", "first").unwrap();
        assigns.assign(String::from("name"), "second").unwrap();
        assigns.assign("count", 3).unwrap();

        assert_eq!(assigns.len(), 2);
        assert_eq!(assigns.get("name"), Some(&json!("second")));
        assert_eq!(assigns.remove("count"), Some(json!(3)));
        assert_eq!(
            assigns.to_renderable().into_map(),
            json!({ "name": "second" }).as_object().cloned().unwrap()
        );
    }
}
