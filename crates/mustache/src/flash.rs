use std::collections::BTreeMap;
use trillium::{async_trait, Conn, Handler};
use trillium_cookies::{
    cookie::{Cookie, CookieJar, SameSite},
    CookiesConnExt,
};

/**
Short-lived messages that survive exactly one redirect.

Entries added with [`Flash::put`] are sent to the browser in a cookie
and become the *current* entries of the next request, where templates
can read them as `{{flash.key}}`. [`Flash::now`] makes an entry
visible to the current request only.
*/
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Flash {
    current: BTreeMap<String, String>,
    outgoing: BTreeMap<String, String>,
}

impl Flash {
    /// builds a flash scope from the entries sent with this request
    pub fn from_current(current: BTreeMap<String, String>) -> Self {
        Self {
            current,
            outgoing: BTreeMap::new(),
        }
    }

    /// retrieves a current entry
    pub fn get(&self, key: &str) -> Option<&str> {
        self.current.get(key).map(String::as_str)
    }

    /// the entries available to the current request
    pub fn current(&self) -> &BTreeMap<String, String> {
        &self.current
    }

    /// the entries that will be sent to the next request
    pub fn outgoing(&self) -> &BTreeMap<String, String> {
        &self.outgoing
    }

    /// adds an entry for the next request
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.outgoing.insert(key.into(), value.into());
    }

    /// adds an entry for the current request only
    pub fn now(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.current.insert(key.into(), value.into());
    }

    /// shorthand for `put("success", value)`
    pub fn success(&mut self, value: impl Into<String>) {
        self.put("success", value);
    }

    /// shorthand for `put("error", value)`
    pub fn error(&mut self, value: impl Into<String>) {
        self.put("error", value);
    }

    /// carries every current entry over to the next request
    pub fn keep(&mut self) {
        for (key, value) in &self.current {
            self.outgoing
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    /// drops every entry that would be sent to the next request
    pub fn discard(&mut self) {
        self.outgoing.clear();
    }
}

/**
Handler that reads and writes the flash cookie.

[`trillium_cookies::CookiesHandler`] must run before this handler.

```
use trillium::Conn;
use trillium_cookies::CookiesHandler;
use trillium_mustache::{FlashConnExt, FlashHandler};

let handler = (
    CookiesHandler::new(),
    FlashHandler::new(),
    |conn: Conn| async move { conn.with_flash("success", "saved").ok("redirecting") },
);

use trillium_testing::prelude::*;
let conn = get("/").on(&handler);
let set_cookie = conn.response_headers().get_str("set-cookie").unwrap();
assert!(set_cookie.starts_with("TRILLIUM_FLASH="));
```
*/
#[derive(Clone, Debug)]
pub struct FlashHandler {
    cookie_name: String,
    cookie_path: String,
}

impl Default for FlashHandler {
    fn default() -> Self {
        Self {
            cookie_name: String::from("TRILLIUM_FLASH"),
            cookie_path: String::from("/"),
        }
    }
}

impl FlashHandler {
    /// constructs a flash handler with the cookie name
    /// `TRILLIUM_FLASH` and the cookie path `/`
    pub fn new() -> Self {
        Self::default()
    }

    /// sets the name of the flash cookie
    pub fn with_cookie_name(mut self, cookie_name: impl Into<String>) -> Self {
        self.cookie_name = cookie_name.into();
        self
    }

    /// sets the path of the flash cookie
    pub fn with_cookie_path(mut self, cookie_path: impl Into<String>) -> Self {
        self.cookie_path = cookie_path.into();
        self
    }

    fn decode(&self, jar: &CookieJar) -> BTreeMap<String, String> {
        let Some(cookie) = jar.get(&self.cookie_name) else {
            return BTreeMap::new();
        };

        serde_json::from_str(cookie.value()).unwrap_or_else(|e| {
            log::warn!("discarding unreadable flash cookie: {e}");
            BTreeMap::new()
        })
    }
}

#[async_trait]
impl Handler for FlashHandler {
    async fn run(&self, conn: Conn) -> Conn {
        let current = match conn.state::<CookieJar>() {
            Some(jar) => self.decode(jar),
            None => {
                log::warn!("FlashHandler run without a CookiesHandler, flash cookie ignored");
                BTreeMap::new()
            }
        };

        conn.with_state(Flash::from_current(current))
    }

    async fn before_send(&self, mut conn: Conn) -> Conn {
        let Some(flash) = conn.take_state::<Flash>() else {
            return conn;
        };

        let Some(jar) = conn.state::<CookieJar>() else {
            return conn.with_state(flash);
        };
        let received_cookie = jar.get(&self.cookie_name).is_some();

        if !flash.outgoing.is_empty() {
            match serde_json::to_string(&flash.outgoing) {
                Ok(value) => {
                    let cookie: Cookie<'static> =
                        Cookie::build((self.cookie_name.clone(), value))
                            .path(self.cookie_path.clone())
                            .http_only(true)
                            .same_site(SameSite::Lax)
                            .into();
                    conn.cookies_mut().add(cookie);
                }
                Err(e) => log::error!("could not serialize flash: {e}"),
            }
        } else if received_cookie {
            conn.cookies_mut().remove(
                Cookie::build(self.cookie_name.clone()).path(self.cookie_path.clone()),
            );
        }

        conn.with_state(flash)
    }
}

/**
Extension trait for reading and writing the flash scope of a
[`Conn`]. [`FlashHandler`] must run before any of these functions are
called.
*/
pub trait FlashConnExt {
    /// adds an entry for the next request and returns the conn
    fn with_flash(self, key: impl Into<String>, value: impl Into<String>) -> Self;

    /// retrieves the flash scope, if the [`FlashHandler`] has run
    fn flash(&self) -> Option<&Flash>;

    /// retrieves a mutable reference to the flash scope
    fn flash_mut(&mut self) -> &mut Flash;
}

impl FlashConnExt for Conn {
    fn with_flash(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.flash_mut().put(key, value);
        self
    }

    fn flash(&self) -> Option<&Flash> {
        self.state()
    }

    fn flash_mut(&mut self) -> &mut Flash {
        self.state_mut()
            .expect("FlashHandler must be executed before calling FlashConnExt::flash_mut")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_and_outgoing_are_separate() {
        let mut flash = Flash::from_current([("error".to_string(), "nope".to_string())].into());
        flash.success("saved");
        flash.now("info", "just now");

        assert_eq!(flash.get("error"), Some("nope"));
        assert_eq!(flash.get("info"), Some("just now"));
        assert_eq!(flash.get("success"), None);
        assert_eq!(flash.outgoing().get("success").map(String::as_str), Some("saved"));

        flash.keep();
        assert_eq!(flash.outgoing().len(), 3);

        flash.discard();
        assert!(flash.outgoing().is_empty());
        assert_eq!(flash.current().len(), 2);
    }
}
