#![forbid(unsafe_code)]
#![warn(
    missing_copy_implementations,
    rustdoc::missing_crate_level_docs,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    unused_qualifications
)]

/*!
# mustache templates for trillium

This crate renders [mustache](https://mustache.github.io/) templates
with [the mustache crate](https://docs.rs/mustache). Every template is
rendered with the response payload plus a handful of contextual
properties:

* `{{contextPath}}`, the configured context path
* `{{lang}}`, the language of the response
* `{{session.key}}`, entries from a [`trillium_sessions`] session
* `{{flash.key}}`, entries from the [`FlashHandler`] flash scope
* `{{#i18n}}key{{/i18n}}`, a translated [`Messages`] entry

```
use trillium::Conn;
use trillium_mustache::{Messages, MustacheConnExt, MustacheHandler, Templates};
# fn main() -> trillium_mustache::Result<()> {

let mut templates = Templates::default();
templates.register_template_string(
    "views/hello.mustache",
    "{{#i18n}}greeting{{/i18n}} {{name}} ({{lang}})",
)?;

let messages = Messages::new()
    .with_default([("greeting", "hello")])
    .with_language("de", [("greeting", "hallo")]);

let handler = (
    MustacheHandler::new(templates).with_messages(messages),
    |conn: Conn| async move { conn.assign("name", "trillium").render("views/hello.mustache") },
);

use trillium_testing::prelude::*;
assert_ok!(
    get("/").with_request_header("accept-language", "de-AT, en;q=0.5").on(&handler),
    "hallo trillium (de-AT)",
    "content-type" => "text/html; charset=utf-8"
);
# Ok(()) }
```
*/

pub use mustache;

mod error;
pub use error::{Error, Result};

mod config;
pub use config::{Mode, MustacheConfig};

mod templates;
pub use templates::Templates;

mod messages;
pub use messages::Messages;

pub mod lang;
pub use lang::Language;

mod flash;
pub use flash::{Flash, FlashConnExt, FlashHandler};

mod renderable;
pub use renderable::Renderable;

mod properties;
pub use properties::TemplateProperties;

pub mod template_name;
pub use template_name::ControllerRoute;

mod assigns;
pub use assigns::Assigns;

mod mustache_handler;
pub use mustache_handler::MustacheHandler;

mod mustache_conn_ext;
pub use mustache_conn_ext::MustacheConnExt;
