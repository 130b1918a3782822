use crate::{Messages, MustacheConfig, Renderable, TemplateProperties, Templates};
use mustache::Data;
use std::{collections::HashMap, path::PathBuf, sync::Arc};
use trillium::{async_trait, Conn, Handler, KnownHeaderName, Status};

/**
A trillium handler that provides mustache templates to downsequence
handlers.
*/
#[derive(Clone, Debug, Default)]
pub struct MustacheHandler {
    templates: Arc<Templates>,
    messages: Arc<Messages>,
}

impl MustacheHandler {
    /// Builds a new trillium mustache handler from either a template
    /// root (`&str` or [`PathBuf`]), a [`MustacheConfig`], or a
    /// [`Templates`] factory.
    ///
    /// ## From a root directory
    /// ```
    /// use trillium_mustache::{MustacheConnExt, MustacheHandler};
    /// let handler = (
    ///     MustacheHandler::new("tests/fixtures"),
    ///     |conn: trillium::Conn| async move {
    ///         conn.assign("name", "mustache").render("views/hello.mustache")
    ///     },
    /// );
    ///
    /// use trillium_testing::prelude::*;
    /// assert_ok!(get("/").on(&handler), "hello mustache!\n");
    /// ```
    ///
    /// ## From [`Templates`]
    /// ```
    /// use trillium_mustache::{MustacheConnExt, MustacheHandler, Templates};
    /// # fn main() -> trillium_mustache::Result<()> {
    /// let mut templates = Templates::default();
    /// templates.register_template_string("greet-user", "Hello {{name}}")?;
    /// let handler = (
    ///     MustacheHandler::new(templates),
    ///     |conn: trillium::Conn| async move {
    ///         conn.assign("name", "mustache").render("greet-user")
    ///     },
    /// );
    ///
    /// use trillium_testing::prelude::*;
    /// assert_ok!(
    ///     get("/").on(&handler),
    ///     "Hello mustache",
    ///     "content-type" => "text/html; charset=utf-8"
    /// );
    /// # Ok(()) }
    /// ```
    pub fn new(source: impl Into<Self>) -> Self {
        source.into()
    }

    /// attaches translated [`Messages`] for the `i18n` lambda and for
    /// flash entries
    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = Arc::new(messages);
        self
    }

    /// the template factory
    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    /// the configuration
    pub fn config(&self) -> &MustacheConfig {
        self.templates.config()
    }

    /// the messages
    pub fn messages(&self) -> &Arc<Messages> {
        &self.messages
    }

    pub(crate) fn properties(&self, conn: &Conn, renderable: Renderable) -> TemplateProperties {
        TemplateProperties::for_conn(conn, self.config(), &self.messages, renderable)
    }

    pub(crate) fn render(&self, conn: Conn, template: &str, renderable: Renderable) -> Conn {
        let data = self.properties(&conn, renderable).into_data();

        match self.templates.render(template, &data) {
            Ok(body) => {
                let status = conn.status().unwrap_or(Status::Ok);
                conn.with_status(status)
                    .with_response_header(
                        KnownHeaderName::ContentType,
                        self.config().content_type().to_string(),
                    )
                    .with_body(body)
                    .halt()
            }

            Err(e) => self.render_error(conn, template, &e),
        }
    }

    pub(crate) fn render_error(
        &self,
        conn: Conn,
        template: &str,
        error: &dyn std::error::Error,
    ) -> Conn {
        log::error!("could not render {template:?}: {error}");
        let error_template = self.config().error_template();

        let (content_type, body) =
            match self.templates.render(error_template, &Data::Map(HashMap::new())) {
                Ok(body) => (self.config().content_type().to_string(), body),
                Err(e) => {
                    log::error!("could not render error template {error_template:?}: {e}");
                    let body = if self.config().mode() == crate::Mode::Prod {
                        String::from("Internal Server Error")
                    } else {
                        error.to_string()
                    };
                    (String::from("text/plain; charset=utf-8"), body)
                }
            };

        conn.with_status(Status::InternalServerError)
            .with_response_header(KnownHeaderName::ContentType, content_type)
            .with_body(body)
            .halt()
    }
}

impl From<&str> for MustacheHandler {
    fn from(root: &str) -> Self {
        MustacheConfig::new().with_root(root).into()
    }
}

impl From<PathBuf> for MustacheHandler {
    fn from(root: PathBuf) -> Self {
        MustacheConfig::new().with_root(root).into()
    }
}

impl From<MustacheConfig> for MustacheHandler {
    fn from(config: MustacheConfig) -> Self {
        Templates::new(config).into()
    }
}

impl From<Templates> for MustacheHandler {
    fn from(templates: Templates) -> Self {
        Self {
            templates: Arc::new(templates),
            messages: Arc::default(),
        }
    }
}

#[async_trait]
impl Handler for MustacheHandler {
    async fn run(&self, conn: Conn) -> Conn {
        conn.with_state(self.clone())
    }
}
