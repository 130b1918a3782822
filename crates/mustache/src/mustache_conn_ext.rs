use crate::{
    lang::Language, template_name, Assigns, ControllerRoute, MustacheHandler, Renderable,
    TemplateProperties,
};
use serde::Serialize;
use std::borrow::Cow;
use trillium::Conn;

/**
Extension trait that provides mustache rendering capabilities to
[`trillium::Conn`]s. [`MustacheHandler`] must run before any of these
functions are called.
*/
pub trait MustacheConnExt {
    /**
    Registers an "assigns" value on this Conn for use in a template.
    See example usage at [`MustacheHandler::new`](crate::MustacheHandler::new)
    */
    fn assign(self, key: impl Into<Cow<'static, str>>, data: impl Serialize) -> Self;

    /// retrieves a reference to any accumulated assigns on this conn
    fn assigns(&self) -> Option<&Assigns>;

    /**
    retrieves a mutable reference to any accumulated assigns on this
    conn
    */
    fn assigns_mut(&mut self) -> &mut Assigns;

    /**
    Records the controller and action handling this request. When no
    template is named explicitly, [`MustacheConnExt::render_default`]
    renders `views/<controller>/<action>.mustache`.

    ```
    use trillium_mustache::{MustacheConnExt, MustacheHandler, Templates};
    # fn main() -> trillium_mustache::Result<()> {
    let mut templates = Templates::default();
    templates.register_template_string("views/Users/show.mustache", "user {{id}}")?;

    let handler = (
        MustacheHandler::new(templates),
        |conn: trillium::Conn| async move {
            conn.with_controller("Users", "show")
                .assign("id", 42)
                .render_default()
        },
    );

    use trillium_testing::prelude::*;
    assert_ok!(get("/users/42").on(&handler), "user 42");
    # Ok(()) }
    ```
    */
    fn with_controller(
        self,
        controller: impl Into<Cow<'static, str>>,
        action: impl Into<Cow<'static, str>>,
    ) -> Self;

    /// sets the language of this response, taking precedence over the
    /// language cookie and the accept-language header
    fn with_language(self, language: impl Into<Cow<'static, str>>) -> Self;

    /**
    renders a template by name, passing any accumulated assigns to the
    template. A name ending in the legacy suffix (`.ftl.html` by
    default) is rewritten to the mustache extension.
    */
    fn render(self, template: &str) -> Self;

    /**
    renders a template by name with the provided data. Data that
    serializes to a map is available at the root of the template;
    anything else is available under its lowerCamelCase type name.
    Note that this does not use any data accumulated by
    [`MustacheConnExt::assign`]

    ```
    use trillium_mustache::{MustacheConnExt, MustacheHandler, Templates};
    # fn main() -> trillium_mustache::Result<()> {
    #[derive(serde::Serialize)]
    struct User { name: &'static str }

    let mut templates = Templates::default();
    templates.register_template_string("greet-user", "Hello {{name}}")?;

    let handler = (
        MustacheHandler::new(templates),
        |conn: trillium::Conn| async move {
            conn.render_with("greet-user", &User { name: "mustache" })
        }
    );

    use trillium_testing::prelude::*;
    assert_ok!(get("/").on(&handler), "Hello mustache");
    # Ok(()) }
    ```
    */
    fn render_with(self, template: &str, data: &impl Serialize) -> Self;

    /**
    renders a template by name with the provided value available
    under its lowerCamelCase type name, regardless of its shape

    ```
    use trillium_mustache::{MustacheConnExt, MustacheHandler, Templates};
    # fn main() -> trillium_mustache::Result<()> {
    #[derive(serde::Serialize)]
    struct BlogPost { title: &'static str }

    let mut templates = Templates::default();
    templates.register_template_string("post", "<h1>{{blogPost.title}}</h1>")?;

    let handler = (
        MustacheHandler::new(templates),
        |conn: trillium::Conn| async move {
            conn.render_object("post", &BlogPost { title: "mustache" })
        }
    );

    use trillium_testing::prelude::*;
    assert_ok!(get("/").on(&handler), "<h1>mustache</h1>");
    # Ok(()) }
    ```
    */
    fn render_object(self, template: &str, object: &impl Serialize) -> Self;

    /**
    renders accumulated assigns with the template named by the
    controller route, or failing that, by the request path
    */
    fn render_default(self) -> Self;

    /**
    assembles the template properties for this conn without
    rendering anything
    */
    fn template_properties(&self, renderable: Renderable) -> TemplateProperties;

    /// retrieves the [`MustacheHandler`]
    fn mustache(&self) -> &MustacheHandler;
}

impl MustacheConnExt for Conn {
    fn assign(mut self, key: impl Into<Cow<'static, str>>, data: impl Serialize) -> Self {
        let key = key.into();
        if let Err(e) = self.assigns_mut().assign(key.clone(), data) {
            log::error!("could not serialize assign {key:?}: {e}");
        }
        self
    }

    fn assigns(&self) -> Option<&Assigns> {
        self.state()
    }

    fn assigns_mut(&mut self) -> &mut Assigns {
        self.mut_state_or_insert_with(Assigns::default)
    }

    fn with_controller(
        self,
        controller: impl Into<Cow<'static, str>>,
        action: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.with_state(ControllerRoute {
            controller: controller.into(),
            action: action.into(),
        })
    }

    fn with_language(self, language: impl Into<Cow<'static, str>>) -> Self {
        self.with_state(Language(language.into()))
    }

    fn render(self, template: &str) -> Self {
        let handler = self.mustache().clone();
        let template = template_name::resolve(handler.config(), Some(template), None, "");
        let renderable = assigns_renderable(&self);
        handler.render(self, &template, renderable)
    }

    fn render_with(self, template: &str, data: &impl Serialize) -> Self {
        let handler = self.mustache().clone();
        let template = template_name::resolve(handler.config(), Some(template), None, "");
        match Renderable::new(data) {
            Ok(renderable) => handler.render(self, &template, renderable),
            Err(e) => handler.render_error(self, &template, &e),
        }
    }

    fn render_object(self, template: &str, object: &impl Serialize) -> Self {
        let handler = self.mustache().clone();
        let template = template_name::resolve(handler.config(), Some(template), None, "");
        match Renderable::object(object) {
            Ok(renderable) => handler.render(self, &template, renderable),
            Err(e) => handler.render_error(self, &template, &e),
        }
    }

    fn render_default(self) -> Self {
        let handler = self.mustache().clone();
        let template =
            template_name::resolve(handler.config(), None, self.state(), self.path());
        let renderable = assigns_renderable(&self);
        handler.render(self, &template, renderable)
    }

    fn template_properties(&self, renderable: Renderable) -> TemplateProperties {
        self.mustache().properties(self, renderable)
    }

    fn mustache(&self) -> &MustacheHandler {
        self.state()
            .expect("MustacheConnExt called without running the MustacheHandler first")
    }
}

fn assigns_renderable(conn: &Conn) -> Renderable {
    conn.assigns()
        .map(Assigns::to_renderable)
        .unwrap_or_default()
}
