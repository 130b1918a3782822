//! Naming the template for a response.

use crate::MustacheConfig;
use std::borrow::Cow;

/**
The controller and action that handled a request, used to name its
template when the response does not name one explicitly. Stored in
conn state by
[`MustacheConnExt::with_controller`](crate::MustacheConnExt::with_controller).
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerRoute {
    /// the controller, such as `ApplicationController` or `admin/Users`
    pub controller: Cow<'static, str>,
    /// the action, such as `index`
    pub action: Cow<'static, str>,
}

/**
Resolves the template for a response. The first of these that applies
wins:

1. an explicit template name, with a trailing legacy suffix replaced by
   the configured extension
2. the controller route: `views/<controller>/<action><extension>`
3. the request path: `views/<path><extension>`, where `/` is `index`

```
use std::borrow::Cow;
use trillium_mustache::{template_name::resolve, ControllerRoute, MustacheConfig};

let config = MustacheConfig::new();
let route = ControllerRoute { controller: Cow::Borrowed("Users"), action: Cow::Borrowed("show") };

assert_eq!(resolve(&config, Some("views/home.ftl.html"), Some(&route), "/"), "views/home.mustache");
assert_eq!(resolve(&config, None, Some(&route), "/"), "views/Users/show.mustache");
assert_eq!(resolve(&config, None, None, "/"), "views/index.mustache");
assert_eq!(resolve(&config, None, None, "/users/show/"), "views/users/show.mustache");
```
*/
pub fn resolve(
    config: &MustacheConfig,
    explicit: Option<&str>,
    route: Option<&ControllerRoute>,
    path: &str,
) -> String {
    if let Some(explicit) = explicit {
        return rewrite_legacy_suffix(config, explicit);
    }

    if let Some(ControllerRoute { controller, action }) = route {
        let controller = controller.trim_matches('/');
        return format!("views/{controller}/{action}{}", config.extension());
    }

    for_path(config, path)
}

/// `views/<path><extension>`, with an empty path treated as `index`
pub fn for_path(config: &MustacheConfig, path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path = path.trim_matches('/');
    let path = if path.is_empty() { "index" } else { path };
    format!("views/{path}{}", config.extension())
}

/// the template rendered when rendering another template fails
pub fn error_template(config: &MustacheConfig) -> &str {
    config.error_template()
}

fn rewrite_legacy_suffix(config: &MustacheConfig, name: &str) -> String {
    match config
        .legacy_suffix()
        .and_then(|suffix| name.strip_suffix(suffix))
    {
        Some(stem) => format!("{stem}{}", config.extension()),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(controller: &'static str, action: &'static str) -> ControllerRoute {
        ControllerRoute {
            controller: controller.into(),
            action: action.into(),
        }
    }

    #[test]
    fn explicit_names_win() {
        let config = MustacheConfig::new();
        let route = route("Users", "show");
        assert_eq!(
            resolve(&config, Some("views/custom.mustache"), Some(&route), "/x"),
            "views/custom.mustache"
        );
        assert_eq!(
            resolve(&config, Some("views/custom.ftl.html"), None, "/x"),
            "views/custom.mustache"
        );
        assert_eq!(
            resolve(&config, Some("views/custom.html"), None, "/x"),
            "views/custom.html"
        );
    }

    #[test]
    fn legacy_suffix_is_configurable() {
        let config = MustacheConfig::new()
            .with_extension("html")
            .with_legacy_suffix(".hbs");
        assert_eq!(
            resolve(&config, Some("page.hbs"), None, "/"),
            "page.html"
        );

        let config = MustacheConfig::new().without_legacy_suffix();
        assert_eq!(
            resolve(&config, Some("page.ftl.html"), None, "/"),
            "page.ftl.html"
        );
    }

    #[test]
    fn controller_routes() {
        let config = MustacheConfig::new();
        assert_eq!(
            resolve(&config, None, Some(&route("/admin/Users/", "index")), "/ignored"),
            "views/admin/Users/index.mustache"
        );
    }

    #[test]
    fn paths() {
        let config = MustacheConfig::new();
        assert_eq!(for_path(&config, ""), "views/index.mustache");
        assert_eq!(for_path(&config, "//"), "views/index.mustache");
        assert_eq!(for_path(&config, "/about"), "views/about.mustache");
        assert_eq!(for_path(&config, "/about?x=y"), "views/about.mustache");
        assert_eq!(error_template(&config), "views/system/500internalServerError.mustache");
    }
}
