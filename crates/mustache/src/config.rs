use crate::{Error, Result};
use std::{
    env,
    ffi::OsString,
    fmt::{self, Display, Formatter},
    path::{Path, PathBuf},
    str::FromStr,
};

/**
The environment an application runs in.

In [`Mode::Dev`] every request recompiles its template from disk, so
edits are visible immediately. [`Mode::Test`] and [`Mode::Prod`]
compile each template once and share the compilation across requests.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// recompile templates on every request
    #[default]
    Dev,
    /// cache compiled templates
    Test,
    /// cache compiled templates and ignore the development root
    Prod,
}

impl Mode {
    /// whether compiled file templates are kept between requests
    pub fn caches_templates(self) -> bool {
        !matches!(self, Mode::Dev)
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match &*s.trim().to_ascii_lowercase() {
            "dev" | "development" => Ok(Self::Dev),
            "test" => Ok(Self::Test),
            "prod" | "production" => Ok(Self::Prod),
            _ => Err(Error::InvalidMode(s.to_string())),
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Dev => "dev",
            Mode::Test => "test",
            Mode::Prod => "prod",
        })
    }
}

/**
# Configuration for mustache rendering

The defaults are:
* mode: [`Mode::Dev`]
* roots: `["."]`
* development root: none
* extension: `.mustache`
* legacy suffix: `.ftl.html`
* error template: `views/system/500internalServerError.mustache`
* content type: `text/html; charset=utf-8`
* context path: `""`
* languages: none (any requested language is accepted)
* language cookie: `TRILLIUM_LANG`

```
use trillium_mustache::{Mode, MustacheConfig};

let config = MustacheConfig::new()
    .with_mode(Mode::Prod)
    .with_root("templates")
    .with_context_path("/app")
    .with_languages(["en", "de"]);

assert_eq!(config.mode(), Mode::Prod);
assert_eq!(config.default_language(), Some("en"));
```
*/
#[derive(Clone, Debug)]
pub struct MustacheConfig {
    mode: Mode,
    roots: Vec<PathBuf>,
    development_root: Option<PathBuf>,
    extension: String,
    legacy_suffix: Option<String>,
    error_template: String,
    content_type: String,
    context_path: String,
    languages: Vec<String>,
    language_cookie: String,
}

impl Default for MustacheConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            roots: vec![PathBuf::from(".")],
            development_root: None,
            extension: String::from(".mustache"),
            legacy_suffix: Some(String::from(".ftl.html")),
            error_template: String::from("views/system/500internalServerError.mustache"),
            content_type: String::from("text/html; charset=utf-8"),
            context_path: String::new(),
            languages: vec![],
            language_cookie: String::from("TRILLIUM_LANG"),
        }
    }
}

impl MustacheConfig {
    /// constructs a config with the defaults listed above
    pub fn new() -> Self {
        Self::default()
    }

    /**
    Builds a config from the defaults overlaid with any of the
    following environment variables:

    * `TRILLIUM_ENV`: dev, test, or prod
    * `MUSTACHE_TEMPLATE_ROOTS`: a platform path list (`:`-separated on
      unix) that replaces the default roots
    * `MUSTACHE_DEVELOPMENT_ROOT`
    * `MUSTACHE_EXTENSION`
    * `MUSTACHE_ERROR_TEMPLATE`
    * `MUSTACHE_CONTEXT_PATH`
    * `MUSTACHE_LANGUAGES`: comma separated, the first is the default
    * `MUSTACHE_LANGUAGE_COOKIE`
    */
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var_os(key))
    }

    /// Like [`MustacheConfig::from_env`], reading variables through
    /// `lookup` rather than the process environment.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<OsString>) -> Result<Self> {
        let var = |key: &str| lookup(key).and_then(|value| value.into_string().ok());
        let mut config = Self::default();

        if let Some(mode) = var("TRILLIUM_ENV") {
            config.mode = mode.parse()?;
        }

        if let Some(roots) = lookup("MUSTACHE_TEMPLATE_ROOTS") {
            let roots = env::split_paths(&roots).collect::<Vec<_>>();
            if !roots.is_empty() {
                config.roots = roots;
            }
        }

        if let Some(root) = lookup("MUSTACHE_DEVELOPMENT_ROOT") {
            config.development_root = Some(root.into());
        }

        if let Some(extension) = var("MUSTACHE_EXTENSION") {
            config = config.with_extension(extension);
        }

        if let Some(error_template) = var("MUSTACHE_ERROR_TEMPLATE") {
            config.error_template = error_template;
        }

        if let Some(context_path) = var("MUSTACHE_CONTEXT_PATH") {
            config.context_path = context_path;
        }

        if let Some(languages) = var("MUSTACHE_LANGUAGES") {
            config = config.with_languages(
                languages
                    .split(',')
                    .map(str::trim)
                    .filter(|language| !language.is_empty()),
            );
        }

        if let Some(cookie) = var("MUSTACHE_LANGUAGE_COOKIE") {
            config.language_cookie = cookie;
        }

        log::debug!("mustache configured from environment: {config:?}");
        Ok(config)
    }

    /// sets the [`Mode`]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// replaces all resource roots with a single root
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots = vec![root.into()];
        self
    }

    /// appends a fallback resource root, searched after the existing
    /// roots
    pub fn with_fallback_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// Sets a root that is searched before every other root, but only
    /// outside of [`Mode::Prod`] and only if the directory exists. This
    /// is useful for serving templates straight from a source checkout
    /// during development.
    pub fn with_development_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.development_root = Some(root.into());
        self
    }

    /// sets the template file extension. a leading `.` is added if
    /// missing.
    pub fn with_extension(mut self, extension: impl AsRef<str>) -> Self {
        let extension = extension.as_ref().trim_start_matches('.');
        self.extension = format!(".{extension}");
        self
    }

    /// sets a foreign template suffix that is rewritten to this
    /// config's extension when it ends an explicit template name
    pub fn with_legacy_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.legacy_suffix = Some(suffix.into());
        self
    }

    /// disables legacy suffix rewriting
    pub fn without_legacy_suffix(mut self) -> Self {
        self.legacy_suffix = None;
        self
    }

    /// sets the template rendered when another template fails
    pub fn with_error_template(mut self, error_template: impl Into<String>) -> Self {
        self.error_template = error_template.into();
        self
    }

    /// sets the content-type header sent with rendered templates
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// sets the value available to templates as `{{contextPath}}`
    pub fn with_context_path(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = context_path.into();
        self
    }

    /// sets the supported languages. The first language is the
    /// default when a request does not ask for a supported language.
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    /// sets the name of the cookie that carries an explicit language
    pub fn with_language_cookie(mut self, cookie_name: impl Into<String>) -> Self {
        self.language_cookie = cookie_name.into();
        self
    }

    /// the configured [`Mode`]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The roots that are searched for templates, in order. This
    /// includes the development root when it applies.
    pub fn search_roots(&self) -> Vec<PathBuf> {
        let development_root = self
            .development_root
            .as_deref()
            .filter(|_| self.mode != Mode::Prod)
            .filter(|root| root.is_dir());

        development_root
            .map(Path::to_path_buf)
            .into_iter()
            .chain(self.roots.iter().cloned())
            .collect()
    }

    /// the template file extension, including the leading `.`
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// the foreign template suffix, if rewriting is enabled
    pub fn legacy_suffix(&self) -> Option<&str> {
        self.legacy_suffix.as_deref()
    }

    /// the error template name
    pub fn error_template(&self) -> &str {
        &self.error_template
    }

    /// the content type for rendered templates
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// the context path
    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// the supported languages
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// the first supported language
    pub fn default_language(&self) -> Option<&str> {
        self.languages.first().map(String::as_str)
    }

    /// the language cookie name
    pub fn language_cookie(&self) -> &str {
        &self.language_cookie
    }
}
