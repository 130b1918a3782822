use crate::{Error, MustacheConfig, Result};
use mustache::{Context, Data, Template};
use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Debug, Formatter},
    fs,
    path::{Component, Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

/**
The template factory.

`Templates` locates template files across the configured resource
roots, compiles them, and (outside of [`Mode::Dev`](crate::Mode::Dev))
keeps each compilation for the lifetime of the process. Templates can
also be registered from strings, which is mostly useful for tests and
for applications that embed their templates.

```
use trillium_mustache::{MustacheConfig, Templates};
# fn main() -> trillium_mustache::Result<()> {
let mut templates = Templates::new(MustacheConfig::new());
templates.register_template_string("greeting", "hello {{name}}")?;

let data = mustache::MapBuilder::new().insert_str("name", "mustache").build();
assert_eq!(templates.render("greeting", &data)?, "hello mustache");
# Ok(()) }
```
*/
pub struct Templates {
    config: MustacheConfig,
    registered: HashMap<String, Arc<Template>>,
    cache: RwLock<HashMap<String, Arc<Template>>>,
}

impl Debug for Templates {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let cached = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect::<Vec<_>>();

        f.debug_struct("Templates")
            .field("config", &self.config)
            .field("registered", &self.registered.keys().collect::<Vec<_>>())
            .field("cached", &cached)
            .finish()
    }
}

impl Default for Templates {
    fn default() -> Self {
        Self::new(MustacheConfig::default())
    }
}

impl From<MustacheConfig> for Templates {
    fn from(config: MustacheConfig) -> Self {
        Self::new(config)
    }
}

impl Templates {
    /// builds a new template factory
    pub fn new(config: MustacheConfig) -> Self {
        let roots = config.search_roots();
        log::debug!(
            "{} template resource roots registered: {:?}",
            roots.len(),
            roots
        );

        Self {
            config,
            registered: HashMap::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// the [`MustacheConfig`] this factory was built with
    pub fn config(&self) -> &MustacheConfig {
        &self.config
    }

    /// Compiles a template from a string and registers it under
    /// `name`. Registered templates take precedence over files, and
    /// any partials they reference are resolved against the first
    /// resource root.
    pub fn register_template_string(
        &mut self,
        name: impl Into<String>,
        source: impl AsRef<str>,
    ) -> Result<()> {
        let name = name.into();
        let root = self
            .config
            .search_roots()
            .into_iter()
            .next()
            .unwrap_or_else(|| PathBuf::from("."));

        let template = self.compile(&name, &root, source.as_ref())?;
        log::debug!("registered template {name:?}");
        self.registered.insert(name, Arc::new(template));
        Ok(())
    }

    /// Retrieves a compiled template by name, compiling it if
    /// needed.
    pub fn get(&self, name: &str) -> Result<Arc<Template>> {
        validate_name(name)?;

        if let Some(template) = self.registered.get(name) {
            return Ok(Arc::clone(template));
        }

        if !self.config.mode().caches_templates() {
            return self.load(name).map(Arc::new);
        }

        if let Some(template) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(Arc::clone(template));
        }

        let template = Arc::new(self.load(name)?);
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(
            cache.entry(name.to_string()).or_insert(template),
        ))
    }

    /// Executes the named template with the provided data.
    pub fn render(&self, name: &str, data: &Data) -> Result<String> {
        let template = self.get(name)?;
        let mut bytes = vec![];
        template
            .render_data(&mut bytes, data)
            .map_err(|source| Error::Render {
                name: name.to_string(),
                source,
            })?;
        Ok(String::from_utf8(bytes)?)
    }

    /**
    Compiles every template under every resource root ahead of the
    first request, returning the number of templates compiled. In
    [`Mode::Dev`](crate::Mode::Dev) nothing is cached, so this returns
    zero without reading anything.
    */
    pub fn precompile(&self) -> Result<usize> {
        if !self.config.mode().caches_templates() {
            return Ok(0);
        }

        let mut names = HashSet::new();
        for root in self.config.search_roots() {
            let pattern = root.join("**").join(format!("*{}", self.config.extension()));
            for file in glob::glob(&pattern.to_string_lossy())?.flatten() {
                let Some(name) = template_name_within(&root, &file) else {
                    continue;
                };

                if !names.contains(&name) {
                    self.get(&name)?;
                    names.insert(name);
                }
            }
        }

        let count = names.len();
        log::debug!("precompiled {count} templates");
        Ok(count)
    }

    fn load(&self, name: &str) -> Result<Template> {
        let roots = self.config.search_roots();
        for root in &roots {
            let path = root.join(name);
            if path.is_file() {
                let source = fs::read_to_string(&path)?;
                log::debug!("compiling template {name:?} from {path:?}");
                return self.compile(name, root, &source);
            }
        }

        Err(Error::TemplateNotFound {
            name: name.to_string(),
            roots,
        })
    }

    fn compile(&self, name: &str, root: &Path, source: &str) -> Result<Template> {
        let mut context = Context::new(root.to_path_buf());
        context.template_extension = self.config.extension().trim_start_matches('.').to_string();
        context
            .compile(source.chars())
            .map_err(|source| Error::Compile {
                name: name.to_string(),
                source,
            })
    }
}

fn validate_name(name: &str) -> Result<()> {
    let path = Path::new(name);
    let valid = !name.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidTemplateName(name.to_string()))
    }
}

fn template_name_within(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let name = relative
        .components()
        .map(|component| component.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?
        .join("/");
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mode;
    use mustache::MapBuilder;

    fn fixtures() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
    }

    #[test]
    fn names_are_validated() {
        assert!(validate_name("views/users/show.mustache").is_ok());
        assert!(validate_name("./views/index.mustache").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("../secrets.mustache").is_err());
        assert!(validate_name("views/../../secrets.mustache").is_err());
        assert!(validate_name("/etc/passwd").is_err());
    }

    #[test]
    fn registered_templates_win() -> Result<()> {
        let mut templates = Templates::new(MustacheConfig::new().with_root(fixtures()));
        templates.register_template_string("views/index.mustache", "registered")?;
        let data = MapBuilder::new().build();
        assert_eq!(templates.render("views/index.mustache", &data)?, "registered");
        Ok(())
    }

    #[test]
    fn falls_back_across_roots() -> Result<()> {
        let templates = Templates::new(
            MustacheConfig::new()
                .with_root(fixtures().join("does-not-exist"))
                .with_fallback_root(fixtures()),
        );

        let data = MapBuilder::new().insert_str("name", "fallback").build();
        assert_eq!(
            templates.render("views/hello.mustache", &data)?.trim(),
            "hello fallback!"
        );
        Ok(())
    }

    #[test]
    fn missing_templates_list_searched_roots() {
        let templates = Templates::new(MustacheConfig::new().with_root(fixtures()));
        match templates.get("views/nope.mustache") {
            Err(Error::TemplateNotFound { name, roots }) => {
                assert_eq!(name, "views/nope.mustache");
                assert_eq!(roots, vec![fixtures()]);
            }
            other => panic!("expected TemplateNotFound, got {:?}", other.err()),
        }
    }

    #[test]
    fn compile_errors_are_reported() {
        let mut templates = Templates::default();
        assert!(matches!(
            templates.register_template_string("broken", "{{#open}} never closed"),
            Err(Error::Compile { name, .. }) if name == "broken"
        ));
    }

    #[test]
    fn caching_depends_on_mode() -> Result<()> {
        let root = std::env::temp_dir().join(format!(
            "trillium-mustache-cache-{}",
            std::process::id()
        ));
        fs::create_dir_all(&root)?;
        let file = root.join("page.mustache");
        let data = MapBuilder::new().build();

        fs::write(&file, "first")?;
        let dev = Templates::new(MustacheConfig::new().with_root(&root));
        let prod = Templates::new(MustacheConfig::new().with_root(&root).with_mode(Mode::Prod));
        assert_eq!(dev.render("page.mustache", &data)?, "first");
        assert_eq!(prod.render("page.mustache", &data)?, "first");

        fs::write(&file, "second")?;
        assert_eq!(dev.render("page.mustache", &data)?, "second");
        assert_eq!(prod.render("page.mustache", &data)?, "first");

        fs::remove_dir_all(&root)?;
        Ok(())
    }

    #[test]
    fn precompile_warms_the_cache() -> Result<()> {
        let templates =
            Templates::new(MustacheConfig::new().with_root(fixtures()).with_mode(Mode::Test));
        let count = templates.precompile()?;
        assert!(count >= 3);
        assert!(templates
            .cache
            .read()
            .unwrap()
            .contains_key("views/hello.mustache"));

        let shadowed = Templates::new(
            MustacheConfig::new()
                .with_root(fixtures())
                .with_fallback_root(fixtures())
                .with_mode(Mode::Test),
        );
        assert_eq!(shadowed.precompile()?, count);

        let dev = Templates::new(MustacheConfig::new().with_root(fixtures()));
        assert_eq!(dev.precompile()?, 0);
        Ok(())
    }

    #[test]
    fn partials_resolve_relative_to_the_root() -> Result<()> {
        let templates = Templates::new(MustacheConfig::new().with_root(fixtures()));
        let data = MapBuilder::new().insert_str("title", "partials").build();
        assert_eq!(
            templates.render("views/with_partial.mustache", &data)?.trim(),
            "<h1>partials</h1>\nbody"
        );
        Ok(())
    }
}
