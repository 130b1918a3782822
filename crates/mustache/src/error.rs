use std::{path::PathBuf, string::FromUtf8Error};

/// Concrete errors that occur while locating, compiling or rendering a
/// mustache template
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// the template name was empty, absolute, or contained a `..`
    /// component
    #[error("invalid template name {0:?}")]
    InvalidTemplateName(String),

    /// no template by this name exists in any of the resource roots
    #[error("template {name:?} not found in {roots:?}")]
    TemplateNotFound {
        /// the requested template name
        name: String,
        /// every root that was searched, in order
        roots: Vec<PathBuf>,
    },

    /// the template could not be compiled
    #[error("could not compile template {name:?}: {source}")]
    Compile {
        /// the template name
        name: String,
        /// the underlying mustache error
        source: mustache::Error,
    },

    /// the template compiled but failed while executing
    #[error("could not render template {name:?}: {source}")]
    Render {
        /// the template name
        name: String,
        /// the underlying mustache error
        source: mustache::Error,
    },

    /// a template rendered to bytes that were not utf-8
    #[error(transparent)]
    Utf8(#[from] FromUtf8Error),

    /// [`std::io::Error`]
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// a payload could not be serialized into template data
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),

    /// an unknown [`Mode`](crate::Mode) name
    #[error("unknown mode {0:?}, expected one of dev, test, prod")]
    InvalidMode(String),

    /// a messages properties file contained a line that was not a
    /// `key=value` pair
    #[error("{path}:{line}: expected `key=value`")]
    MessagesParse {
        /// the file being read
        path: PathBuf,
        /// the 1-based line number
        line: usize,
    },

    /// the glob used to precompile templates was invalid
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
}

/// this crate's result type
pub type Result<T, E = Error> = std::result::Result<T, E>;
