//! Exports the [`Renderer`], which loads templates by name from a templates
//! directory and renders them against a [`Value`] context. Each builder owns
//! its own [`Renderer`], so there is no process-wide template configuration.

use gtmpl::{Context, Template, Value};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Loads and renders templates relative to a templates directory.
pub struct Renderer {
    templates_directory: PathBuf,
}

impl Renderer {
    pub fn new(templates_directory: &Path) -> Renderer {
        Renderer {
            templates_directory: templates_directory.to_owned(),
        }
    }

    /// Loads the template file `name` (relative to the templates directory)
    /// and parses it.
    pub fn template(&self, name: &Path) -> Result<Template> {
        use std::io::Read;
        let mut contents = String::new();
        File::open(self.templates_directory.join(name))
            .and_then(|mut file| file.read_to_string(&mut contents))
            .map_err(|err| Error::new(name, format!("opening template: {}", err)))?;

        let mut template = Template::default();
        template
            .parse(&contents)
            .map_err(|err| Error::new(name, err.to_string()))?;
        Ok(template)
    }

    /// Renders an already-loaded `template` against `context`. `name` is
    /// only used to annotate errors.
    pub fn execute(&self, name: &Path, template: &Template, context: Value) -> Result<String> {
        let context = Context::from(context).map_err(|err| Error::new(name, err.to_string()))?;
        let mut buf: Vec<u8> = Vec::new();
        template
            .execute(&mut buf, &context)
            .map_err(|err| Error::new(name, err.to_string()))?;
        String::from_utf8(buf).map_err(|err| Error::new(name, err.to_string()))
    }

    /// Loads the template `name` and renders it against `context`.
    pub fn render(&self, name: &Path, context: Value) -> Result<String> {
        let template = self.template(name)?;
        self.execute(name, &template, context)
    }
}

/// Engine messages longer than this are cut; gtmpl may echo the whole
/// context, including the full post listing.
const MAX_MESSAGE_CHARS: usize = 240;

/// The result of a fallible template operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a template that couldn't be loaded, parsed, or executed.
#[derive(Debug)]
pub struct Error {
    /// The template name, relative to the templates directory.
    pub template: PathBuf,

    /// The id of the post being rendered, if any.
    pub post: Option<String>,

    /// What went wrong, as reported by the I/O layer or the template engine.
    pub message: String,
}

impl Error {
    fn new(template: &Path, mut message: String) -> Error {
        if let Some((end, _)) = message.char_indices().nth(MAX_MESSAGE_CHARS) {
            message.truncate(end);
            message.push_str("...");
        }
        Error {
            template: template.to_owned(),
            post: None,
            message,
        }
    }

    /// Attributes the error to the post with the given id.
    pub fn for_post(self, id: &str) -> Error {
        Error {
            post: Some(id.to_owned()),
            ..self
        }
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.post {
            Some(post) => write!(
                f,
                "render error: post `{}`: template `{}`: {}",
                post,
                self.template.display(),
                self.message
            ),
            None => write!(
                f,
                "render error: template `{}`: {}",
                self.template.display(),
                self.message
            ),
        }
    }
}

impl std::error::Error for Error {}
