use crate::post::{LocalPost, INDEX_FILE};
use crate::render::{Error as RenderError, Renderer};
use gtmpl::{Template, Value};
use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Responsible for templating and writing HTML pages to disk.
pub struct Writer<'a> {
    /// Loads and executes the index and post templates.
    pub renderer: &'a Renderer,

    /// The site's base URL. This is made available to every template as
    /// `base_url`.
    pub base_url: &'a str,

    /// The directory in which pages are written. The index page is located
    /// at `{site_directory}/index.html` and post pages at
    /// `{site_directory}/{directory}/{id}/index.html`.
    pub site_directory: &'a Path,

    /// The listing of every post, local and external (see
    /// [`crate::post::listing`]). This is made available to every template as
    /// `posts`.
    pub listing: Value,
}

/// A [`LocalPost`] with its page-level context: its neighbours among the
/// local posts and its rendered body, if any.
pub struct PostPage<'a> {
    pub post: &'a LocalPost,
    pub prev: Option<&'a LocalPost>,
    pub next: Option<&'a LocalPost>,
    pub body: Option<String>,
}

impl Writer<'_> {
    /// Renders `context` with `template` and writes the result to
    /// `file_path`, creating its parent directory.
    fn write_page(
        &self,
        name: &Path,
        template: &Template,
        mut context: HashMap<String, Value>,
        file_path: &Path,
    ) -> Result<()> {
        context.insert(
            "base_url".to_owned(),
            Value::String(self.base_url.to_owned()),
        );
        context.insert("posts".to_owned(), self.listing.clone());

        let rendered = self
            .renderer
            .execute(name, template, Value::Object(context))?;
        if let Some(dir) = file_path.parent() {
            std::fs::create_dir_all(dir).map_err(|err| Error::Io {
                path: dir.to_owned(),
                err,
            })?;
        }
        std::fs::write(file_path, rendered).map_err(|err| Error::Io {
            path: file_path.to_owned(),
            err,
        })?;
        debug!("Wrote `{}`", file_path.display());
        Ok(())
    }

    /// Renders the index template into `{site_directory}/index.html`. The
    /// context has the fields `base_url` and `posts`.
    pub fn write_index(&self, index_template: &Path) -> Result<PathBuf> {
        let template = self.renderer.template(index_template)?;
        let file_path = self.site_directory.join(INDEX_FILE);
        self.write_page(index_template, &template, HashMap::new(), &file_path)?;
        Ok(file_path)
    }

    /// Renders a post page into `{site_directory}/{directory}/{id}/index.html`.
    /// The context has the fields of [`LocalPost::to_value`] plus `body`,
    /// `prev`, `next`, and `posts`.
    pub fn write_post(&self, name: &Path, template: &Template, page: PostPage) -> Result<PathBuf> {
        let mut context = match page.post.to_value(self.base_url) {
            Value::Object(m) => m,
            _ => HashMap::new(),
        };

        let url_to_value = |post: Option<&LocalPost>| match post {
            Some(post) => Value::String(post.url(self.base_url)),
            None => Value::Nil,
        };
        context.insert("prev".to_owned(), url_to_value(page.prev));
        context.insert("next".to_owned(), url_to_value(page.next));
        context.insert(
            "body".to_owned(),
            match page.body {
                Some(body) => Value::String(body),
                None => Value::Nil,
            },
        );

        let post = page.post;
        let file_path = post.page_path(self.site_directory);
        self.write_page(name, template, context, &file_path)
            .map_err(|err| err.for_post(&post.id))?;
        Ok(file_path)
    }
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Render(RenderError),

    /// An error writing the output file or creating its directory.
    Io { path: PathBuf, err: io::Error },
}

impl Error {
    /// Attributes a render failure to the post with the given id. I/O
    /// failures already name the offending file.
    fn for_post(self, id: &str) -> Error {
        match self {
            Error::Render(err) => Error::Render(err.for_post(id)),
            err => err,
        }
    }
}

impl From<RenderError> for Error {
    /// Converts a [`RenderError`] into an [`Error`]. This allows us to use the
    /// `?` operator for fallible template operations.
    fn from(err: RenderError) -> Error {
        Error::Render(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Render(err) => err.fmt(f),
            Error::Io { path, err } => {
                write!(f, "write error: `{}`: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Render(err) => Some(err),
            Error::Io { path: _, err } => Some(err),
        }
    }
}
