//! Loads the site [`Descriptor`] from a YAML file. The file is first
//! deserialized into loosely-typed `Raw*` structs (every key optional) and
//! then validated into the immutable [`Descriptor`], so that every missing
//! required key can be reported in a single [`Error::MissingFields`].

use crate::post::{ExternalPost, LocalPost, Post};
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// The default location of the Atom feed, relative to the site directory.
pub const DEFAULT_FEED_PATH: &str = "feed.atom";

/// Everything needed to build a site. One [`Descriptor`] is loaded per build
/// invocation and never mutated afterwards.
#[derive(Clone, Debug)]
pub struct Descriptor {
    /// The URL prefix for every page on the site, e.g.
    /// `https://example.org/`. Post URLs are built by appending
    /// `{directory}/{id}/` to it.
    pub base_url: String,

    /// The directory template names are resolved against.
    pub templates_directory: PathBuf,

    /// The root output directory.
    pub site_directory: PathBuf,

    pub index: IndexSpec,
    pub copy: CopySpec,

    /// The blog section is optional; a site without one only gets its index
    /// page and copied files.
    pub blog: Option<BlogSpec>,
}

#[derive(Clone, Debug)]
pub struct IndexSpec {
    /// Template name relative to [`Descriptor::templates_directory`].
    pub index_template: PathBuf,
}

#[derive(Clone, Debug, Default)]
pub struct CopySpec {
    /// `(src, dst)` pairs in declared order. `src` is already resolved;
    /// `dst` stays relative to [`Descriptor::site_directory`].
    pub files: Vec<(PathBuf, PathBuf)>,
}

#[derive(Clone, Debug)]
pub struct BlogSpec {
    /// Post artefacts and markdown sources are read from here.
    pub posts_content_directory: PathBuf,

    /// Template name relative to [`Descriptor::templates_directory`].
    pub post_template: PathBuf,

    pub posts: Vec<Post>,

    pub feed: Option<FeedSpec>,
}

/// Where and how to write the blog's Atom feed.
#[derive(Clone, Debug)]
pub struct FeedSpec {
    /// Output path relative to [`Descriptor::site_directory`].
    pub path: PathBuf,
    pub title: String,
    pub author: Option<String>,
}

impl Descriptor {
    /// Reads and validates the descriptor file at `path`. Relative paths in
    /// the file are resolved against the directory containing it.
    pub fn load(path: &Path) -> Result<Descriptor> {
        let file = File::open(path).map_err(|err| Error::Open {
            path: path.to_owned(),
            err,
        })?;
        let raw: RawDescriptor = serde_yaml::from_reader(file)?;
        let root = match path.parent() {
            Some(parent) => parent.to_owned(),
            None => PathBuf::new(),
        };
        raw.validate(&root)
    }

    /// Parses a descriptor from YAML text, resolving relative paths against
    /// `root`.
    pub fn parse(yaml: &str, root: &Path) -> Result<Descriptor> {
        let raw: RawDescriptor = serde_yaml::from_str(yaml)?;
        raw.validate(root)
    }
}

/// Loads the descriptor at `path`. Shorthand for [`Descriptor::load`].
pub fn load(path: &Path) -> Result<Descriptor> {
    Descriptor::load(path)
}

#[derive(Deserialize, Default)]
struct RawDescriptor {
    base_url: Option<String>,
    templates_directory: Option<PathBuf>,
    site_directory: Option<PathBuf>,
    index: Option<RawIndex>,
    copy: Option<RawCopy>,
    blog: Option<RawBlog>,
}

#[derive(Deserialize, Default)]
struct RawIndex {
    index_template: Option<PathBuf>,
}

#[derive(Deserialize, Default)]
struct RawCopy {
    files: Option<Vec<(PathBuf, PathBuf)>>,
}

#[derive(Deserialize, Default)]
struct RawBlog {
    posts_content_directory: Option<PathBuf>,
    post_template: Option<PathBuf>,
    posts: Option<Vec<RawPost>>,
    feed: Option<RawFeed>,
}

#[derive(Deserialize, Default)]
struct RawPost {
    title: Option<String>,
    id: Option<String>,
    directory: Option<String>,
    artefacts: Option<Vec<PathBuf>>,
    source: Option<PathBuf>,
    url: Option<String>,
}

#[derive(Deserialize, Default)]
struct RawFeed {
    path: Option<PathBuf>,
    title: Option<String>,
    author: Option<String>,
}

/// Collects the names of missing required keys while validating.
#[derive(Default)]
struct Missing(Vec<String>);

impl Missing {
    fn require<T>(&mut self, value: Option<T>, field: &str) -> Option<T> {
        if value.is_none() {
            self.0.push(field.to_owned());
        }
        value
    }
}

impl RawDescriptor {
    fn validate(self, root: &Path) -> Result<Descriptor> {
        let mut missing = Missing::default();

        let base_url = missing.require(self.base_url, "base_url");
        let templates_directory =
            missing.require(self.templates_directory, "templates_directory");
        let site_directory = missing.require(self.site_directory, "site_directory");
        let index_template = missing.require(
            self.index.unwrap_or_default().index_template,
            "index.index_template",
        );

        let blog = match self.blog {
            Some(blog) => blog.validate(root, &mut missing)?,
            None => None,
        };

        let mut files = Vec::new();
        for (i, (src, dst)) in self
            .copy
            .unwrap_or_default()
            .files
            .unwrap_or_default()
            .into_iter()
            .enumerate()
        {
            contained(&format!("copy.files[{}]", i), &dst)?;
            files.push((root.join(src), dst));
        }

        match (base_url, templates_directory, site_directory, index_template) {
            (Some(base_url), Some(templates_directory), Some(site_directory), Some(index_template))
                if missing.0.is_empty() =>
            {
                Ok(Descriptor {
                    base_url,
                    templates_directory: root.join(templates_directory),
                    site_directory: root.join(site_directory),
                    index: IndexSpec { index_template },
                    copy: CopySpec { files },
                    blog,
                })
            }
            _ => Err(Error::MissingFields(missing.0)),
        }
    }
}

impl RawBlog {
    fn validate(self, root: &Path, missing: &mut Missing) -> Result<Option<BlogSpec>> {
        let posts_content_directory = missing.require(
            self.posts_content_directory,
            "blog.posts_content_directory",
        );
        let post_template = missing.require(self.post_template, "blog.post_template");

        let mut posts = Vec::new();
        for (i, raw) in self.posts.unwrap_or_default().into_iter().enumerate() {
            if let Some(post) = raw.validate(i, missing)? {
                posts.push(post);
            }
        }

        let feed = match self.feed {
            Some(feed) => {
                let path = feed.path.unwrap_or_else(|| PathBuf::from(DEFAULT_FEED_PATH));
                contained("blog.feed.path", &path)?;
                Some(FeedSpec {
                    path,
                    title: feed.title.unwrap_or_default(),
                    author: feed.author,
                })
            }
            None => None,
        };

        Ok(match (posts_content_directory, post_template) {
            (Some(posts_content_directory), Some(post_template)) => Some(BlogSpec {
                posts_content_directory: root.join(posts_content_directory),
                post_template,
                posts,
                feed,
            }),
            _ => None,
        })
    }
}

impl RawPost {
    /// Decides the post kind once: an entry with a `url` is an
    /// [`ExternalPost`] and every other key but `title` is ignored.
    fn validate(self, i: usize, missing: &mut Missing) -> Result<Option<Post>> {
        let field = |name: &str| format!("blog.posts[{}].{}", i, name);
        let title = missing.require(self.title, &field("title"));

        if let Some(url) = self.url {
            let url = Url::parse(&url).map_err(|err| Error::InvalidUrl {
                field: field("url"),
                err,
            })?;
            return Ok(title.map(|title| Post::External(ExternalPost { title, url })));
        }

        let id = missing.require(self.id, &field("id"));
        let directory = missing
            .require(self.directory, &field("directory"))
            .map(|directory| directory.trim_end_matches('/').to_owned());
        if let Some(id) = &id {
            contained(&field("id"), Path::new(id))?;
            if Path::new(id).components().count() != 1 {
                return Err(Error::UnsafePath {
                    field: field("id"),
                    path: PathBuf::from(id),
                });
            }
        }
        if let Some(directory) = &directory {
            contained(&field("directory"), Path::new(directory))?;
        }
        let artefacts = self.artefacts.unwrap_or_default();
        for (j, artefact) in artefacts.iter().enumerate() {
            contained(&field(&format!("artefacts[{}]", j)), artefact)?;
        }

        Ok(match (title, id, directory) {
            (Some(title), Some(id), Some(directory)) => Some(Post::Local(LocalPost {
                title,
                id,
                directory,
                artefacts,
                source: self.source,
            })),
            _ => None,
        })
    }
}

/// Checks that `path` stays below whatever directory it is joined onto: it
/// must be non-empty and made only of plain segments (no root, prefix, `.`,
/// or `..`).
fn contained(field: &str, path: &Path) -> Result<()> {
    let mut components = path.components().peekable();
    if components.peek().is_none()
        || !components.all(|component| matches!(component, Component::Normal(_)))
    {
        return Err(Error::UnsafePath {
            field: field.to_owned(),
            path: path.to_owned(),
        });
    }
    Ok(())
}

/// The result of loading a [`Descriptor`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading the descriptor: the file couldn't be opened,
/// wasn't valid YAML, lacked required keys, or contained a bad URL or an
/// output path escaping its directory.
#[derive(Debug)]
pub enum Error {
    /// Returned when the descriptor file can't be opened.
    Open { path: PathBuf, err: std::io::Error },

    /// Returned when the descriptor isn't valid YAML or has mistyped values.
    Parse(serde_yaml::Error),

    /// Returned when required keys are absent. Holds every missing key by
    /// its dotted name, e.g. `index.index_template`.
    MissingFields(Vec<String>),

    /// Returned when an external post URL can't be parsed.
    InvalidUrl { field: String, err: url::ParseError },

    /// Returned when an output path is absolute or climbs out of the
    /// directory it is relative to.
    UnsafePath { field: String, path: PathBuf },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Open { path, err } => write!(
                f,
                "configuration error: opening descriptor `{}`: {}",
                path.display(),
                err
            ),
            Error::Parse(err) => write!(f, "configuration error: {}", err),
            Error::MissingFields(fields) => write!(
                f,
                "configuration error: missing required keys: {}",
                fields.join(", ")
            ),
            Error::InvalidUrl { field, err } => {
                write!(f, "configuration error: `{}`: {}", field, err)
            }
            Error::UnsafePath { field, path } => write!(
                f,
                "configuration error: `{}`: `{}` must be a relative path without `.` or `..`",
                field,
                path.display()
            ),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Open { path: _, err } => Some(err),
            Error::Parse(err) => Some(err),
            Error::MissingFields(_) => None,
            Error::InvalidUrl { field: _, err } => Some(err),
            Error::UnsafePath { .. } => None,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::Parse(err)
    }
}
