//! Defines the [`Post`] type and the derived locations of a post: its output
//! directory, its page file, and its URL. Also defines how posts are
//! converted into template values (see [`LocalPost::to_value`] and
//! [`Post::summarize`]).

use chrono::NaiveDate;
use gtmpl::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

/// The file name of every rendered page.
pub const INDEX_FILE: &str = "index.html";

/// The format post directories are expected to follow if they carry a date.
const DATE_DIRECTORY_FORMAT: &str = "%Y/%m/%d";

/// A blog post entry from the descriptor. The kind is decided once, at load
/// time, by the presence of a `url` key.
#[derive(Clone, Debug, PartialEq)]
pub enum Post {
    /// A post rendered and hosted on this site.
    Local(LocalPost),

    /// A post hosted elsewhere. It never renders a page nor copies
    /// artefacts; it only shows up in post listings.
    External(ExternalPost),
}

#[derive(Clone, Debug, PartialEq)]
pub struct LocalPost {
    pub title: String,

    /// The last path segment of the post's output directory. Expected to be
    /// unique across posts.
    pub id: String,

    /// A date-like relative directory, e.g. `2024/01/01`, stored without
    /// leading or trailing slashes.
    pub directory: String,

    /// Files relative to the posts content directory which are copied next
    /// to the rendered page, keeping their relative path.
    pub artefacts: Vec<PathBuf>,

    /// An optional markdown source, relative to the posts content directory,
    /// whose HTML becomes the post `body`.
    pub source: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExternalPost {
    pub title: String,
    pub url: Url,
}

impl LocalPost {
    /// `{site_directory}/{directory}/{id}`
    pub fn output_directory(&self, site_directory: &Path) -> PathBuf {
        site_directory.join(&self.directory).join(&self.id)
    }

    /// `{site_directory}/{directory}/{id}/index.html`
    pub fn page_path(&self, site_directory: &Path) -> PathBuf {
        self.output_directory(site_directory).join(INDEX_FILE)
    }

    /// `{base_url}{directory}/{id}/`
    pub fn url(&self, base_url: &str) -> String {
        join_url(base_url, &format!("{}/{}/", self.directory, self.id))
    }

    /// The post's date, if its directory reads as `YYYY/MM/DD`.
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.directory, DATE_DIRECTORY_FORMAT).ok()
    }

    /// Converts the post into a [`Value::Object`] with the fields `title`,
    /// `id`, `directory`, `base_url`, `artefacts`, `url`, and `date` (nil
    /// when the directory isn't a date). The page-level fields (`body`,
    /// `prev`, `next`, `posts`) are added by [`crate::write`].
    pub fn to_value(&self, base_url: &str) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), Value::String(self.title.clone()));
        m.insert("id".to_owned(), Value::String(self.id.clone()));
        m.insert(
            "directory".to_owned(),
            Value::String(self.directory.clone()),
        );
        m.insert("base_url".to_owned(), Value::String(base_url.to_owned()));
        m.insert(
            "artefacts".to_owned(),
            Value::Array(
                self.artefacts
                    .iter()
                    .map(|a| Value::String(a.to_string_lossy().into_owned()))
                    .collect(),
            ),
        );
        m.insert("url".to_owned(), Value::String(self.url(base_url)));
        m.insert("date".to_owned(), date_to_value(self.date()));
        Value::Object(m)
    }
}

impl Post {
    pub fn title(&self) -> &str {
        match self {
            Post::Local(post) => &post.title,
            Post::External(post) => &post.title,
        }
    }

    /// The URL a listing should link to: the rendered page for local posts
    /// and the declared URL for external ones.
    pub fn url(&self, base_url: &str) -> String {
        match self {
            Post::Local(post) => post.url(base_url),
            Post::External(post) => post.url.to_string(),
        }
    }

    /// Converts the post into a listing entry with the fields `title`,
    /// `url`, and `external`. Local posts also carry `id`, `directory`, and
    /// `date`.
    pub fn summarize(&self, base_url: &str) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), Value::String(self.title().to_owned()));
        m.insert("url".to_owned(), Value::String(self.url(base_url)));
        m.insert(
            "external".to_owned(),
            Value::Bool(matches!(self, Post::External(_))),
        );
        if let Post::Local(post) = self {
            m.insert("id".to_owned(), Value::String(post.id.clone()));
            m.insert(
                "directory".to_owned(),
                Value::String(post.directory.clone()),
            );
            m.insert("date".to_owned(), date_to_value(post.date()));
        }
        Value::Object(m)
    }
}

/// Builds the listing of all posts, local and external, in declared order.
pub fn listing(posts: &[Post], base_url: &str) -> Value {
    Value::Array(posts.iter().map(|p| p.summarize(base_url)).collect())
}

/// Appends `path` to `base_url`, inserting a `/` between them if `base_url`
/// doesn't already end with one.
pub fn join_url(base_url: &str, path: &str) -> String {
    if base_url.is_empty() || base_url.ends_with('/') {
        format!("{}{}", base_url, path)
    } else {
        format!("{}/{}", base_url, path)
    }
}

fn date_to_value(date: Option<NaiveDate>) -> Value {
    match date {
        Some(date) => Value::String(date.format("%Y-%m-%d").to_string()),
        None => Value::Nil,
    }
}
