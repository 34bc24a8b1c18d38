//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: rendering the index page
//! ([`crate::write`]), copying the declared files ([`crate::copy`]), rendering
//! each local post and copying its artefacts, and generating the Atom feed
//! ([`crate::feed`]). Steps run in that order and the first error stops the
//! build; files written by earlier steps stay on disk.

use crate::config::{BlogSpec, Descriptor};
use crate::copy::{self, Error as CopyError};
use crate::feed::{write_feed, Error as FeedError};
use crate::markdown;
use crate::post::{listing, LocalPost, Post};
use crate::render::{Error as RenderError, Renderer};
use crate::write::{Error as WriteError, PostPage, Writer};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// What a successful build produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// The number of rendered HTML pages.
    pub pages: usize,

    /// The number of copied files, including post artefacts.
    pub files: usize,
}

/// Builds the site from a [`Descriptor`]. Every invocation is a full rebuild.
pub fn build_site(descriptor: &Descriptor) -> Result<Summary> {
    let site_directory = &descriptor.site_directory;
    std::fs::create_dir_all(site_directory).map_err(|err| Error::Write {
        path: site_directory.to_owned(),
        err,
    })?;

    let posts: &[Post] = match &descriptor.blog {
        Some(blog) => &blog.posts,
        None => &[],
    };
    let renderer = Renderer::new(&descriptor.templates_directory);
    let writer = Writer {
        renderer: &renderer,
        base_url: &descriptor.base_url,
        site_directory,
        listing: listing(posts, &descriptor.base_url),
    };
    let mut summary = Summary::default();

    info!("Rendering index page");
    writer.write_index(&descriptor.index.index_template)?;
    summary.pages += 1;

    if !descriptor.copy.files.is_empty() {
        info!("Copying {} file(s)", descriptor.copy.files.len());
    }
    for (src, dst) in &descriptor.copy.files {
        summary.files += copy::copy(src, &site_directory.join(dst))?;
    }

    if let Some(blog) = &descriptor.blog {
        build_blog(&writer, blog, &mut summary)?;

        if let Some(feed) = &blog.feed {
            let path = site_directory.join(&feed.path);
            info!("Writing feed `{}`", path.display());
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir).map_err(|err| Error::Write {
                    path: dir.to_owned(),
                    err,
                })?;
            }
            let file = File::create(&path).map_err(|err| Error::Write {
                path: path.clone(),
                err,
            })?;
            write_feed(feed, &descriptor.base_url, &blog.posts, file)?;
        }
    }

    debug!("Build finished: {:?}", summary);
    Ok(summary)
}

/// Renders every local post in declared order, each followed by its
/// artefacts. External posts are only part of the listing.
fn build_blog(writer: &Writer, blog: &BlogSpec, summary: &mut Summary) -> Result<()> {
    let locals: Vec<&LocalPost> = blog
        .posts
        .iter()
        .filter_map(|post| match post {
            Post::Local(post) => Some(post),
            Post::External(_) => None,
        })
        .collect();
    info!(
        "Rendering {} post(s) ({} external)",
        locals.len(),
        blog.posts.len() - locals.len()
    );

    let mut seen_ids: HashSet<&str> = HashSet::new();
    for post in &locals {
        if !seen_ids.insert(&post.id) {
            warn!("Post id `{}` is used more than once", post.id);
        }
    }

    let template = writer.renderer.template(&blog.post_template)?;
    for (i, post) in locals.iter().enumerate() {
        let body = match &post.source {
            Some(source) => Some(read_body(post, &blog.posts_content_directory.join(source))?),
            None => None,
        };
        let path = writer.write_post(
            &blog.post_template,
            &template,
            PostPage {
                post,
                prev: match i {
                    0 => None,
                    _ => Some(locals[i - 1]),
                },
                next: locals.get(i + 1).copied(),
                body,
            },
        )?;
        debug!("Rendered post `{}` to `{}`", post.id, path.display());
        summary.pages += 1;

        let output_directory = post.output_directory(writer.site_directory);
        for artefact in &post.artefacts {
            copy::copy_file(
                &blog.posts_content_directory.join(artefact),
                &output_directory.join(artefact),
            )?;
            summary.files += 1;
        }
    }
    Ok(())
}

fn read_body(post: &LocalPost, source: &Path) -> Result<String> {
    let contents = std::fs::read_to_string(source).map_err(|err| Error::Source {
        post: post.id.clone(),
        path: source.to_owned(),
        err,
    })?;
    let mut body = String::new();
    markdown::to_html(&mut body, &contents);
    Ok(body)
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Every variant is terminal for the
/// build.
#[derive(Debug)]
pub enum Error {
    /// Returned when a template is missing or fails to render.
    Render(RenderError),

    /// Returned when a post's markdown source can't be read.
    Source {
        post: String,
        path: PathBuf,
        err: std::io::Error,
    },

    /// Returned when an output file or directory can't be written.
    Write { path: PathBuf, err: std::io::Error },

    /// Returned when a copy source is missing or unreadable, or its
    /// destination can't be written.
    Copy {
        src: PathBuf,
        dst: PathBuf,
        err: std::io::Error,
    },

    /// Returned for errors writing the feed.
    Feed(FeedError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Render(err) => err.fmt(f),
            Error::Source { post, path, err } => write!(
                f,
                "render error: post `{}`: reading source `{}`: {}",
                post,
                path.display(),
                err
            ),
            Error::Write { path, err } => {
                write!(f, "write error: `{}`: {}", path.display(), err)
            }
            Error::Copy { src, dst, err } => write!(
                f,
                "copy error: `{}` -> `{}`: {}",
                src.display(),
                dst.display(),
                err
            ),
            Error::Feed(err) => write!(f, "write error: feed: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Render(err) => Some(err),
            Error::Source { err, .. } => Some(err),
            Error::Write { path: _, err } => Some(err),
            Error::Copy { err, .. } => Some(err),
            Error::Feed(err) => Some(err),
        }
    }
}

impl From<RenderError> for Error {
    /// Converts [`RenderError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: RenderError) -> Error {
        Error::Render(err)
    }
}

impl From<WriteError> for Error {
    /// Splits page-writing errors into render and write failures.
    fn from(err: WriteError) -> Error {
        match err {
            WriteError::Render(err) => Error::Render(err),
            WriteError::Io { path, err } => Error::Write { path, err },
        }
    }
}

impl From<CopyError> for Error {
    /// A destination directory that can't be created is a write failure;
    /// everything else is a copy failure.
    fn from(err: CopyError) -> Error {
        match err {
            CopyError::CreateDir { path, err } => Error::Write { path, err },
            CopyError::Copy { src, dst, err } => Error::Copy { src, dst, err },
        }
    }
}

impl From<FeedError> for Error {
    /// Converts [`FeedError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use tempfile::TempDir;
    use walkdir::WalkDir;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    const INDEX_TEMPLATE: &str =
        "<title>{{ .base_url }}</title>{{ range .posts }}<li>{{ .title }} {{ .url }}</li>{{ end }}";
    const POST_TEMPLATE: &str =
        "<h1>{{ .title }}</h1><p>{{ .id }} {{ .directory }} {{ .date }}</p>{{ range .artefacts }}<img src=\"{{ . }}\">{{ end }}{{ if .body }}{{ .body }}{{ end }}";

    /// A project directory with templates, a content directory holding one
    /// artefact, and a static stylesheet.
    fn project() -> std::io::Result<TempDir> {
        let dir = TempDir::new()?;
        let root = dir.path();
        std::fs::create_dir_all(root.join("templates"))?;
        std::fs::write(root.join("templates/index.html"), INDEX_TEMPLATE)?;
        std::fs::write(root.join("templates/post.html"), POST_TEMPLATE)?;
        std::fs::create_dir_all(root.join("content/images"))?;
        std::fs::write(root.join("content/images/image.jpg"), b"\xff\xd8jpeg")?;
        std::fs::write(root.join("content/hello.md"), "Some *markdown*.")?;
        std::fs::create_dir_all(root.join("static"))?;
        std::fs::write(root.join("static/style.css"), "body { color: red }")?;
        Ok(dir)
    }

    fn descriptor(root: &Path, yaml: &str) -> config::Result<Descriptor> {
        Descriptor::parse(yaml, root)
    }

    const SITE: &str = r#"
base_url: https://example.org/
templates_directory: templates
site_directory: site
index:
  index_template: index.html
copy:
  files:
    - [static/style.css, css/style.css]
blog:
  posts_content_directory: content
  post_template: post.html
  feed:
    title: Example
  posts:
    - title: Hello
      id: p1
      directory: 2024/01/01
      artefacts: [images/image.jpg]
      source: hello.md
    - title: Ext
      url: https://x.com
"#;

    fn tree(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
        WalkDir::new(dir)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| {
                let contents = std::fs::read(entry.path()).unwrap_or_default();
                (entry.path().to_owned(), contents)
            })
            .collect()
    }

    #[test]
    fn test_build_site() -> TestResult {
        let dir = project()?;
        let root = dir.path();
        let summary = build_site(&descriptor(root, SITE)?)?;
        assert_eq!(Summary { pages: 2, files: 2 }, summary);

        let site = root.join("site");
        let index = std::fs::read_to_string(site.join("index.html"))?;
        assert_eq!(
            "<title>https://example.org/</title>\
             <li>Hello https://example.org/2024/01/01/p1/</li>\
             <li>Ext https://x.com/</li>",
            index
        );

        let post = std::fs::read_to_string(site.join("2024/01/01/p1/index.html"))?;
        assert!(post.starts_with("<h1>Hello</h1><p>p1 2024/01/01 2024-01-01</p>"), "{}", post);
        assert!(post.contains("<img src=\"images/image.jpg\">"), "{}", post);
        assert!(post.contains("<em>markdown</em>"), "{}", post);

        assert_eq!(
            std::fs::read(root.join("content/images/image.jpg"))?,
            std::fs::read(site.join("2024/01/01/p1/images/image.jpg"))?
        );
        assert_eq!(
            std::fs::read(root.join("static/style.css"))?,
            std::fs::read(site.join("css/style.css"))?
        );
        assert!(std::fs::read_to_string(site.join("feed.atom"))?
            .contains("https://example.org/2024/01/01/p1/"));
        Ok(())
    }

    #[test]
    fn test_external_posts_create_no_directories() -> TestResult {
        let dir = project()?;
        let root = dir.path();
        let yaml = r#"
base_url: https://example.org/
templates_directory: templates
site_directory: site
index: {index_template: index.html}
blog:
  posts_content_directory: content
  post_template: post.html
  posts:
    - {title: Ext, url: "https://x.com", id: ext, directory: 2024/01/01, artefacts: [images/image.jpg]}
"#;
        let summary = build_site(&descriptor(root, yaml)?)?;
        assert_eq!(Summary { pages: 1, files: 0 }, summary);

        let entries: Vec<_> = std::fs::read_dir(root.join("site"))?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect::<std::io::Result<_>>()?;
        assert_eq!(vec![std::ffi::OsString::from("index.html")], entries);
        assert!(std::fs::read_to_string(root.join("site/index.html"))?.contains("Ext https://x.com/"));
        Ok(())
    }

    #[test]
    fn test_build_is_idempotent() -> TestResult {
        let dir = project()?;
        let root = dir.path();
        let descriptor = descriptor(root, SITE)?;

        build_site(&descriptor)?;
        let first = tree(&root.join("site"));
        build_site(&descriptor)?;
        let second = tree(&root.join("site"));

        assert!(!first.is_empty());
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_missing_index_template_halts_before_copy() -> TestResult {
        let dir = project()?;
        let root = dir.path();
        std::fs::remove_file(root.join("templates/index.html"))?;

        match build_site(&descriptor(root, SITE)?) {
            Err(Error::Render(err)) => assert_eq!(PathBuf::from("index.html"), err.template),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("wanted an error"),
        }
        assert!(!root.join("site/css/style.css").exists());
        assert!(!root.join("site/2024").exists());
        Ok(())
    }

    #[test]
    fn test_missing_copy_source() -> TestResult {
        let dir = project()?;
        let root = dir.path();
        std::fs::remove_file(root.join("static/style.css"))?;

        match build_site(&descriptor(root, SITE)?) {
            Err(Error::Copy { src, dst, .. }) => {
                assert_eq!(root.join("static/style.css"), src);
                assert_eq!(root.join("site/css/style.css"), dst);
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("wanted an error"),
        }
        // the index was rendered before the copy failed
        assert!(root.join("site/index.html").exists());
        Ok(())
    }

    #[test]
    fn test_missing_artefact() -> TestResult {
        let dir = project()?;
        let root = dir.path();
        std::fs::remove_file(root.join("content/images/image.jpg"))?;

        match build_site(&descriptor(root, SITE)?) {
            Err(Error::Copy { src, .. }) => {
                assert_eq!(root.join("content/images/image.jpg"), src)
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("wanted an error"),
        }
        assert!(root.join("site/2024/01/01/p1/index.html").exists());
        Ok(())
    }

    #[test]
    fn test_missing_post_source() -> TestResult {
        let dir = project()?;
        let root = dir.path();
        std::fs::remove_file(root.join("content/hello.md"))?;

        match build_site(&descriptor(root, SITE)?) {
            Err(Error::Source { post, .. }) => assert_eq!("p1", post),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("wanted an error"),
        }
        Ok(())
    }

    #[test]
    fn test_missing_required_key_creates_no_site() -> TestResult {
        let dir = project()?;
        let root = dir.path();
        let path = root.join("descriptor.yaml");
        std::fs::write(
            &path,
            "templates_directory: templates\nsite_directory: site\nindex: {index_template: index.html}\n",
        )?;

        match Descriptor::load(&path) {
            Err(config::Error::MissingFields(fields)) => assert_eq!(vec!["base_url"], fields),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("wanted a configuration error"),
        }
        assert!(!root.join("site").exists());
        Ok(())
    }

    #[test]
    fn test_post_render_error_names_post() {
        let err: Error = WriteError::Render(RenderError {
            template: PathBuf::from("post.html"),
            post: Some(String::from("p1")),
            message: String::from("boom"),
        })
        .into();
        assert_eq!(
            "render error: post `p1`: template `post.html`: boom",
            err.to_string()
        );
    }

    #[test]
    fn test_site_without_blog() -> TestResult {
        let dir = project()?;
        let root = dir.path();
        let yaml = "base_url: /\ntemplates_directory: templates\nsite_directory: out/site\nindex: {index_template: index.html}\n";
        let summary = build_site(&descriptor(root, yaml)?)?;
        assert_eq!(Summary { pages: 1, files: 0 }, summary);
        assert_eq!(
            "<title>/</title>",
            std::fs::read_to_string(root.join("out/site/index.html"))?
        );
        Ok(())
    }
}
