//! Support for creating Atom feeds from the blog's local posts.

use crate::config::FeedSpec;
use crate::post::{LocalPost, Post};
use atom_syndication::{Entry, Error as AtomError, Feed, Link, Person};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use std::fmt;
use std::io::Write;

/// Creates a feed from a [`FeedSpec`] and the blog's posts and writes the
/// result to a [`std::io::Write`]. Only [`Post::Local`] posts become entries.
pub fn write_feed<W: Write>(spec: &FeedSpec, base_url: &str, posts: &[Post], w: W) -> Result<()> {
    feed(spec, base_url, posts).write_to(w)?;
    Ok(())
}

fn feed(spec: &FeedSpec, base_url: &str, posts: &[Post]) -> Feed {
    let entries: Vec<Entry> = posts
        .iter()
        .filter_map(|post| match post {
            Post::Local(post) => Some(entry(post, base_url)),
            Post::External(_) => None,
        })
        .collect();

    // The feed is as fresh as its newest entry rather than the wall clock;
    // rebuilding an unchanged site must reproduce the same bytes.
    let updated = entries
        .iter()
        .map(|entry| *entry.updated())
        .max()
        .unwrap_or_else(epoch);

    let mut feed = Feed::default();
    feed.set_title(match spec.title.is_empty() {
        true => base_url.to_owned(),
        false => spec.title.clone(),
    });
    feed.set_id(base_url.to_owned());
    feed.set_updated(updated);
    feed.set_links(vec![alternate(base_url.to_owned())]);
    if let Some(author) = &spec.author {
        let mut person = Person::default();
        person.set_name(author.clone());
        feed.set_authors(vec![person]);
    }
    feed.set_entries(entries);
    feed
}

fn entry(post: &LocalPost, base_url: &str) -> Entry {
    let url = post.url(base_url);
    let date = match post.date() {
        Some(date) => midnight(date),
        None => epoch(),
    };

    let mut entry = Entry::default();
    entry.set_id(url.clone());
    entry.set_title(post.title.clone());
    entry.set_updated(date);
    entry.set_published(Some(date));
    entry.set_links(vec![alternate(url)]);
    entry
}

fn alternate(href: String) -> Link {
    let mut link = Link::default();
    link.set_href(href);
    link.set_rel("alternate".to_owned());
    link
}

fn midnight(date: NaiveDate) -> DateTime<FixedOffset> {
    match date.and_hms_opt(0, 0, 0) {
        Some(naive) => Utc.from_utc_datetime(&naive).into(),
        None => epoch(),
    }
}

fn epoch() -> DateTime<FixedOffset> {
    DateTime::<Utc>::default().into()
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem writing a feed.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is an Atom-related error, including I/O on the
    /// underlying writer.
    Atom(AtomError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Atom(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Atom(err) => Some(err),
        }
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::ExternalPost;
    use std::path::PathBuf;
    use url::Url;

    fn posts() -> Vec<Post> {
        vec![
            Post::Local(LocalPost {
                title: String::from("Hello"),
                id: String::from("p1"),
                directory: String::from("2024/01/01"),
                artefacts: Vec::new(),
                source: None,
            }),
            Post::Local(LocalPost {
                title: String::from("Later"),
                id: String::from("p2"),
                directory: String::from("2024/03/15"),
                artefacts: Vec::new(),
                source: None,
            }),
            Post::External(ExternalPost {
                title: String::from("Ext"),
                url: Url::parse("https://x.com").expect("valid url"),
            }),
        ]
    }

    fn spec() -> FeedSpec {
        FeedSpec {
            path: PathBuf::from("feed.atom"),
            title: String::new(),
            author: Some(String::from("Jane")),
        }
    }

    #[test]
    fn test_feed_entries() {
        let feed = feed(&spec(), "https://example.org/", &posts());
        assert_eq!(2, feed.entries().len());
        assert_eq!("https://example.org/2024/01/01/p1/", feed.entries()[0].id());
        assert_eq!("https://example.org/", feed.id());
        assert_eq!(
            midnight(NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date")),
            *feed.updated()
        );
        assert_eq!("Jane", feed.authors()[0].name());
    }

    #[test]
    fn test_dates_are_utc() {
        let date = midnight(NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"));
        assert_eq!("2024-01-01T00:00:00+00:00", date.to_rfc3339());
        assert_eq!("1970-01-01T00:00:00+00:00", epoch().to_rfc3339());
    }

    #[test]
    fn test_empty_feed_is_reproducible() -> Result<()> {
        let mut first = Vec::new();
        let mut second = Vec::new();
        write_feed(&spec(), "https://example.org/", &[], &mut first)?;
        write_feed(&spec(), "https://example.org/", &[], &mut second)?;
        assert_eq!(first, second);
        assert_eq!(epoch(), *feed(&spec(), "/", &[]).updated());
        Ok(())
    }
}
