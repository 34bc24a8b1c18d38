//! The library code for the `webgen` static site generator. A build is driven
//! entirely by a YAML descriptor and happens in two steps:
//!
//! 1. Loading the descriptor into a [`config::Descriptor`] ([`crate::config`])
//! 2. Building the site from it ([`crate::build`])
//!
//! The second step is itself a single linear pass:
//!
//! 1. Rendering the index page
//! 2. Copying the declared files into the site directory
//! 3. Rendering each local post to `{directory}/{id}/index.html` and copying
//!    its artefacts next to it
//! 4. Writing the Atom feed, if one is configured
//!
//! Posts are either local (rendered here) or external (links to content
//! hosted elsewhere). Both kinds appear in the `posts` listing handed to
//! every template, but only local posts produce files.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod copy;
pub mod feed;
pub mod markdown;
pub mod post;
pub mod render;
pub mod write;
