//! The library code for the `postlist` static blog generator. A build runs
//! in three steps:
//!
//! 1. Loading posts from a [`crate::source::PostSource`], by default
//!    markdown files with YAML front matter ([`crate::source`])
//! 2. Selecting and ordering them ([`crate::lister`]): drafts and posts
//!    dated in the future are dropped and the rest are sorted newest first
//! 3. Rendering the listed posts to disk ([`crate::write`],
//!    [`crate::feed`])
//!
//! The second step is the only one with any decisions in it, and it is a
//! pure function of the loaded posts and the build time. Listing pages add a
//! display snippet and an eager or lazy image loading hint to each entry;
//! the first few entries on a page load their images eagerly.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod feed;
pub mod lister;
pub mod logging;
pub mod markdown;
pub mod post;
pub mod source;
pub mod tag;
pub mod write;
