//! Core library for jiraclone
//!
//! This crate implements the **Functional Core** of the jiraclone application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! - **`jiraclone_core`** (this crate): Pure transformation functions with zero I/O
//! - **`jiraclone`**: HTTP calls, prompts, and orchestration (the Imperative Shell)
//!
//! Nothing in here talks to Jira. Functions take parsed responses (or plain
//! values) and return new values, so every one of them can be tested with
//! fixture data.
//!
//! # Module Organization
//!
//! - [`adf`]: Atlassian Document Format model, plain text extraction and the
//!   media to link rewrite used when cloning descriptions
//! - [`atlassian`]: Jira wire types, response transforms and request payloads
//! - [`clone`]: Clone naming, duplicate detection and attachment bookkeeping
//! - [`due_date`]: Relative (`2W`, `3D`) and absolute due date resolution
//! - [`selection`]: Parsing of interactive "pick issues by number" input
//! - [`settings`]: Clone settings from a JSON file merged with CLI flags
//! - [`translate`]: Japanese detection and segment-wise translation
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use jiraclone_core::adf::{replace_media_with_links, AdfNode, AttachmentMap};
//!
//! let description = AdfNode::from_value(&issue["fields"]["description"]);
//! let attachments: AttachmentMap = [("shot.png", "https://jira/att/1")].into_iter().collect();
//!
//! let rewritten = replace_media_with_links(&description, &attachments);
//! ```

pub mod adf;
pub mod atlassian;
pub mod clone;
pub mod due_date;
pub mod selection;
pub mod settings;
pub mod translate;
