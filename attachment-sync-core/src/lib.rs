#![doc = "attachment-sync-core: core logic library for attachment-sync."]

//! This crate holds the data model, trait seams and pipelines for moving file
//! attachments between a work-item board and a document/page system.
//! Transport (HTTP clients, server, CLI) lives in the `attachment-sync` crate.
//!
//! # Layout
//! - [`contract`]: data model and the `BoardApi` / `PageApi` / `MediaFetcher` traits
//! - [`assets`], [`crawler`]: discovering media references on either side
//! - [`pipeline`]: bounded-concurrency download and size-policy re-hosting
//! - [`writer`]: destination writers
//! - [`matcher`]: page URL → board item
//! - [`ledger`]: de-duplication of already transferred blocks
//! - [`synchronise`]: the two end-to-end flows

pub mod assets;
pub mod contract;
pub mod crawler;
pub mod error;
pub mod ledger;
pub mod matcher;
pub mod media;
pub mod pipeline;
pub mod synchronise;
pub mod writer;

pub use error::{SyncError, SyncResult};
