//! `eudora2tbird` — repair Eudora Rescue mailboxes for Thunderbird.
//!
//! This crate reads an mbox produced by Eudora Rescue, fixes broken headers,
//! charsets and dates, turns Eudora's proprietary markup back into MIME parts,
//! reattaches embedded objects and attachments from disk, and writes a
//! Thunderbird-compatible mbox.

pub mod codec;
pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod repair;
pub mod report;
