//! Mailbox parsing: the frame reader, line rewrite rules, lenient message
//! parsing and header/date decoding.

pub mod header;
pub mod mbox;
pub mod message;
pub mod rules;

pub use mbox::{Frame, FrameReader, SENTINEL};
