//! Output: message serialization and the destination mailbox writer.

pub mod mbox;
pub mod message;

pub use mbox::MboxWriter;
pub use message::{message_to_bytes, write_message};
