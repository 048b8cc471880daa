//! Fake mail path for integration testing
//!
//! This module provides an in-process rendition of the mail path a
//! probe travels: a fake SMTP server that accepts the probe and a
//! fake IMAP server that hands it back, wired to one shared message
//! store. What goes in through SMTP comes back out through IMAP,
//! which is enough to run the whole send/poll/validate lifecycle
//! against localhost.
//!
//! ## Module layout
//!
//! - `smtp` -- ESMTP dialogue, trace-header stamping, delivery knobs
//! - `imap` -- TCP listener, STARTTLS/TLS setup, command dispatch
//! - `handlers/` -- one file per IMAP command (SELECT, UID SEARCH, etc.)
//! - `store` -- shared mailbox model both servers work against
//! - `io` -- shared write-and-flush helper

mod handlers;
mod io;

pub use imap::FakeImapServer;
pub use smtp::{DeliveryOptions, FakeSmtpServer};
pub use store::MailStore;
