//! IMAP command handlers for the fake server.
//!
//! One module per command the probe receiver issues during a mailbox
//! check: CAPABILITY, LOGIN, LOGOUT, NOOP, SELECT, UID SEARCH, and
//! UID FETCH.

mod noop;
mod uid_search;

pub use self::{
    capability::handle_capability, login::handle_login, logout::handle_logout, noop::handle_noop,
    select::handle_select, uid_fetch::handle_uid_fetch, uid_search::handle_uid_search,
};
