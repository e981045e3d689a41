pub mod layout;
pub mod mailbox;
pub mod presenter;
pub mod snapshot;
