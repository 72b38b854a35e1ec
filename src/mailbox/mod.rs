//! Mailboxes and the registry that addresses them.

mod mailbox;
mod queue;
mod registry;

pub use self::mailbox::Mailbox;
pub use self::queue::BlockingQueue;
pub use self::registry::MailboxRegistry;
pub use self::registry::RegistryError;
