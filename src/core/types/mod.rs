//! Fundamental runtime types: atoms, pids, references, and terms.

mod atom;
mod pid;
mod reference;
mod term;

pub use self::atom::Atom;
pub use self::pid::Pid;
pub use self::reference::Reference;
pub use self::term::Term;
