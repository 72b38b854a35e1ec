//! Core runtime types, tables, and term handling.

mod convert;
mod pattern;
mod table;
mod types;

pub use self::convert::FromTerm;
pub use self::convert::IntoTerm;
pub use self::convert::TermError;
pub use self::pattern::Bindings;
pub use self::pattern::Pattern;
pub use self::pattern::PatternError;
pub use self::pattern::PatternSet;
pub use self::table::AtomTable;
pub use self::table::AtomTableError;
pub use self::types::Atom;
pub use self::types::Pid;
pub use self::types::Reference;
pub use self::types::Term;
