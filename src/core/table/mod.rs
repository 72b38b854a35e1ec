//! Process-wide tables.

mod atom_table;

pub use self::atom_table::AtomTable;
pub use self::atom_table::AtomTableError;
