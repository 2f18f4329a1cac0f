pub mod rules;
pub mod table;

pub use rules::Rules;
pub use table::QualifiedTable;
