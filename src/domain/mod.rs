//! Domain model: records kept in the spreadsheet and their value objects
pub mod aggregates;
pub mod value_objects;
