pub mod patient;
pub mod record;

pub use patient::*;
pub use record::*;
