//! The work units behind each pipeline mode.

pub mod finder;
pub mod manufacturers;
pub mod parameters;

pub use finder::{FinderProfile, FinderTarget, UrlFinder};
pub use manufacturers::{MANUFACTURER_HEADERS, ManufacturerSearch};
pub use parameters::ParameterTables;
