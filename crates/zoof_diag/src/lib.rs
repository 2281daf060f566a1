pub mod report;
pub mod source;
pub mod style;

pub use report::{Level, Loc, Report};
pub use source::Source;
pub use style::Style;
