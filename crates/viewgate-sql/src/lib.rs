mod batch;
pub use batch::BatchData;

mod builder;
pub use builder::{build, render_placeholders, Exclusions};

mod executable;
pub use executable::Executable;

pub mod expand;
pub use expand::{Criteria, CriteriaColumn, ExpanderRegistry, Expression};

mod matcher;
pub use matcher::Matcher;

mod unit;
pub use unit::{DataUnit, Pending, SequenceAllocator};
