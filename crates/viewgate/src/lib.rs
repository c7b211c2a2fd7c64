pub mod cache;
pub use cache::{MemoryCache, ReadCache};

pub mod collector;
pub use collector::{Collector, Lifecycle, Node, TreeCollector};

mod engine;
pub use engine::{Engine, ExecStats, ReadStats, TxMode};

mod session;
pub use session::Session;

pub mod testing;

pub use viewgate_core::{
    driver, metrics, schema, selector, stmt, Error, Result, Selector, View,
};
pub use viewgate_sql::{BatchData, DataUnit, Executable, Exclusions, Matcher};
