mod builder;
mod cache;
mod extract;
mod reader;
mod types;

pub use builder::*;
pub use cache::*;
pub use extract::*;
pub use reader::*;
pub use types::*;
