mod attributes;
mod constant_pool;
pub mod java_str;
pub(crate) mod parser;
mod structs;

pub use attributes::*;
pub use constant_pool::*;
pub use structs::*;
