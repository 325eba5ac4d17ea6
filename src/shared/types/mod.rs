pub mod errors;
pub mod money;

pub use errors::*;
pub use money::*;
