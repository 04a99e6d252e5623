mod pool;
mod sib_vec;
mod word;
pub use pool::*;
pub use sib_vec::*;
pub use word::*;
