mod account;
mod levels;

pub use account::*;
pub use levels::*;
