pub mod exp;
pub mod vote;

pub use exp::*;
pub use vote::*;
