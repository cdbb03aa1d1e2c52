pub mod exp;
pub mod votes;
