pub mod frontier;
pub mod returns;
