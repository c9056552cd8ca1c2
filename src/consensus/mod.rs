pub mod explain;
pub mod result;
pub mod selector;
pub mod spread;
