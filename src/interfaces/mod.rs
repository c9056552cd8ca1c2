pub mod input_source;
pub mod result_sink;
