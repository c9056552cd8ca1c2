pub mod csv_inputs;
pub mod csv_sink;
pub mod format;
pub mod manifest;
