pub mod error;
pub mod script_file;
pub mod script_graph;
