// Adapters layer: readers for the files produced by the experiment
// (trial logs, MATLAB recordings) and log discovery on disk.

pub mod discovery;
pub mod mat;
pub mod table;
