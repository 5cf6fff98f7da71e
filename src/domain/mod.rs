// Domain layer: trial-log and recording models plus the check port.

pub mod model;
pub mod ports;
pub mod recording;
