// Domain layer: stats/export models and the ports the host and exporters talk through.

pub mod model;
pub mod ports;
