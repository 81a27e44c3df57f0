// Domain layer: models and ports (traits implemented by the engine adapters).

pub mod model;
pub mod ports;
