// Domain layer: recipients, messages, dispatch results and the ports the core talks through.

pub mod model;
pub mod ports;
