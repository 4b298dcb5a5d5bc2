// Domain layer: the service record, its parser and the ports (interfaces) to the
// geocoding and search collaborators.

pub mod model;
pub mod ports;
