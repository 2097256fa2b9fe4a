// Domain-specific error types
pub mod errors;

// Feature layout shared by the encoder and classifier
pub mod ml;

// Port interfaces
pub mod ports;
