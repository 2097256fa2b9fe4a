// Encoder, classifier and the lazy-loading prediction pipeline
pub mod ml;

// Symbol-level orchestration over the collaborator ports
pub mod prediction_service;
