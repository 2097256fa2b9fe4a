pub mod feature_layout;

pub use feature_layout::{
    EMBEDDING_DIM, EmbeddingVector, FEATURE_DIM, FeatureVector, MAX_HEADLINES, PriceQuad,
    PriceRatios, derive_ratios,
};
