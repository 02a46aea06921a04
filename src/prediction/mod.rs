pub mod commentary;
pub mod predictor;

pub use commentary::{
    extract_text, fetch_commentary, CommentaryError, CommentaryMode, GeminiClient, ProxyGenerator,
    TextGenerator, ANALYSIS_FALLBACK, CONFIDENCE_FALLBACK,
};
pub use predictor::{PredictionClient, PredictionError, PredictionFeatures};
