mod tagger;

pub use tagger::{AutoTagger, TaggingSummary};
