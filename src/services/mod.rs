pub mod answer_matcher;
pub mod fill_executor;
pub mod schema_extractor;

pub use answer_matcher::{match_field, match_option, FieldMatch, MatchRule, OptionMatch};
pub use fill_executor::FillExecutor;
pub use schema_extractor::SchemaExtractor;
