pub mod answer_client;

pub use answer_client::{parse_answers, AnswerClient, FillFormRequest};
