pub mod answers;
pub mod fill;
pub mod message;
pub mod schema;

pub use answers::{AnswerMap, AnswerValue};
pub use fill::{FailureReason, FieldOutcome, FieldStatus, FillReport, FillResult};
pub use message::{ExtractTrigger, Notice, NoticeLevel, Outbound, Request, Response};
pub use schema::{FieldDescriptor, FieldKind, FormSchema, OptionDescriptor};
