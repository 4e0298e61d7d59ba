use std::sync::Arc;

use smart_form_filler::dom::{quote_attr, DomEvent, Document};
use smart_form_filler::infrastructure::MemoryPage;
use smart_form_filler::models::{
    AnswerMap, ExtractTrigger, FailureReason, FieldKind, FieldStatus, NoticeLevel, Outbound, Request, Response,
};
use smart_form_filler::{FillExecutor, FormSession, SchemaExtractor, SessionState};

const FORM_URL: &str = "https://docs.google.com/forms/d/e/abc/viewform";

const NAME_AND_COLOUR: &str = r#"
<form>
  <div role="listitem">
    <div role="heading">Full Name</div>
    <input type="text" name="entry.123">
  </div>
  <div role="listitem">
    <div role="heading">Colour</div>
    <label><input type="radio" name="entry.9" value="red"><span>Red</span></label>
    <label><input type="radio" name="entry.9" value="blue"><span>Blue</span></label>
  </div>
</form>
"#;

fn checked(doc: &Document, name: &str) -> Vec<String> {
    doc.query_all(&format!("input[name={}]", quote_attr(name)))
        .unwrap()
        .into_iter()
        .filter(|id| doc.is_checked(*id))
        .map(|id| doc.attr(id, "value").unwrap_or_default().to_string())
        .collect()
}

#[test]
fn test_text_field_end_to_end() {
    let mut doc = Document::parse(NAME_AND_COLOUR).with_url(FORM_URL);
    let schema = SchemaExtractor::for_document(&doc).extract(&doc);

    let name = schema.field("entry.123").unwrap();
    assert_eq!(name.kind, FieldKind::Text);
    assert_eq!(name.label, "Full Name");
    assert!(!name.required);

    let mut answers = AnswerMap::new();
    answers.insert("entry.123", "Jane Doe");
    let report = FillExecutor::new(&mut doc).fill(&schema, &answers).unwrap();

    assert_eq!((report.result.filled, report.result.failed), (1, 0));
    let input = doc.query(r#"input[name="entry.123"]"#).unwrap().unwrap();
    assert_eq!(doc.value(input), "Jane Doe");
    assert_eq!(
        doc.events_for(input),
        vec![DomEvent::Focus, DomEvent::Input, DomEvent::Change, DomEvent::Blur]
    );
}

#[test]
fn test_radio_refill_is_idempotent() {
    let mut doc = Document::parse(NAME_AND_COLOUR).with_url(FORM_URL);
    let schema = SchemaExtractor::for_document(&doc).extract(&doc);
    let mut answers = AnswerMap::new();
    answers.insert("entry.9", "blue");

    for _ in 0..2 {
        let report = FillExecutor::new(&mut doc).fill(&schema, &answers).unwrap();
        assert_eq!(report.result.filled, 1);
        assert_eq!(checked(&doc, "entry.9"), vec!["blue"]);
    }
}

#[test]
fn test_unmatched_option_reports_reason() {
    let mut doc = Document::parse(NAME_AND_COLOUR).with_url(FORM_URL);
    let schema = SchemaExtractor::for_document(&doc).extract(&doc);
    let mut answers = AnswerMap::new();
    answers.insert("entry.9", "green");
    answers.insert("entry.123", "Sam");

    let report = FillExecutor::new(&mut doc).fill(&schema, &answers).unwrap();
    assert_eq!(report.result.attempted, 2);
    assert_eq!(report.result.filled, 1);
    let colour = report
        .outcomes
        .iter()
        .find(|o| o.entry == "entry.9")
        .unwrap();
    assert_eq!(
        colour.status,
        FieldStatus::Failed(FailureReason::NoMatchingOption)
    );
    assert!(checked(&doc, "entry.9").is_empty());
}

#[tokio::test]
async fn test_session_fill_persists_into_page() {
    let page = Arc::new(MemoryPage::new(NAME_AND_COLOUR).with_url(FORM_URL));
    let (session, mut events) = FormSession::new(Arc::clone(&page));

    let answers: AnswerMap =
        AnswerMap::from_json_str(r#"{"entry.123": "Jane Doe", "entry.9": "Blue"}"#).unwrap();
    let response = session.handle(Request::FillAnswers { answers }).await;

    let Response::FillResult(result) = response else {
        panic!("意外的应答: {:?}", response);
    };
    assert_eq!((result.filled, result.failed), (2, 0));
    assert_eq!(session.state().await, SessionState::Filled);

    let doc = page.document().await;
    let input = doc.query(r#"input[name="entry.123"]"#).unwrap().unwrap();
    assert_eq!(doc.value(input), "Jane Doe");
    assert_eq!(checked(&doc, "entry.9"), vec!["blue"]);

    let mut notices = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let Outbound::Notice(notice) = event {
            notices.push(notice);
        }
    }
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Success);
    assert_eq!(notices[0].message, "✅ Filled 2/2 fields successfully!");
}

#[tokio::test]
async fn test_session_refill_keeps_single_radio() {
    let page = Arc::new(MemoryPage::new(NAME_AND_COLOUR).with_url(FORM_URL));
    let (session, _events) = FormSession::new(Arc::clone(&page));
    let mut answers = AnswerMap::new();
    answers.insert("entry.9", "blue");

    session.fill(&answers).await.unwrap();
    let second = session.fill(&answers).await.unwrap();

    assert_eq!(second.result.filled, 1);
    assert_eq!(checked(&page.document().await, "entry.9"), vec!["blue"]);
}

#[tokio::test]
async fn test_names_and_values_needing_css_escapes() {
    let page = Arc::new(MemoryPage::new(
        r#"<form><fieldset>
             <legend>Tricky</legend>
             <label><input type="radio" name="q&quot;1\x" value="a&quot;b"><span>First</span></label>
             <label><input type="radio" name="q&quot;1\x" value="c\d&#10;e"><span>Second</span></label>
           </fieldset></form>"#,
    ));
    let (session, _events) = FormSession::new(Arc::clone(&page));

    let schema = session.extract(ExtractTrigger::Request).await.unwrap();
    let field = schema.field("q\"1\\x").unwrap();
    let values: Vec<&str> = field.options.iter().map(|o| o.value.as_str()).collect();
    assert_eq!(values, vec!["a\"b", "c\\d\ne"]);

    let mut answers = AnswerMap::new();
    answers.insert("q\"1\\x", "c\\d\ne");
    let report = session.fill(&answers).await.unwrap();

    assert_eq!((report.result.filled, report.result.failed), (1, 0));
    assert_eq!(checked(&page.document().await, "q\"1\\x"), vec!["c\\d\ne"]);
}
