use std::str::FromStr;
use std::time::Duration;

use kharcha_core::{Amount, Category};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::debug;

use crate::extract::parse_amount_str;
use crate::llm::{AiError, CompletionBackend, Conversation, Role};
use crate::pattern::re;
use crate::types::AiExtraction;

pub const SYSTEM_PROMPT: &str =
    "You extract structured data from payment receipts. You answer with a single JSON object and nothing else.";

const EXPECTED_KEYS: [&str; 4] = ["amount", "merchant", "category", "date"];
const NULL_LIKE: [&str; 6] = ["", "null", "none", "unknown", "n/a", "na"];

re!(re_reply_number, "Number in AI amount", r"\d[\d,]*(?:\.\d+)?");

/// The fixed instruction sent with every receipt.
pub fn build_prompt(text: &str) -> String {
    let categories = Category::ALL.map(Category::label).join("\", \"");
    format!(
        r#"Extract the payment details from this UPI transaction receipt text.

Return exactly one JSON object with these keys:
  "amount":   the amount paid as a number, without currency symbols or separators
  "merchant": the merchant or recipient name
  "category": one of "{categories}"
  "date":     the transaction date exactly as written on the receipt

Use null for any value that is not present. Do not add explanations, markdown or any text outside the JSON object.

Receipt text:
{text}"#
    )
}

/// Delegates extraction to a completion service and validates its reply.
pub struct AiParser<C> {
    backend: C,
    timeout: Duration,
}

impl<C: CompletionBackend> AiParser<C> {
    pub fn new(backend: C, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn backend(&self) -> &C {
        &self.backend
    }

    /// Ask the backend about `text`, recording the exchange in `conversation`.
    ///
    /// An empty conversation is seeded with the system prompt first.
    pub async fn parse(
        &self,
        text: &str,
        conversation: &mut Conversation,
    ) -> Result<AiExtraction, AiError> {
        if conversation.is_empty() {
            conversation.push(Role::System, SYSTEM_PROMPT);
        }
        conversation.push(Role::User, build_prompt(text));

        let reply = tokio::time::timeout(self.timeout, self.backend.complete(conversation))
            .await
            .map_err(|_| AiError::Timeout(self.timeout))??;
        conversation.push(Role::Assistant, reply.as_str());

        parse_reply(&reply)
    }
}

/// Locate the first JSON object in `reply` and validate it.
///
/// Every `{` is a candidate start, so braces in leading prose do not hide
/// the object that follows them.
pub fn parse_reply(reply: &str) -> Result<AiExtraction, AiError> {
    let mut first_err = None;
    for candidate in object_candidates(reply) {
        match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(map)) => return validate(map),
            Ok(_) => {}
            Err(e) => {
                first_err.get_or_insert(e);
            }
        }
    }
    Err(first_err.map_or(AiError::NoJson, AiError::MalformedJson))
}

fn validate(map: Map<String, Value>) -> Result<AiExtraction, AiError> {
    let fields: Map<String, Value> =
        map.into_iter().map(|(k, v)| (k.trim().to_lowercase(), v)).collect();

    if !EXPECTED_KEYS.iter().any(|k| fields.contains_key(*k)) {
        return Err(AiError::UnexpectedShape(format!(
            "none of {EXPECTED_KEYS:?} present"
        )));
    }

    let extraction = AiExtraction {
        amount: fields.get("amount").and_then(amount_value),
        merchant: fields.get("merchant").and_then(text_value),
        category: fields
            .get("category")
            .and_then(text_value)
            .and_then(|c| Category::from_str(&c).ok()),
        date: fields.get("date").and_then(text_value),
    };
    debug!(?extraction, "validated AI reply");
    Ok(extraction)
}

fn amount_value(v: &Value) -> Option<Amount> {
    let value = match v {
        Value::Number(n) => {
            let s = n.to_string();
            Decimal::from_str(&s)
                .or_else(|_| Decimal::from_scientific(&s))
                .ok()?
        }
        Value::String(s) => {
            let m = re_reply_number().ok()?.find(s)?;
            // Refunds and exponents are not amounts paid.
            if s[..m.start()].trim_end().ends_with('-')
                || s[m.end()..].starts_with(['e', 'E'])
            {
                return None;
            }
            parse_amount_str(m.as_str())?
        }
        _ => return None,
    };
    Amount::plausible(value)
}

fn text_value(v: &Value) -> Option<String> {
    let s = v.as_str()?.trim();
    (!NULL_LIKE.contains(&s.to_lowercase().as_str())).then(|| s.to_string())
}

/// Balanced `{...}` spans in start order, one per opening brace.
fn object_candidates(s: &str) -> impl Iterator<Item = &str> {
    s.char_indices()
        .filter(|(_, ch)| *ch == '{')
        .filter_map(move |(start, _)| balanced_object_at(s, start))
}

/// The balanced object opening at byte `start`, ignoring braces inside
/// string literals.
fn balanced_object_at(s: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (idx, ch) in s[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + idx + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockCompletion;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    // ── Prompt ────────────────────────────────────────────────────────────────

    #[test]
    fn prompt_embeds_text_and_category_enum() {
        let p = build_prompt("Paid to Zomato ₹450");
        assert!(p.contains("Paid to Zomato ₹450"));
        for c in Category::ALL {
            assert!(p.contains(c.label()), "missing {c}");
        }
    }

    // ── JSON location ─────────────────────────────────────────────────────────

    #[test]
    fn finds_object_inside_prose_and_fences() {
        let reply = "Sure! Here it is:\n```json\n{\"amount\": 450, \"merchant\": \"Zomato\"}\n```\nAnything else?";
        assert_eq!(
            object_candidates(reply).next(),
            Some("{\"amount\": 450, \"merchant\": \"Zomato\"}")
        );
    }

    #[test]
    fn braces_in_strings_do_not_close_the_object() {
        let reply = r#"{"merchant": "Brace } Cafe", "amount": 90} {"second": 1}"#;
        assert_eq!(
            object_candidates(reply).next(),
            Some(r#"{"merchant": "Brace } Cafe", "amount": 90}"#)
        );
    }

    #[test]
    fn unbalanced_or_absent_object() {
        assert_eq!(object_candidates("no json here").next(), None);
        assert_eq!(object_candidates("{\"amount\": 1").next(), None);
    }

    // ── Validation ────────────────────────────────────────────────────────────

    #[test]
    fn full_reply_validates() {
        let r = parse_reply(
            r#"{"amount": 450, "merchant": "Zomato", "category": "Food & Dining", "date": "12/05/2023"}"#,
        )
        .unwrap();
        assert_eq!(r.amount.unwrap().value(), dec("450"));
        assert_eq!(r.merchant.as_deref(), Some("Zomato"));
        assert_eq!(r.category, Some(Category::FoodAndDining));
        assert_eq!(r.date.as_deref(), Some("12/05/2023"));
    }

    #[test]
    fn string_amount_with_symbol_and_separators() {
        let r = parse_reply(r#"{"amount": "₹1,250.00", "merchant": null}"#).unwrap();
        assert_eq!(r.amount.unwrap().value(), dec("1250"));
        assert_eq!(r.merchant, None);
    }

    #[test]
    fn out_of_range_amount_is_dropped() {
        let r = parse_reply(r#"{"amount": 9876543210, "merchant": "Uber"}"#).unwrap();
        assert_eq!(r.amount, None);
        assert!(r.is_usable());
    }

    #[test]
    fn invalid_category_and_null_like_values_are_dropped() {
        let r = parse_reply(
            r#"{"Amount": 20, "Merchant": "Unknown", "category": "Personal Transfer", "date": "N/A"}"#,
        )
        .unwrap();
        assert_eq!(r.amount.unwrap().value(), dec("20"));
        assert_eq!(r.merchant, None);
        assert_eq!(r.category, None);
        assert_eq!(r.date, None);
    }

    #[test]
    fn brace_in_leading_prose_does_not_hide_the_object() {
        let r = parse_reply(r#"Sure {here it is: {"amount": 450, "merchant": "Zomato"}"#).unwrap();
        assert_eq!(r.amount.unwrap().value(), dec("450"));
        assert_eq!(r.merchant.as_deref(), Some("Zomato"));

        let r = parse_reply(r#"Fields {amount, merchant}: {"amount": 77, "merchant": "Foo"}"#)
            .unwrap();
        assert_eq!(r.amount.unwrap().value(), dec("77"));
        assert_eq!(r.merchant.as_deref(), Some("Foo"));
    }

    #[test]
    fn negative_or_exponent_string_amounts_are_dropped() {
        let r = parse_reply(r#"{"amount": "-450", "merchant": "Uber"}"#).unwrap();
        assert_eq!(r.amount, None);
        let r = parse_reply(r#"{"amount": "Rs - 450", "merchant": "Uber"}"#).unwrap();
        assert_eq!(r.amount, None);
        let r = parse_reply(r#"{"amount": "1e3", "merchant": "Uber"}"#).unwrap();
        assert_eq!(r.amount, None);
        let r = parse_reply(r#"{"amount": "Rs. 450", "merchant": "Uber"}"#).unwrap();
        assert_eq!(r.amount.unwrap().value(), dec("450"));
    }

    #[test]
    fn rejects_objects_without_expected_keys() {
        assert!(matches!(
            parse_reply(r#"{"answer": "I cannot read this receipt"}"#),
            Err(AiError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn rejects_missing_and_malformed_json() {
        assert!(matches!(parse_reply("I could not find anything."), Err(AiError::NoJson)));
        assert!(matches!(
            parse_reply("{amount: 450, merchant: Zomato}"),
            Err(AiError::MalformedJson(_))
        ));
    }

    // ── Parser ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn parse_records_exchange_in_conversation() {
        let parser = AiParser::new(
            MockCompletion::reply(r#"{"amount": 120, "merchant": "Swiggy"}"#),
            Duration::from_secs(5),
        );
        let mut convo = Conversation::new();
        let r = parser.parse("Paid ₹120 to Swiggy", &mut convo).await.unwrap();

        assert_eq!(r.merchant.as_deref(), Some("Swiggy"));
        assert_eq!(convo.len(), 3);
        assert_eq!(convo.turns()[0].role, Role::System);
        assert!(convo.turns()[1].content.contains("Paid ₹120 to Swiggy"));
        assert_eq!(convo.turns()[2].role, Role::Assistant);
    }

    #[tokio::test]
    async fn parse_keeps_existing_history() {
        let parser = AiParser::new(MockCompletion::reply("{\"amount\": 5}"), Duration::from_secs(5));
        let mut convo = Conversation::with_system("custom system prompt");
        parser.parse("first", &mut convo).await.unwrap();
        parser.parse("second", &mut convo).await.unwrap();

        assert_eq!(convo.len(), 5);
        assert_eq!(convo.turns()[0].content, "custom system prompt");
        assert_eq!(parser.backend().calls(), 2);
    }

    #[tokio::test]
    async fn parse_times_out() {
        let parser = AiParser::new(
            MockCompletion::reply("{\"amount\": 5}").delayed(Duration::from_secs(60)),
            Duration::from_millis(20),
        );
        let err = parser.parse("text", &mut Conversation::new()).await.unwrap_err();
        assert!(matches!(err, AiError::Timeout(_)));
    }

    #[tokio::test]
    async fn parse_propagates_backend_failure() {
        let parser = AiParser::new(MockCompletion::failing("503"), Duration::from_secs(5));
        let err = parser.parse("text", &mut Conversation::new()).await.unwrap_err();
        assert!(matches!(err, AiError::Unavailable(_)));
    }
}
