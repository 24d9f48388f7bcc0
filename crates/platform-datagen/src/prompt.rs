//! Sentence-template assembly: the second sub-task of C8 (spec.md §4.8)
//! — generate a sentence template with `{tag}` placeholders, then fill
//! each placeholder with a generated tag value.

use std::collections::BTreeMap;

use crate::error::DatagenError;
use crate::llm::{LlmClient, PromptRequest};

/// Ask the LLM for one sentence template containing every name in `tags`
/// as a `{tag}`-style placeholder.
///
/// # Errors
///
/// Returns [`DatagenError::LlmCall`] if the completion call fails.
pub async fn generate_template(
    llm: &dyn LlmClient,
    tags: &[String],
    domain_description: &str,
) -> Result<String, DatagenError> {
    let placeholders = tags
        .iter()
        .map(|t| format!("{{{t}}}"))
        .collect::<Vec<_>>()
        .join(", ");
    let prompt = format!(
        "Write one natural-sounding sentence about {domain_description} that contains each of these placeholders exactly once: {placeholders}. Respond with only the sentence, placeholders unmodified."
    );
    llm.completion(&PromptRequest {
        prompt,
        system_prompt: None,
    })
    .await
}

/// Substitute every `{tag}` placeholder in `template` with its generated
/// value, and return the filled sentence alongside the token-task
/// `(source, target)` span labeling each substituted value with its tag
/// name — the transform `fill_and_transform` performs in the source.
#[must_use]
pub fn fill_and_label(template: &str, values: &BTreeMap<String, String>) -> (String, Vec<(String, String)>) {
    let mut filled = template.to_owned();
    let mut labels = Vec::new();

    for (tag, value) in values {
        let placeholder = format!("{{{tag}}}");
        if filled.contains(&placeholder) {
            filled = filled.replacen(&placeholder, value, 1);
            for word in value.split_whitespace() {
                labels.push((word.to_owned(), tag.clone()));
            }
        }
    }

    (filled, labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_every_placeholder_and_labels_its_words() {
        let template = "Call {name} at {phone} about the order.";
        let mut values = BTreeMap::new();
        values.insert("name".to_owned(), "Jordan Lee".to_owned());
        values.insert("phone".to_owned(), "555-0100".to_owned());

        let (filled, labels) = fill_and_label(template, &values);

        assert_eq!(filled, "Call Jordan Lee at 555-0100 about the order.");
        assert!(labels.contains(&("Jordan".to_owned(), "name".to_owned())));
        assert!(labels.contains(&("555-0100".to_owned(), "phone".to_owned())));
    }
}
