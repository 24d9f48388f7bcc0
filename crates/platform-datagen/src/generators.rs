//! Deterministic fake-value library keyed by tag name, falling back to
//! an LLM completion when no generator matches (spec.md §4.8: "generate
//! tag values (either via a deterministic library of fake generators
//! keyed by tag name, falling back to LLM completion if no match)").

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::DatagenError;
use crate::llm::{LlmClient, PromptRequest};

/// A deterministic generator for one tag's values — no network call, no
/// randomness source beyond the one it's handed.
pub trait FakeGenerator: Send + Sync {
    fn generate(&self, rng: &mut dyn rand::RngCore) -> String;
}

struct Choices(&'static [&'static str]);

impl FakeGenerator for Choices {
    fn generate(&self, rng: &mut dyn rand::RngCore) -> String {
        #[allow(clippy::unwrap_used)]
        (*self.0.choose(rng).unwrap()).to_owned()
    }
}

struct PhoneNumber;

impl FakeGenerator for PhoneNumber {
    fn generate(&self, rng: &mut dyn rand::RngCore) -> String {
        format!(
            "({:03}) {:03}-{:04}",
            rng.gen_range(200..999),
            rng.gen_range(200..999),
            rng.gen_range(0..9999)
        )
    }
}

struct Ssn;

impl FakeGenerator for Ssn {
    fn generate(&self, rng: &mut dyn rand::RngCore) -> String {
        format!(
            "{:03}-{:02}-{:04}",
            rng.gen_range(100..899),
            rng.gen_range(10..99),
            rng.gen_range(1000..9999)
        )
    }
}

struct EmailAddress;

impl FakeGenerator for EmailAddress {
    fn generate(&self, rng: &mut dyn rand::RngCore) -> String {
        const NAMES: &[&str] = &["jsmith", "alee", "mkhan", "rgarcia", "tchen"];
        const DOMAINS: &[&str] = &["example.com", "mailbox.net", "corp-mail.com"];
        #[allow(clippy::unwrap_used)]
        format!(
            "{}@{}",
            NAMES.choose(rng).unwrap(),
            DOMAINS.choose(rng).unwrap()
        )
    }
}

/// Look up the deterministic generator registered for `tag_name`, if any.
/// The name matching is case-insensitive and matches on common aliases —
/// `"phone"`/`"phone_number"` both resolve to [`PhoneNumber`].
#[must_use]
pub fn lookup(tag_name: &str) -> Option<Box<dyn FakeGenerator>> {
    match tag_name.to_lowercase().as_str() {
        "phone" | "phone_number" | "phonenumber" => Some(Box::new(PhoneNumber)),
        "ssn" | "social_security_number" => Some(Box::new(Ssn)),
        "email" | "email_address" => Some(Box::new(EmailAddress)),
        "state" | "us_state" => Some(Box::new(Choices(&[
            "California", "Texas", "New York", "Florida", "Washington", "Illinois",
        ]))),
        "country" => Some(Box::new(Choices(&[
            "United States", "Canada", "United Kingdom", "Germany", "India", "Japan",
        ]))),
        _ => None,
    }
}

/// Produce one value for `tag_name` — the deterministic generator if one
/// is registered, otherwise an LLM completion prompted with the caller's
/// description and examples.
///
/// # Errors
///
/// Returns [`DatagenError::LlmCall`] if no generator matches and the LLM
/// fallback call fails.
pub async fn generate_tag_value(
    tag_name: &str,
    description: &str,
    examples: &[String],
    llm: &dyn LlmClient,
    rng: &mut dyn rand::RngCore,
) -> Result<String, DatagenError> {
    if let Some(generator) = lookup(tag_name) {
        return Ok(generator.generate(rng));
    }

    let example_list = examples.join(", ");
    let prompt = format!(
        "Generate one realistic example value for the attribute \"{tag_name}\" ({description}). Examples: {example_list}. Respond with only the value."
    );
    llm.completion(&PromptRequest {
        prompt,
        system_prompt: None,
    })
    .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn known_tag_names_resolve_without_an_llm_call() {
        assert!(lookup("phone_number").is_some());
        assert!(lookup("EMAIL").is_some());
        assert!(lookup("completely_unknown_tag").is_none());
    }

    #[test]
    fn phone_number_generator_produces_formatted_output() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(4);
        let value = PhoneNumber.generate(&mut rng);
        assert!(value.starts_with('('));
    }
}
