//! Synthetic content for input injection
//!
//! Produces plausible filler text and type-aware form values. With a seed the
//! sequence of generated values is reproducible across runs, which keeps form
//! submissions (and therefore fingerprints of the resulting states) stable.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna", "aliqua", "enim",
    "ad", "minim", "veniam", "quis", "nostrud", "exercitation", "ullamco", "laboris", "nisi",
    "aliquip", "ex", "ea", "commodo", "consequat", "duis", "aute", "irure", "in", "reprehenderit",
    "voluptate", "velit", "esse", "cillum", "fugiat", "nulla", "pariatur", "excepteur", "sint",
    "occaecat", "cupidatat", "non", "proident", "sunt", "culpa", "qui", "officia", "deserunt",
    "mollit", "anim", "id", "est", "laborum",
];

/// Generator of filler text and form values
#[derive(Debug)]
pub struct SyntheticContent {
    rng: StdRng,
    overrides: BTreeMap<String, String>,
}

impl SyntheticContent {
    /// Creates a generator
    ///
    /// # Arguments
    ///
    /// * `seed` - Fixed seed for reproducible values; random when `None`
    /// * `overrides` - Field name to value; always wins over generated values
    pub fn new(seed: Option<u64>, overrides: BTreeMap<String, String>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self { rng, overrides }
    }

    fn word(&mut self) -> &'static str {
        WORDS.choose(&mut self.rng).copied().unwrap_or("lorem")
    }

    /// `n` space-separated words
    pub fn words_sequence(&mut self, n: usize) -> String {
        (0..n).map(|_| self.word()).collect::<Vec<_>>().join(" ")
    }

    /// Three to six capitalised sentences
    pub fn paragraph(&mut self) -> String {
        let sentences = self.rng.gen_range(3..=6);
        (0..sentences)
            .map(|_| {
                let length = self.rng.gen_range(4..=10);
                let mut sentence = self.words_sequence(length);
                if let Some(first) = sentence.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                sentence.push('.');
                sentence
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Value to type into a form field
    ///
    /// Overrides are looked up by field name first; otherwise the value is
    /// shaped by the control's tag and `type` attribute.
    pub fn value_for(&mut self, name: &str, tag: &str, input_type: Option<&str>) -> String {
        if let Some(value) = self.overrides.get(name) {
            return value.clone();
        }

        if tag.eq_ignore_ascii_case("textarea") {
            return self.paragraph();
        }

        match input_type.map(str::to_ascii_lowercase).as_deref() {
            Some("email") => format!("{}.{}@example.com", self.word(), self.word()),
            Some("number") | Some("range") => self.rng.gen_range(1..=100).to_string(),
            Some("password") => format!(
                "{}-{}-{}",
                self.word(),
                self.rng.gen_range(1000..=9999),
                self.word()
            ),
            Some("tel") => format!("555{:07}", self.rng.gen_range(0..10_000_000)),
            Some("url") => format!("https://example.com/{}", self.word()),
            Some("date") => format!(
                "2024-{:02}-{:02}",
                self.rng.gen_range(1..=12),
                self.rng.gen_range(1..=28)
            ),
            Some("search") => self.words_sequence(2),
            _ => self.words_sequence(3),
        }
    }
}
