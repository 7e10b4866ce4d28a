//! End-intent detection.
//!
//! A candidate utterance ends the interview when it contains one of a fixed
//! set of phrases. Case-insensitive substring match only, no fuzzy matching.

const END_PHRASES: &[&str] = &[
    "end interview",
    "stop interview",
    "finish interview",
    "conclude interview",
    "that's all",
    "i'm done",
    "let's end",
    "let's stop",
    "can we stop",
    "can we end",
    "wrap up",
    "finish up",
    "no more questions",
    "thank you that's it",
    "we can stop here",
    "end the session",
];

/// True when the input contains any end phrase.
pub fn wants_to_end(input: &str) -> bool {
    let lower = input.to_lowercase();
    END_PHRASES.iter().any(|phrase| lower.contains(phrase))
}
