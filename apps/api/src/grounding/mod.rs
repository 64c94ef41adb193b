// Grounding: the checks that keep tailored output tied to what the candidate wrote.
// Pure functions only with no service calls, so results are reproducible.

pub mod claims;
pub mod coverage;
pub mod verifier;
