// Tailoring stages: each turns one input into one typed artifact.
// Service-backed stages take a `&dyn ReasoningService`; the matcher is pure.

pub mod content_tailor;
pub mod extractor;
pub mod handlers;
pub mod prompts;
pub mod skill_matcher;
pub mod structurer;
