//! Intent validation domain
//!
//! An action statement must describe what a character *attempts*, never
//! the outcome. Checking runs in stages, cheapest first:
//!
//! 1. **Lexical** - outcome-asserting vocabulary ([`rules::check_lexical`])
//! 2. **Structural** - an intent clause with an attempt marker
//!    ([`rules::check_structure`])
//! 3. **Semantic** - an evaluator collaborator, only on retries
//!    (application layer)
//!
//! Failures carry an escalating correction hint ([`hints::correction_hint`]).
//! After [`MAX_VALIDATION_ATTEMPTS`] the action goes through anyway with a
//! warning flag for human review.

pub mod hints;
pub mod outcome;
pub mod rules;

pub use hints::correction_hint;
pub use outcome::{MAX_VALIDATION_ATTEMPTS, ValidationOutcome, ViolationKind};
pub use rules::{ActionClauses, RuleViolation, auto_fix, check_lexical, check_structure};
