//! Calculators run on a consolidated profile, leaf first: taxable base,
//! income tax, social contributions, regime comparison, coherence checks,
//! and the engine assembling their output.

pub mod coherence;
pub mod common;
pub mod comparator;
pub mod engine;
pub mod income_tax;
pub mod social;
pub mod taxable_base;

pub use coherence::{CoherenceValidator, expected_parts};
pub use comparator::RegimeComparator;
pub use engine::{TaxEngine, calculate_input};
pub use income_tax::{IncomeTaxCalculator, bracket_tax};
pub use social::SocialContributionsCalculator;
pub use taxable_base::{TaxableBase, micro_abattement, taxable_base};
