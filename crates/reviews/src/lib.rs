//! Reviews domain module.
//!
//! Reviews are gated on verified purchases: only a delivered order belonging
//! to the reviewer and containing the product unlocks a review, and each
//! (user, product, order) purchase may be reviewed once.

pub mod eligibility;
pub mod review;
pub mod summary;

pub use eligibility::{ReviewEligibility, check_eligibility, ensure_order_qualifies};
pub use review::{MAX_COMMENT_LEN, Review, ReviewDraft, ReviewId};
pub use summary::RatingSummary;
