mod cookie;
mod locator;
mod post;
mod session;
mod step;

pub use cookie::{normalize_cookie_domain, Cookie};
pub use locator::{LocatorCandidate, LocatorMode, LocatorStrategy};
pub use post::{MediaSource, Post};
pub use session::{SessionState, SessionStrategy};
pub use step::{StepAction, StepOutcome, WorkflowStep};
