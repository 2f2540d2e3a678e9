//! Account operations invoked by the views, their input checks and the error
//! taxonomy they report.

mod errors;
mod locale;
mod pending;
mod service;
mod validation;

pub use errors::{AuthError, AuthOperation, Field, InputProblem, ProfileOperation};
pub use locale::{Locale, Notice};
pub use pending::{PendingGuard, PendingOperations};
pub use service::{AuthService, ResendOutcome, SignUpOutcome};
pub use validation::{
    ActionLink, ActionMode, MIN_PASSWORD_LEN, normalize_email, require_code, require_confirmation,
    require_email, require_new_password, require_password, valid_email,
};
