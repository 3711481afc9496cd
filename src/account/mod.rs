/// Account (business deal) workflows
///
/// Intake of new accounts, status updates with call logging, the agent's
/// worklist, and the product catalog offered on the intake form.

mod catalog;
mod intake;
mod update;
mod worklist;

pub use catalog::Catalog;
pub use intake::{AccountIntakeForm, CreationFailure, CreationResult, IntakeWorkflow};
pub use update::{format_time, normalize_time, AccountUpdateForm, UpdateOutcome, UpdateWorkflow};
pub use worklist::{build_filter, Worklist, WorklistQuery};
