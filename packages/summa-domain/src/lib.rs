pub mod note;
pub mod summary;
pub mod transition;

pub use note::{Note, NoteStatus, ParseStatusError};
pub use summary::{EMPTY_NOTE_SUMMARY, SummaryRules, summarize};
pub use transition::{Transition, TransitionError, TransitionOutcome};
