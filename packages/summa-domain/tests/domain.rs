use time::OffsetDateTime;
use uuid::Uuid;

use summa_domain::{
	EMPTY_NOTE_SUMMARY, Note, NoteStatus, SummaryRules, Transition, TransitionError,
	TransitionOutcome, summarize,
};

fn queued_note() -> Note {
	Note::queued(Uuid::new_v4(), "owner-1", "Some text", OffsetDateTime::UNIX_EPOCH)
}

#[test]
fn priority_keywords_flag_the_summary() {
	let summary = summarize("Important meeting about quarterly targets", &SummaryRules::default());

	assert!(summary.starts_with("Priority summary: "), "Unexpected summary: {summary}");
	assert!(summary.contains("Important meeting about quarterly targets"));
}

#[test]
fn keyword_match_ignores_case() {
	let summary = summarize("Call the vendor, URGENT", &SummaryRules::default());

	assert!(summary.starts_with("Priority summary: "), "Unexpected summary: {summary}");
}

#[test]
fn meeting_notes_get_their_own_prefix() {
	let summary = summarize("Weekly Meeting recap", &SummaryRules::default());

	assert_eq!(summary, "Meeting summary: Weekly Meeting recap");
}

#[test]
fn other_text_is_a_general_note() {
	let summary = summarize("Buy milk", &SummaryRules::default());

	assert_eq!(summary, "General note: Buy milk");
}

#[test]
fn empty_and_blank_text_yield_the_placeholder() {
	let rules = SummaryRules::default();

	assert_eq!(summarize("", &rules), EMPTY_NOTE_SUMMARY);
	assert_eq!(summarize(" \n\t ", &rules), EMPTY_NOTE_SUMMARY);
}

#[test]
fn long_text_is_truncated_with_ellipsis() {
	let rules = SummaryRules { max_chars: 10, ..SummaryRules::default() };
	let summary = summarize("abcdefghijklmnopqrstuvwxyz", &rules);

	assert_eq!(summary, "General note: abcdefghij...");
}

#[test]
fn whitespace_runs_are_collapsed() {
	let summary = summarize("  Buy\n\n milk   and\teggs ", &SummaryRules::default());

	assert_eq!(summary, "General note: Buy milk and eggs");
}

#[test]
fn summarize_is_total_and_deterministic() {
	let rules = SummaryRules { max_chars: 7, ..SummaryRules::default() };
	let long = "x".repeat(50_000);
	let inputs = [
		"",
		" ",
		"urgent",
		"\u{0}\u{1}control",
		"emoji \u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467} family",
		"\u{4F60}\u{597D}\u{4E16}\u{754C}\u{4F60}\u{597D}\u{4E16}\u{754C}",
		"İmportant dotted capital",
		long.as_str(),
	];

	for input in inputs {
		let first = summarize(input, &rules);
		let second = summarize(input, &rules);

		assert!(!first.is_empty());
		assert_eq!(first, second);
	}
}

#[test]
fn custom_keywords_are_honored() {
	let rules = SummaryRules {
		max_chars: 100,
		priority_keywords: vec!["blocker".to_string()],
		meeting_keywords: vec!["standup".to_string()],
	};

	assert!(summarize("Release BLOCKER found", &rules).starts_with("Priority summary: "));
	assert!(summarize("Standup notes", &rules).starts_with("Meeting summary: "));
	assert!(summarize("Important", &rules).starts_with("General note: "));
}

#[test]
fn status_round_trips_through_strings_and_json() {
	for status in NoteStatus::ALL {
		assert_eq!(status.as_str().parse::<NoteStatus>(), Ok(status));

		let json = serde_json::to_value(status).expect("Failed to encode status.");

		assert_eq!(json, serde_json::Value::String(status.to_string()));
	}

	assert!("DONE".parse::<NoteStatus>().is_err());
}

#[test]
fn only_done_and_failed_are_terminal() {
	assert!(!NoteStatus::Queued.is_terminal());
	assert!(!NoteStatus::Processing.is_terminal());
	assert!(NoteStatus::Done.is_terminal());
	assert!(NoteStatus::Failed.is_terminal());
}

#[test]
fn done_requires_a_summary() {
	assert_eq!(Transition::complete(""), Err(TransitionError::SummaryRequired));
	assert_eq!(Transition::complete("   "), Err(TransitionError::SummaryRequired));
	assert_eq!(
		Transition::new([NoteStatus::Processing], NoteStatus::Done, None),
		Err(TransitionError::SummaryRequired)
	);
}

#[test]
fn non_done_targets_reject_a_summary() {
	assert_eq!(
		Transition::new([NoteStatus::Processing], NoteStatus::Failed, Some("x".to_string())),
		Err(TransitionError::UnexpectedSummary { to: NoteStatus::Failed })
	);
}

#[test]
fn terminal_sources_may_only_reset_to_queued() {
	assert_eq!(
		Transition::new([NoteStatus::Done], NoteStatus::Processing, None),
		Err(TransitionError::LeavesTerminal { to: NoteStatus::Processing })
	);
	assert!(
		Transition::new([NoteStatus::Done, NoteStatus::Failed], NoteStatus::Queued, None).is_ok()
	);
}

#[test]
fn empty_source_set_is_rejected() {
	assert_eq!(
		Transition::new(Vec::new(), NoteStatus::Processing, None),
		Err(TransitionError::EmptySourceSet)
	);
}

#[test]
fn happy_path_reaches_done_with_summary() {
	let mut note = queued_note();
	let later = OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(5);

	assert!(note.apply(&Transition::claim(), later).is_applied());
	assert_eq!(note.status, NoteStatus::Processing);

	let complete = Transition::complete("General note: Some text").expect("Valid transition.");
	let outcome = note.apply(&complete, later);

	assert!(outcome.is_applied());
	assert_eq!(note.status, NoteStatus::Done);
	assert_eq!(note.summary.as_deref(), Some("General note: Some text"));
	assert_eq!(note.updated_at, later);
	assert_eq!(note.created_at, OffsetDateTime::UNIX_EPOCH);
}

#[test]
fn terminal_notes_reject_worker_writes() {
	let mut note = queued_note();
	let now = OffsetDateTime::UNIX_EPOCH;

	note.apply(&Transition::claim(), now);
	note.apply(&Transition::complete("General note: Some text").expect("Valid transition."), now);

	let snapshot = note.clone();

	for transition in [
		Transition::claim(),
		Transition::execution_failed(),
		Transition::submission_failed(),
		Transition::complete("Different summary").expect("Valid transition."),
	] {
		assert_eq!(
			note.apply(&transition, now + time::Duration::hours(1)),
			TransitionOutcome::Conflict { current: NoteStatus::Done }
		);
	}

	assert_eq!(note, snapshot);
}

#[test]
fn submission_failure_only_applies_to_queued_notes() {
	let mut note = queued_note();
	let now = OffsetDateTime::UNIX_EPOCH;

	note.apply(&Transition::claim(), now);

	assert_eq!(
		note.apply(&Transition::submission_failed(), now),
		TransitionOutcome::Conflict { current: NoteStatus::Processing }
	);

	let mut fresh = queued_note();

	assert!(fresh.apply(&Transition::submission_failed(), now).is_applied());
	assert_eq!(fresh.status, NoteStatus::Failed);
	assert_eq!(fresh.summary, None);
}

#[test]
fn claim_is_allowed_again_while_processing() {
	let mut note = queued_note();
	let now = OffsetDateTime::UNIX_EPOCH;

	assert!(note.apply(&Transition::claim(), now).is_applied());
	assert!(note.apply(&Transition::claim(), now).is_applied());
	assert_eq!(note.status, NoteStatus::Processing);
}
