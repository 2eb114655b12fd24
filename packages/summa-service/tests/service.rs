use std::{sync::Arc, time::Duration};

use uuid::Uuid;

use summa_config::{
	Config, Notes, Postgres, Queue, QueueBackend, Security, Service, Storage, Summary, Worker,
};
use summa_domain::NoteStatus;
use summa_queue::JobQueue;
use summa_service::{
	CreateNoteRequest, Enqueuer, Error, ListNotesRequest, NoteFetchRequest, NoteService,
	SubmitOutcome,
};
use summa_storage::NoteStore;
use summa_testkit::{FailingJobQueue, HangingJobQueue, MemoryJobQueue, MemoryNoteStore};

fn test_config() -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		storage: Storage {
			postgres: Postgres { dsn: "postgres://unused".to_string(), pool_max_conns: 1 },
		},
		queue: Queue {
			backend: QueueBackend::Postgres,
			name: "summarization".to_string(),
			submit_timeout_ms: 100,
			pull_timeout_ms: 100,
			poll_interval_ms: 10,
			lease_seconds: 30,
			redis: None,
		},
		worker: Worker::default(),
		notes: Notes { max_raw_text_chars: 20, default_page_size: 2, max_page_size: 5 },
		summary: Summary::default(),
		security: Security { bind_localhost_only: true, api_auth_token: None },
	}
}

fn service_with(queue: Arc<dyn JobQueue>) -> (NoteService, Arc<MemoryNoteStore>) {
	let store = Arc::new(MemoryNoteStore::new());
	let service = NoteService::new(test_config(), store.clone(), queue);

	(service, store)
}

fn create(owner_id: &str, raw_text: &str) -> CreateNoteRequest {
	CreateNoteRequest { owner_id: owner_id.to_string(), raw_text: raw_text.to_string() }
}

#[tokio::test]
async fn created_note_is_queued_and_submitted() {
	let queue = Arc::new(MemoryJobQueue::new());
	let (service, store) = service_with(queue.clone());
	let note = service.create_note(create("owner-1", "Buy milk")).await.expect("Create failed.");

	assert_eq!(note.status, NoteStatus::Queued);
	assert_eq!(note.summary, None);
	assert_eq!(note.raw_text, "Buy milk");

	let descriptors = queue.pending_descriptors();

	assert_eq!(descriptors.len(), 1);
	assert_eq!(descriptors[0].note_id, note.note_id);

	let stored = store.get(note.note_id).expect("Note should be stored.");

	assert_eq!(stored.status, NoteStatus::Queued);
	assert_eq!(stored.owner_id, "owner-1");
}

#[tokio::test]
async fn submission_reports_the_queue_job_reference() {
	let store = Arc::new(MemoryNoteStore::new());
	let queue = Arc::new(MemoryJobQueue::new());
	let enqueuer = Enqueuer::new(store.clone(), queue.clone(), Duration::from_secs(1));
	let note = store.insert_note("owner-1", "Buy milk").await.expect("Insert failed.");

	assert_eq!(enqueuer.submit(&note).await, SubmitOutcome::Submitted {
		job_ref: "memory-job-0".to_string()
	});

	let failing = Enqueuer::new(store.clone(), Arc::new(FailingJobQueue), Duration::from_secs(1));

	assert_eq!(failing.submit(&note).await, SubmitOutcome::Failed);
	assert_eq!(store.get(note.note_id).expect("Note should be stored.").status, NoteStatus::Failed);
}

#[tokio::test]
async fn unreachable_queue_marks_note_failed_without_failing_creation() {
	let (service, store) = service_with(Arc::new(FailingJobQueue));
	let note = service.create_note(create("owner-1", "Buy milk")).await.expect("Create failed.");

	assert_eq!(note.status, NoteStatus::Queued);

	let stored = store.get(note.note_id).expect("Note should be stored.");

	assert_eq!(stored.status, NoteStatus::Failed);
	assert_eq!(stored.summary, None);

	let fetched = service
		.get_note(NoteFetchRequest { owner_id: "owner-1".to_string(), note_id: note.note_id })
		.await
		.expect("Fetch failed.");

	assert_eq!(fetched.status, NoteStatus::Failed);
}

#[tokio::test]
async fn hanging_queue_is_cut_off_by_the_submit_timeout() {
	let (service, store) = service_with(Arc::new(HangingJobQueue));
	let created = tokio::time::timeout(
		Duration::from_secs(5),
		service.create_note(create("owner-1", "Buy milk")),
	)
	.await
	.expect("Creation must not hang on the queue.")
	.expect("Create failed.");

	assert_eq!(created.status, NoteStatus::Queued);
	assert_eq!(store.get(created.note_id).map(|note| note.status), Some(NoteStatus::Failed));
}

#[tokio::test]
async fn failure_to_record_submission_failure_is_swallowed() {
	let (service, store) = service_with(Arc::new(FailingJobQueue));

	store.set_transitions_unavailable(true);

	let note = service.create_note(create("owner-1", "Buy milk")).await.expect("Create failed.");

	assert_eq!(note.status, NoteStatus::Queued);
	assert_eq!(store.get(note.note_id).map(|note| note.status), Some(NoteStatus::Queued));
}

#[tokio::test]
async fn store_outage_fails_creation() {
	let queue = Arc::new(MemoryJobQueue::new());
	let (service, store) = service_with(queue.clone());

	store.set_unavailable(true);

	let err = service.create_note(create("owner-1", "Buy milk")).await.expect_err("Expected error.");

	assert!(matches!(err, Error::Storage { .. }), "Unexpected error: {err:?}.");
	assert_eq!(queue.pending(), 0);
}

#[tokio::test]
async fn raw_text_length_is_bounded() {
	let (service, _) = service_with(Arc::new(MemoryJobQueue::new()));
	let at_limit = "a".repeat(20);

	service.create_note(create("owner-1", &at_limit)).await.expect("Text at the limit is valid.");
	service.create_note(create("owner-1", "")).await.expect("Empty text is valid.");

	let err = service
		.create_note(create("owner-1", &"a".repeat(21)))
		.await
		.expect_err("Expected a length error.");

	match err {
		Error::InvalidField { field, .. } => assert_eq!(field, "$.raw_text"),
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn notes_are_scoped_to_their_owner() {
	let (service, _) = service_with(Arc::new(MemoryJobQueue::new()));
	let note = service.create_note(create("owner-1", "Private")).await.expect("Create failed.");
	let foreign = service
		.get_note(NoteFetchRequest { owner_id: "owner-2".to_string(), note_id: note.note_id })
		.await;
	let missing = service
		.get_note(NoteFetchRequest { owner_id: "owner-1".to_string(), note_id: Uuid::new_v4() })
		.await;
	let anonymous = service
		.get_note(NoteFetchRequest { owner_id: "  ".to_string(), note_id: note.note_id })
		.await;

	assert!(matches!(foreign, Err(Error::NotFound { .. })));
	assert!(matches!(missing, Err(Error::NotFound { .. })));
	assert!(matches!(anonymous, Err(Error::InvalidRequest { .. })));
}

#[tokio::test]
async fn listing_paginates_and_filters() {
	let (service, _) = service_with(Arc::new(MemoryJobQueue::new()));

	for text in ["Alpha meeting", "Beta", "Gamma MEETING"] {
		service.create_note(create("owner-1", text)).await.expect("Create failed.");
	}

	service.create_note(create("owner-2", "Delta meeting")).await.expect("Create failed.");

	let base = ListNotesRequest { owner_id: "owner-1".to_string(), ..ListNotesRequest::default() };
	let first = service.list_notes(base.clone()).await.expect("List failed.");

	assert_eq!(first.total, 3);
	assert_eq!(first.size, 2);
	assert_eq!(first.pages, 2);
	assert_eq!(first.items.len(), 2);

	let second =
		service.list_notes(ListNotesRequest { page: Some(2), ..base.clone() }).await.expect("List.");

	assert_eq!(second.items.len(), 1);

	let searched = service
		.list_notes(ListNotesRequest { search: Some(" meeting ".to_string()), ..base.clone() })
		.await
		.expect("List failed.");

	assert_eq!(searched.total, 2);

	let queued = service
		.list_notes(ListNotesRequest { status: Some("queued".to_string()), ..base.clone() })
		.await
		.expect("List failed.");

	assert_eq!(queued.total, 3);

	let empty = service
		.list_notes(ListNotesRequest { status: Some("done".to_string()), ..base.clone() })
		.await
		.expect("List failed.");

	assert_eq!(empty.total, 0);
	assert_eq!(empty.pages, 0);
}

#[tokio::test]
async fn listing_rejects_invalid_parameters() {
	let (service, _) = service_with(Arc::new(MemoryJobQueue::new()));
	let base = ListNotesRequest { owner_id: "owner-1".to_string(), ..ListNotesRequest::default() };
	let cases = [
		(ListNotesRequest { page: Some(0), ..base.clone() }, "$.page"),
		(ListNotesRequest { size: Some(0), ..base.clone() }, "$.size"),
		(ListNotesRequest { size: Some(6), ..base.clone() }, "$.size"),
		(ListNotesRequest { status: Some("DONE".to_string()), ..base.clone() }, "$.status"),
		(ListNotesRequest { search: Some(String::new()), ..base.clone() }, "$.search"),
	];

	for (req, expected) in cases {
		match service.list_notes(req).await {
			Err(Error::InvalidField { field, .. }) => assert_eq!(field, expected),
			other => panic!("Expected an error at {expected}, got {other:?}."),
		}
	}
}
