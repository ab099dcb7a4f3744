use the_history::{
  History,
  HistoryError,
  MemoryStore,
  OwnerId,
  Proposal,
  replay,
};

const ALICE: OwnerId = OwnerId(1);
const BOB: OwnerId = OwnerId(2);

#[test]
fn first_edit_follows_initial_patch() {
  let history = History::new(MemoryStore::new());
  let mut document = history.create(ALICE).unwrap();

  let proposal = history
    .propose(&document, "hello", "greeting", ALICE)
    .unwrap();
  assert_eq!(proposal.script, "+5/hello");

  let patch = history.accept(&mut document, &proposal).unwrap();
  assert_eq!(document.content, "hello");
  assert_eq!(document.head, Some(patch.id));
  assert_eq!(patch.ranking, 2);
  assert_eq!(patch.reverse, "-5");
  assert_eq!(patch.message, "greeting");
  assert!(history.proposals(&document).unwrap().is_empty());
}

#[test]
fn reconstruct_previous_version() {
  let history = History::new(MemoryStore::new());
  let mut document = history.create(ALICE).unwrap();
  let first = history
    .propose(&document, "hello world", "first", ALICE)
    .unwrap();
  let first = history.accept(&mut document, &first).unwrap();

  let second = history
    .propose(&document, "hello there world", "second", BOB)
    .unwrap();
  assert_eq!(second.script, "=6+6/there =5");
  let second = history.accept(&mut document, &second).unwrap();
  assert_eq!(second.reverse, "=6-6=5");

  let old = history.reconstruct_at(&document, first.id).unwrap();
  assert_eq!(old.content, "hello world");
  assert_eq!(old.head, Some(first.id));

  let current = history.reconstruct_at(&document, second.id).unwrap();
  assert_eq!(current.content, document.content);

  let init = history.patches(&document).unwrap()[0].id;
  assert_eq!(history.reconstruct_at(&document, init).unwrap().content, "");
}

#[test]
fn chain_replays_to_content() {
  let history = History::new(MemoryStore::new());
  let mut document = history.create(ALICE).unwrap();
  let versions = [
    "fn main() {}\n",
    "fn main() {\n  println!(\"hi\");\n}\n",
    "// entry point\nfn main() {\n  println!(\"hi\");\n}\n",
    "// entry point\nfn main() {\n  println!(\"héllo, wörld\");\n}\n",
    "",
    "again\n",
  ];

  for (idx, text) in versions.iter().enumerate() {
    let proposal = history
      .propose(&document, text, format!("v{idx}"), ALICE)
      .unwrap();
    history.accept(&mut document, &proposal).unwrap();

    let patches = history.patches(&document).unwrap();
    assert_eq!(patches.len(), idx + 2);
    assert!(patches.windows(2).all(|w| w[0].ranking < w[1].ranking));
    assert_eq!(replay(&patches).unwrap(), *text);
    history.verify(&document).unwrap();
  }

  let reopened = history.open(document.id).unwrap();
  assert_eq!(reopened, document);
}

#[test]
fn stale_accept_leaves_document_unchanged() {
  let history = History::new(MemoryStore::new());
  let mut document = history.create(ALICE).unwrap();
  let early = history.propose(&document, "one", "early", ALICE).unwrap();
  let late = history.propose(&document, "two", "late", BOB).unwrap();
  history.accept(&mut document, &early).unwrap();

  let before = document.clone();
  let err = history.accept(&mut document, &late).unwrap_err();
  assert!(matches!(err, HistoryError::TimelineMismatch { .. }));
  assert!(err.is_conflict());
  assert_eq!(document, before);
  assert_eq!(history.open(document.id).unwrap(), before);
  assert_eq!(history.proposals(&document).unwrap(), vec![late]);
}

#[test]
fn stale_snapshot_loses_in_store() {
  let history = History::new(MemoryStore::new());
  let mut document = history.create(ALICE).unwrap();
  let mut snapshot = document.clone();

  let winner = history.propose(&document, "win", "w", ALICE).unwrap();
  let loser = history.propose(&snapshot, "lose", "l", BOB).unwrap();
  history.accept(&mut document, &winner).unwrap();

  // The stale snapshot still agrees with the loser's base, so only the store
  // can tell.
  let err = history.accept(&mut snapshot, &loser).unwrap_err();
  assert!(matches!(err, HistoryError::TimelineMismatch { .. }));
  assert_eq!(snapshot.content, "");
  assert_eq!(history.open(document.id).unwrap().content, "win");
}

#[test]
fn unsaved_proposals_can_be_accepted() {
  let history = History::new(MemoryStore::new());
  let mut document = history.create(ALICE).unwrap();
  let proposal = Proposal::unsaved(&document, "+3/abc", BOB, "direct");

  let patch = history.accept(&mut document, &proposal).unwrap();
  assert_eq!(document.content, "abc");
  assert_eq!(patch.owner, BOB);
}

#[test]
fn malformed_script_is_rejected() {
  let history = History::new(MemoryStore::new());
  let mut document = history.create(ALICE).unwrap();
  let proposal = Proposal::unsaved(&document, "+9/short", ALICE, "bad");

  let err = history.accept(&mut document, &proposal).unwrap_err();
  assert!(matches!(err, HistoryError::Script(_)));
  assert_eq!(history.patches(&document).unwrap().len(), 1);
}
