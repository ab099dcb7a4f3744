use the_history::{
  History,
  HistoryError,
  MemoryStore,
  OwnerId,
  Proposal,
};

const ALICE: OwnerId = OwnerId(1);
const BOB: OwnerId = OwnerId(2);

fn history_with(text: &str) -> (History<MemoryStore>, the_history::Document) {
  let history = History::new(MemoryStore::new());
  let mut document = history.create(ALICE).unwrap();
  let proposal = history.propose(&document, text, "base", ALICE).unwrap();
  history.accept(&mut document, &proposal).unwrap();
  (history, document)
}

#[test]
fn disjoint_edits_rebase_cleanly() {
  let (history, mut document) = history_with("one\ntwo\nthree\nfour\n");
  let base = document.content.clone();

  let mine = history
    .propose(&document, "one\ntwo\nthree\nFOUR\nfive\n", "tail", BOB)
    .unwrap();
  let theirs = history
    .propose(&document, "zero\none\n2\nthree\nfour\n", "head", ALICE)
    .unwrap();
  history.accept(&mut document, &theirs).unwrap();

  let rebased = history.rebase(&document, &mine).unwrap();
  assert_eq!(rebased.id, mine.id);
  assert_eq!(rebased.base, document.head);
  assert_eq!(rebased.owner, BOB);
  assert_eq!(rebased.message, "tail");

  history.accept(&mut document, &rebased).unwrap();
  assert_eq!(document.content, "zero\none\n2\nthree\nFOUR\nfive\n");
  history.verify(&document).unwrap();
  assert_ne!(document.content, base);
}

#[test]
fn rebase_across_several_patches() {
  let (history, mut document) = history_with("abcdefghij");
  let mine = history
    .propose(&document, "abcdeXfghij", "middle", BOB)
    .unwrap();

  for (text, message) in [("Aabcdefghij", "front"), ("Aabcdefghij!", "back"), ("Abcdefghij!", "trim")] {
    let proposal = history.propose(&document, text, message, ALICE).unwrap();
    history.accept(&mut document, &proposal).unwrap();
  }

  let rebased = history.rebase(&document, &mine).unwrap();
  history.accept(&mut document, &rebased).unwrap();
  assert_eq!(document.content, "AbcdeXfghij!");
}

#[test]
fn overlapping_edits_conflict() {
  let (history, mut document) = history_with("abcdef");
  let mine = history.propose(&document, "aXf", "replace", BOB).unwrap();
  let theirs = history.propose(&document, "abef", "cut", ALICE).unwrap();
  let cut = history.accept(&mut document, &theirs).unwrap();

  let err = history.rebase(&document, &mine).unwrap_err();
  assert!(err.is_conflict());
  match err {
    HistoryError::PatchIncompatible { patch, ranking, .. } => {
      assert_eq!(patch, cut.id);
      assert_eq!(ranking, cut.ranking);
    },
    err => panic!("unexpected error: {err}"),
  }
  // Rebasing is read-only.
  assert_eq!(history.proposal(mine.id.unwrap()).unwrap(), mine);
}

#[test]
fn rebase_onto_head_is_identity() {
  let (history, document) = history_with("text");
  let mine = history.propose(&document, "next", "n", BOB).unwrap();
  assert_eq!(history.rebase(&document, &mine).unwrap(), mine);
}

#[test]
fn unknown_base_is_rejected() {
  let (history, document) = history_with("abc");
  let other = history.create(BOB).unwrap();
  let mine = Proposal::unsaved(&document, "=3+1/d", BOB, "lost");

  let foreign = Proposal {
    base: other.head,
    ..mine.clone()
  };
  assert!(matches!(
    history.rebase(&document, &foreign),
    Err(HistoryError::PatchNotFound(id)) if Some(id) == other.head
  ));

  let baseless = Proposal { base: None, ..mine };
  assert!(matches!(
    history.rebase(&document, &baseless),
    Err(HistoryError::TimelineMismatch { base: None, .. })
  ));
}
