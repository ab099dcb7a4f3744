#![no_main]

mod common;

use libfuzzer_sys::fuzz_target;
use the_history::{
  History,
  MemoryStore,
  OwnerId,
};

use crate::common::{
  edited,
  scenario_from_bytes,
};

fuzz_target!(|data: &[u8]| {
  let scenario = scenario_from_bytes(data);
  let history = History::new(MemoryStore::new());
  let mut document = history.create(OwnerId(0)).unwrap();
  let base = history
    .propose(&document, &scenario.initial, "base", OwnerId(0))
    .unwrap();
  history.accept(&mut document, &base).unwrap();

  let mine = edited(&scenario.initial, &scenario.mine);
  let theirs = edited(&scenario.initial, &scenario.theirs);
  let mine = history.propose(&document, &mine, "mine", OwnerId(1)).unwrap();
  let theirs = history
    .propose(&document, &theirs, "theirs", OwnerId(2))
    .unwrap();
  history.accept(&mut document, &theirs).unwrap();

  // Conflicts are fine, anything that rebases must accept and replay.
  if let Ok(rebased) = history.rebase(&document, &mine) {
    history.accept(&mut document, &rebased).unwrap();
    history.verify(&document).unwrap();
  }
});
