#![no_main]

mod common;

use libfuzzer_sys::fuzz_target;
use the_script::{
  apply,
  decode,
  diff,
};

use crate::common::text_and_script;

fuzz_target!(|data: &[u8]| {
  let (text, script) = text_and_script(data);
  let len = text.chars().count();

  // Whatever decodes must apply, and land on the predicted length.
  if let Ok(changes) = decode(&script, len) {
    let delta: isize = changes.iter().map(|change| change.len_delta()).sum();
    let result = apply(&text, &changes).expect("decoded changes must apply");
    assert_eq!(result.chars().count() as isize, len as isize + delta);

    let forward = diff::script(&text, &result);
    let changes = decode(&forward, len).expect("generated script must decode");
    assert_eq!(apply(&text, &changes).unwrap(), result);
  }
});
