use std::{
  iter::once,
  ops::Range,
  time::Instant,
};

use imara_diff::{
  Algorithm,
  Diff,
  Hunk,
  IndentHeuristic,
  IndentLevel,
  InternedInput,
};

use crate::{
  Tendril,
  script::encode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
  pub max_char_diff_ratio:       u32,
  pub max_char_diff_total_lines: u32,
  pub max_char_diff_total_chars: usize,
}

impl Default for DiffOptions {
  fn default() -> Self {
    const DEFAULT_CHARS_PER_LINE: usize = 200;
    Self {
      max_char_diff_ratio:       5,
      max_char_diff_total_lines: 200,
      max_char_diff_total_chars: 200 * DEFAULT_CHARS_PER_LINE,
    }
  }
}

/// One step of a text diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffHunk {
  Equal(Tendril),
  Insert(Tendril),
  Delete(Tendril),
}

impl DiffHunk {
  pub fn text(&self) -> &str {
    match self {
      DiffHunk::Equal(text) | DiffHunk::Insert(text) | DiffHunk::Delete(text) => text.as_str(),
    }
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.text().is_empty()
  }

  fn same_kind(&self, other: &DiffHunk) -> bool {
    std::mem::discriminant(self) == std::mem::discriminant(other)
  }

  fn push_str(&mut self, s: &str) {
    match self {
      DiffHunk::Equal(text) | DiffHunk::Insert(text) | DiffHunk::Delete(text) => text.push_str(s),
    }
  }
}

/// Accumulates hunks, coalescing neighbours of the same kind.
#[derive(Default)]
struct HunkBuilder {
  hunks: Vec<DiffHunk>,
}

impl HunkBuilder {
  fn equal(&mut self, text: &str) {
    self.push(DiffHunk::Equal(text.into()));
  }

  fn delete(&mut self, text: &str) {
    self.push(DiffHunk::Delete(text.into()));
  }

  fn insert(&mut self, text: &str) {
    self.push(DiffHunk::Insert(text.into()));
  }

  fn push(&mut self, hunk: DiffHunk) {
    if hunk.is_empty() {
      return;
    }

    // A delete and an insert sitting between the same two equal runs commute,
    // so at most one of each is kept there.
    let target = if matches!(hunk, DiffHunk::Equal(_)) {
      self.hunks.last_mut().filter(|last| last.same_kind(&hunk))
    } else {
      self
        .hunks
        .iter_mut()
        .rev()
        .take_while(|prev| !matches!(prev, DiffHunk::Equal(_)))
        .find(|prev| prev.same_kind(&hunk))
    };

    match target {
      Some(prev) => prev.push_str(hunk.text()),
      None => self.hunks.push(hunk),
    }
  }
}

struct Lines<'a>(&'a str);

impl<'a> imara_diff::TokenSource for Lines<'a> {
  type Token = &'a str;
  type Tokenizer = std::str::SplitInclusive<'a, char>;

  fn tokenize(&self) -> Self::Tokenizer {
    self.0.split_inclusive('\n')
  }

  fn estimate_tokens(&self) -> u32 {
    u32::try_from(self.0.matches('\n').count() + 1).unwrap_or(u32::MAX)
  }
}

/// Byte offset of the start of every line, followed by the text length.
fn line_offsets(text: &str) -> Vec<usize> {
  let mut offsets = Vec::with_capacity(text.len() / 32 + 2);
  offsets.push(0);
  let mut pos = 0;
  for line in text.split_inclusive('\n') {
    pos += line.len();
    offsets.push(pos);
  }
  offsets
}

fn char_offsets(text: &str) -> Vec<usize> {
  text
    .char_indices()
    .map(|(idx, _)| idx)
    .chain(once(text.len()))
    .collect()
}

fn common_prefix(a: &str, b: &str) -> usize {
  a.chars()
    .zip(b.chars())
    .take_while(|(x, y)| x == y)
    .map(|(x, _)| x.len_utf8())
    .sum()
}

fn common_suffix(a: &str, b: &str) -> usize {
  a.chars()
    .rev()
    .zip(b.chars().rev())
    .take_while(|(x, y)| x == y)
    .map(|(x, _)| x.len_utf8())
    .sum()
}

struct DiffBuilder<'a> {
  res:        HunkBuilder,
  before:     &'a str,
  after:      &'a str,
  line_count: usize,
  offsets:    (Vec<usize>, Vec<usize>),
  options:    &'a DiffOptions,
  char_hunk:  InternedInput<char>,
  token_diff: Diff,
  pos:        u32,
}

impl<'a> DiffBuilder<'a> {
  fn before_text(&self, range: Range<u32>) -> &'a str {
    let before = self.before;
    &before[self.offsets.0[range.start as usize]..self.offsets.0[range.end as usize]]
  }

  fn after_text(&self, range: Range<u32>) -> &'a str {
    let after = self.after;
    &after[self.offsets.1[range.start as usize]..self.offsets.1[range.end as usize]]
  }

  fn should_char_diff(
    &self,
    len_before_lines: u32,
    len_after_lines: u32,
    len_before_chars: usize,
    len_after_chars: usize,
  ) -> bool {
    if len_before_lines == 0 || len_after_lines == 0 {
      return false;
    }

    let total_lines = len_before_lines as u64 + len_after_lines as u64;
    if total_lines > self.options.max_char_diff_total_lines as u64 {
      return false;
    }

    let total_chars = len_before_chars.saturating_add(len_after_chars) as u64;
    if total_chars > self.options.max_char_diff_total_chars as u64 {
      return false;
    }

    let ratio = self.options.max_char_diff_ratio as u64;
    let len_before = len_before_chars as u64;
    let len_after = len_after_chars as u64;
    len_after <= ratio.saturating_mul(len_before) && len_before <= ratio.saturating_mul(len_after)
  }

  fn process_char_diff(&mut self, before: &str, after: &str) {
    self.char_hunk.update_before(before.chars());
    self.char_hunk.update_after(after.chars());
    // the histogram heuristic does not work as well
    // for characters because the same characters often reoccur
    // use myer diff instead
    self.token_diff.compute_with(
      Algorithm::Myers,
      &self.char_hunk.before,
      &self.char_hunk.after,
      self.char_hunk.interner.num_tokens(),
    );

    let before_offsets = char_offsets(before);
    let after_offsets = char_offsets(after);
    let slice = |text: &'_ str, offsets: &[usize], range: Range<u32>| -> Tendril {
      text[offsets[range.start as usize]..offsets[range.end as usize]].into()
    };

    let mut pos = 0;
    for Hunk { before: b, after: a } in self.token_diff.hunks() {
      self.res.equal(&slice(before, &before_offsets, pos..b.start));
      self.res.delete(&slice(before, &before_offsets, b.clone()));
      self.res.insert(&slice(after, &after_offsets, a));
      pos = b.end;
    }

    let end = self.char_hunk.before.len() as u32;
    self.res.equal(&slice(before, &before_offsets, pos..end));
    self.char_hunk.clear();
  }

  fn process_hunk(&mut self, before: Range<u32>, after: Range<u32>) {
    let equal = self.before_text(self.pos..before.start);
    self.res.equal(equal);
    self.pos = before.end;

    let before_text = self.before_text(before.clone());
    let after_text = self.after_text(after.clone());
    let len_before_chars = before_text.chars().count();
    let len_after_chars = after_text.chars().count();

    // Pure insertions/removals do not require a character diff.
    // Very large changes are ignored because their character diff is expensive to
    // compute.
    if self.should_char_diff(
      before.end - before.start,
      after.end - after.start,
      len_before_chars,
      len_after_chars,
    ) {
      self.process_char_diff(before_text, after_text);
    } else {
      self.res.delete(before_text);
      self.res.insert(after_text);
    }
  }

  fn finish(mut self) -> HunkBuilder {
    let end = u32::try_from(self.line_count).unwrap_or(u32::MAX);
    let tail = self.before_text(self.pos..end);
    self.res.equal(tail);
    self.res
  }
}

/// Diffs `before` against `after` with the default [`DiffOptions`].
pub fn compare(before: &str, after: &str) -> Vec<DiffHunk> {
  compare_with_options(before, after, &DiffOptions::default())
}

/// Computes the hunks required to get from `before` to `after`.
///
/// The common prefix and suffix are split off first, the rest is diffed by
/// lines and small line hunks are refined by characters.
pub fn compare_with_options(before: &str, after: &str, options: &DiffOptions) -> Vec<DiffHunk> {
  let start = log::log_enabled!(log::Level::Debug).then(Instant::now);

  let prefix = common_prefix(before, after);
  let suffix = common_suffix(&before[prefix..], &after[prefix..]);
  let middle_before = &before[prefix..before.len() - suffix];
  let middle_after = &after[prefix..after.len() - suffix];

  let mut res = HunkBuilder::default();
  res.equal(&before[..prefix]);

  if middle_before.is_empty() || middle_after.is_empty() {
    res.delete(middle_before);
    res.insert(middle_after);
  } else {
    let lines = InternedInput::new(Lines(middle_before), Lines(middle_after));
    let mut diff = Diff::compute(Algorithm::Histogram, &lines);
    diff.postprocess_with_heuristic(
      &lines,
      IndentHeuristic::new(|token| IndentLevel::for_ascii_line(lines.interner[token].bytes(), 4)),
    );

    let mut builder = DiffBuilder {
      res,
      before: middle_before,
      after: middle_after,
      line_count: lines.before.len(),
      offsets: (line_offsets(middle_before), line_offsets(middle_after)),
      options,
      char_hunk: InternedInput::default(),
      token_diff: Diff::default(),
      pos: 0,
    };
    for hunk in diff.hunks() {
      builder.process_hunk(hunk.before, hunk.after);
    }
    res = builder.finish();
  }

  res.equal(&before[before.len() - suffix..]);

  if let Some(start) = start {
    log::debug!(
      "text diff of {} -> {} bytes took {}s",
      before.len(),
      after.len(),
      Instant::now().duration_since(start).as_secs_f64()
    );
  }
  res.hunks
}

/// Forward diff-script from `before` to `after`.
pub fn script(before: &str, after: &str) -> String {
  encode(&compare(before, after))
}

pub fn script_with_options(before: &str, after: &str, options: &DiffOptions) -> String {
  encode(&compare_with_options(before, after, options))
}
