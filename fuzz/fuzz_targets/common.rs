const MAX_INITIAL_BYTES: usize = 4 * 1024;
const MAX_OPS: usize = 16;
const MAX_INSERT_BYTES: usize = 64;

#[derive(Debug, Clone)]
pub struct EditOp {
  pub anchor: u16,
  pub delete: u16,
  pub insert: Vec<u8>,
}

pub struct Scenario {
  pub initial: String,
  pub mine:    Vec<EditOp>,
  pub theirs:  Vec<EditOp>,
}

pub fn scenario_from_bytes(data: &[u8]) -> Scenario {
  let mut cursor = ByteCursor::new(data);
  let initial_len = cursor.next_usize(MAX_INITIAL_BYTES);
  let initial = lossy_text(cursor.next_bytes(initial_len));
  let mine = edit_ops(&mut cursor);
  let theirs = edit_ops(&mut cursor);

  Scenario {
    initial,
    mine,
    theirs,
  }
}

/// Split input into a text and a script at the first NUL byte.
pub fn text_and_script(data: &[u8]) -> (String, String) {
  let split = data.iter().position(|&b| b == 0).unwrap_or(data.len());
  let text = lossy_text(&data[..split]);
  let script = lossy_text(data.get(split + 1..).unwrap_or_default());
  (text, script)
}

/// Apply `ops` one after another to a copy of `text`, addressing chars.
pub fn edited(text: &str, ops: &[EditOp]) -> String {
  let mut chars: Vec<char> = text.chars().collect();
  for op in ops {
    let len = chars.len();
    let from = (op.anchor as usize) % (len + 1);
    let delete = (op.delete as usize) % (len - from + 1);
    let replacement = lossy_text(&op.insert);
    chars.splice(from..from + delete, replacement.chars());
  }
  chars.into_iter().collect()
}

fn edit_ops(cursor: &mut ByteCursor<'_>) -> Vec<EditOp> {
  let op_count = cursor.next_usize(MAX_OPS);
  let mut ops = Vec::with_capacity(op_count);
  for _ in 0..op_count {
    let anchor = cursor.next_u16();
    let delete = cursor.next_u16();
    let insert_len = cursor.next_usize(MAX_INSERT_BYTES);
    let insert = cursor.next_bytes(insert_len).to_vec();
    ops.push(EditOp {
      anchor,
      delete,
      insert,
    });
  }
  ops
}

fn lossy_text(bytes: &[u8]) -> String {
  String::from_utf8_lossy(bytes).into_owned()
}

struct ByteCursor<'a> {
  data: &'a [u8],
  pos:  usize,
}

impl<'a> ByteCursor<'a> {
  fn new(data: &'a [u8]) -> Self {
    Self { data, pos: 0 }
  }

  fn next_u8(&mut self) -> u8 {
    let value = self.data.get(self.pos).copied().unwrap_or(0);
    self.pos = self.pos.saturating_add(1);
    value
  }

  fn next_u16(&mut self) -> u16 {
    let lo = self.next_u8() as u16;
    let hi = self.next_u8() as u16;
    lo | (hi << 8)
  }

  fn next_usize(&mut self, max: usize) -> usize {
    if max == 0 {
      return 0;
    }
    (self.next_u16() as usize) % (max + 1)
  }

  fn next_bytes(&mut self, len: usize) -> &'a [u8] {
    let start = self.pos.min(self.data.len());
    let end = start.saturating_add(len).min(self.data.len());
    self.pos = end;
    &self.data[start..end]
  }
}
