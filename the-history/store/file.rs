use std::{
  ffi::OsString,
  fs::{
    File,
    OpenOptions,
  },
  io::{
    self,
    Write,
  },
  path::{
    Path,
    PathBuf,
  },
};

use fd_lock::RwLock;
use tempfile::NamedTempFile;

use super::{
  DocumentRecord,
  HistoryStore,
  NewPatch,
  state::State,
};
use crate::{
  DocumentId,
  OwnerId,
  Patch,
  PatchId,
  Proposal,
  ProposalId,
  error::Result,
};

/// A store persisted as a single JSON file.
///
/// Nothing is cached between calls. Every operation takes an advisory lock on
/// a `.lock` file next to the store and loads the state from disk under it,
/// shared for reads and exclusive for writes. Any number of handles, in this
/// or other processes, may therefore work on the same file, and the head
/// check of [`commit`](HistoryStore::commit) always sees the latest head.
///
/// A mutation is written to a temporary file in the same directory and
/// renamed over the store, so a failed write leaves the file untouched.
#[derive(Debug)]
pub struct FileStore {
  path: PathBuf,
  lock: PathBuf,
}

impl FileStore {
  /// Open the store at `path`, starting empty if the file does not exist yet.
  pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
    let path = path.into();
    std::fs::create_dir_all(parent_dir(&path))?;

    let mut lock = OsString::from(path.as_os_str());
    lock.push(".lock");
    let store = Self {
      path,
      lock: PathBuf::from(lock),
    };
    // Fail early on a file that is not a store.
    store.read(|_| Ok(()))?;
    log::debug!("opened history store {}", store.path.display());
    Ok(store)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn lock_file(&self) -> Result<RwLock<File>> {
    let file = OpenOptions::new()
      .create(true)
      .read(true)
      .write(true)
      .truncate(false)
      .open(&self.lock)?;
    Ok(RwLock::new(file))
  }

  fn read<T>(&self, f: impl FnOnce(&State) -> Result<T>) -> Result<T> {
    let lock = self.lock_file()?;
    let _guard = lock.read()?;
    f(&load(&self.path)?)
  }

  fn write<T>(&self, f: impl FnOnce(&mut State) -> Result<T>) -> Result<T> {
    let mut lock = self.lock_file()?;
    let _guard = lock.write()?;
    let mut state = load(&self.path)?;
    let out = f(&mut state)?;
    persist(&self.path, &state)?;
    Ok(out)
  }
}

fn parent_dir(path: &Path) -> &Path {
  match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  }
}

fn load(path: &Path) -> Result<State> {
  match std::fs::read(path) {
    Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
    Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(State::default()),
    Err(err) => Err(err.into()),
  }
}

fn persist(path: &Path, state: &State) -> Result<()> {
  let dir = parent_dir(path);
  let bytes = serde_json::to_vec_pretty(state)?;
  let mut file = NamedTempFile::new_in(dir)?;
  file.write_all(&bytes)?;
  file.as_file().sync_all()?;
  file.persist(path).map_err(|err| err.error)?;
  log::trace!("wrote {} bytes to {}", bytes.len(), path.display());
  Ok(())
}

impl HistoryStore for FileStore {
  fn insert_document(&self, document: DocumentId, owner: OwnerId) -> Result<()> {
    self.write(|state| state.insert_document(document, owner))
  }

  fn remove_document(&self, document: DocumentId) -> Result<()> {
    self.write(|state| state.remove_document(document))
  }

  fn document(&self, document: DocumentId) -> Result<DocumentRecord> {
    self.read(|state| state.document(document))
  }

  fn update_content(&self, document: DocumentId, content: &str) -> Result<()> {
    self.write(|state| state.update_content(document, content))
  }

  fn append_patch(&self, document: DocumentId, ranking: u64, patch: NewPatch) -> Result<Patch> {
    self.write(|state| state.append_patch(document, ranking, patch))
  }

  fn max_ranking(&self, document: DocumentId) -> Result<u64> {
    self.read(|state| state.max_ranking(document))
  }

  fn patch(&self, patch: PatchId) -> Result<Patch> {
    self.read(|state| state.patch(patch))
  }

  fn patches_up_to(&self, document: DocumentId, max_ranking: u64) -> Result<Vec<Patch>> {
    self.read(|state| state.patches_up_to(document, max_ranking))
  }

  fn insert_proposal(&self, proposal: &Proposal) -> Result<ProposalId> {
    self.write(|state| state.insert_proposal(proposal))
  }

  fn proposal(&self, proposal: ProposalId) -> Result<Proposal> {
    self.read(|state| state.proposal(proposal))
  }

  fn delete_proposal(&self, proposal: ProposalId) -> Result<()> {
    self.write(|state| state.delete_proposal(proposal))
  }

  fn replace_proposal(&self, old: ProposalId, proposal: &Proposal) -> Result<ProposalId> {
    self.write(|state| state.replace_proposal(old, proposal))
  }

  fn proposals(&self, document: DocumentId) -> Result<Vec<Proposal>> {
    self.read(|state| state.proposals(document))
  }

  fn commit(
    &self,
    document: DocumentId,
    expected_head: Option<PatchId>,
    patch: NewPatch,
    content: &str,
    consumed: Option<ProposalId>,
  ) -> Result<Patch> {
    self.write(|state| state.commit(document, expected_head, patch, content, consumed))
  }
}
