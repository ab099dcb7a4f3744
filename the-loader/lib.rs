pub mod config;

use std::{
  path::{
    Path,
    PathBuf,
  },
  sync::OnceLock,
};

use etcetera::base_strategy::{
  BaseStrategy,
  choose_base_strategy,
};

const APP_DIR: &str = "the-scribe";

static CONFIG_FILE: OnceLock<PathBuf> = OnceLock::new();

static LOG_FILE: OnceLock<PathBuf> = OnceLock::new();

pub fn initialize_config_file(specified_file: Option<PathBuf>) {
  let config_file = specified_file.unwrap_or_else(default_config_file);
  ensure_parent_dir(&config_file);
  CONFIG_FILE.set(config_file).ok();
}

pub fn initialize_log_file(specified_file: Option<PathBuf>) {
  let log_file = specified_file.unwrap_or_else(default_log_file);
  ensure_parent_dir(&log_file);
  LOG_FILE.set(log_file).ok();
}

#[derive(Clone, Copy)]
enum BaseDir {
  Config,
  Cache,
  Data,
}

/// Resolve one of the per-user directories.
///
/// `var` takes precedence over the platform location. Without a usable home
/// directory the path falls back to a dot directory below the working
/// directory.
fn base_dir(var: &str, base: BaseDir) -> PathBuf {
  if let Some(path) = std::env::var_os(var) {
    return expand_tilde(Path::new(&path));
  }
  match choose_base_strategy() {
    Ok(strategy) => {
      let mut path = match base {
        BaseDir::Config => strategy.config_dir(),
        BaseDir::Cache => strategy.cache_dir(),
        BaseDir::Data => strategy.data_dir(),
      };
      path.push(APP_DIR);
      path
    },
    Err(err) => {
      log::warn!("no home directory ({err}), using ./.{APP_DIR}");
      PathBuf::from(format!(".{APP_DIR}"))
    },
  }
}

pub fn config_dir() -> PathBuf {
  base_dir("THE_SCRIBE_CONFIG_DIR", BaseDir::Config)
}

pub fn cache_dir() -> PathBuf {
  base_dir("THE_SCRIBE_CACHE_DIR", BaseDir::Cache)
}

pub fn data_dir() -> PathBuf {
  base_dir("THE_SCRIBE_DATA_DIR", BaseDir::Data)
}

pub fn config_file() -> PathBuf {
  CONFIG_FILE
    .get_or_init(|| {
      let path = default_config_file();
      ensure_parent_dir(&path);
      path
    })
    .clone()
}

pub fn log_file() -> PathBuf {
  LOG_FILE
    .get_or_init(|| {
      let path = default_log_file();
      ensure_parent_dir(&path);
      path
    })
    .clone()
}

pub fn workspace_config_file() -> PathBuf {
  find_workspace().0.join(".the-scribe").join("config.toml")
}

pub fn default_log_file() -> PathBuf {
  cache_dir().join("the-scribe.log")
}

/// Where histories are kept unless the config or command line says otherwise.
pub fn default_store_file() -> PathBuf {
  data_dir().join("history.json")
}

/// Replace a leading `~` with the home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let mut components = path.components();
  if let Some(std::path::Component::Normal(first)) = components.next()
    && first == "~"
    && let Ok(home) = etcetera::home_dir()
  {
    return home.join(components.as_path());
  }
  path.to_path_buf()
}

/// Merge two TOML documents, merging values from `right` onto `left`
///
/// `merge_depth` sets the nesting depth up to which values are merged instead
/// of overridden.
///
/// When a table exists in both `left` and `right`, the merged table consists of
/// all keys in `left`'s table unioned with all keys in `right` with the values
/// of `right` being merged recursively onto values of `left`. Arrays of tables
/// are merged entry by entry when the entries carry a matching `name`.
pub fn merge_toml_values(left: toml::Value, right: toml::Value, merge_depth: usize) -> toml::Value {
  use toml::Value;

  fn get_name(v: &Value) -> Option<&str> {
    v.get("name").and_then(Value::as_str)
  }

  match (left, right) {
    (Value::Array(mut left_items), Value::Array(right_items)) => {
      if merge_depth > 0 {
        left_items.reserve(right_items.len());
        for rvalue in right_items {
          let lvalue = get_name(&rvalue)
            .and_then(|rname| left_items.iter().position(|v| get_name(v) == Some(rname)))
            .map(|lpos| left_items.remove(lpos));
          let mvalue = match lvalue {
            Some(lvalue) => merge_toml_values(lvalue, rvalue, merge_depth - 1),
            None => rvalue,
          };
          left_items.push(mvalue);
        }
        Value::Array(left_items)
      } else {
        Value::Array(right_items)
      }
    },
    (Value::Table(mut left_map), Value::Table(right_map)) => {
      if merge_depth > 0 {
        for (rname, rvalue) in right_map {
          let merged = match left_map.remove(&rname) {
            Some(lvalue) => merge_toml_values(lvalue, rvalue, merge_depth - 1),
            None => rvalue,
          };
          left_map.insert(rname, merged);
        }
        Value::Table(left_map)
      } else {
        Value::Table(right_map)
      }
    },
    (_, value) => value,
  }
}

/// Finds the current workspace folder.
///
/// Searches upward from the working directory for the first directory that
/// contains `.git`, `.jj` or `.the-scribe`. Returns `(dir, true)` with the
/// working directory itself if there is none, `(workspace, false)` otherwise.
pub fn find_workspace() -> (PathBuf, bool) {
  match std::env::current_dir() {
    Ok(current_dir) => find_workspace_in(current_dir),
    Err(_) => (PathBuf::new(), true),
  }
}

pub fn find_workspace_in(dir: impl AsRef<Path>) -> (PathBuf, bool) {
  let dir = dir.as_ref();
  for ancestor in dir.ancestors() {
    if ancestor.join(".git").exists()
      || ancestor.join(".jj").exists()
      || ancestor.join(".the-scribe").exists()
    {
      return (ancestor.to_owned(), false);
    }
  }

  (dir.to_owned(), true)
}

fn default_config_file() -> PathBuf {
  config_dir().join("config.toml")
}

fn ensure_parent_dir(path: &Path) {
  if let Some(parent) = path.parent()
    && !parent.exists()
  {
    std::fs::create_dir_all(parent).ok();
  }
}

#[cfg(test)]
mod merge_toml_tests {
  use toml::Value;

  use super::merge_toml_values;

  #[test]
  fn nested_tables_merge() {
    const USER: &str = r#"
        owner = 12

        [diff]
        max-char-diff-ratio = 8
        "#;

    let base: Value = toml::from_str(crate::config::DEFAULT_CONFIG).unwrap();
    let user: Value = toml::from_str(USER).unwrap();

    let merged = merge_toml_values(base, user, 3);
    let diff = merged.get("diff").unwrap();
    assert_eq!(merged.get("owner").unwrap().as_integer(), Some(12));
    assert_eq!(
      diff.get("max-char-diff-ratio").unwrap().as_integer(),
      Some(8)
    );
    // Untouched keys of the default survive.
    assert_eq!(
      diff.get("max-char-diff-total-lines").unwrap().as_integer(),
      Some(200)
    );
  }

  #[test]
  fn shallow_merge_replaces_tables() {
    let base: Value = toml::from_str("[diff]\na = 1\nb = 2\n").unwrap();
    let user: Value = toml::from_str("[diff]\nb = 3\n").unwrap();

    let merged = merge_toml_values(base, user, 1);
    let diff = merged.get("diff").unwrap();
    assert!(diff.get("a").is_none());
    assert_eq!(diff.get("b").unwrap().as_integer(), Some(3));
  }

  #[test]
  fn named_array_entries_merge() {
    let base: Value = toml::from_str(
      r#"
        [[remote]]
        name = "origin"
        url = "a"
        read-only = true
        "#,
    )
    .unwrap();
    let user: Value = toml::from_str(
      r#"
        [[remote]]
        name = "origin"
        url = "b"

        [[remote]]
        name = "backup"
        url = "c"
        "#,
    )
    .unwrap();

    let merged = merge_toml_values(base, user, 3);
    let remotes = merged.get("remote").unwrap().as_array().unwrap();
    assert_eq!(remotes.len(), 2);
    let origin = &remotes[0];
    assert_eq!(origin.get("url").unwrap().as_str(), Some("b"));
    assert_eq!(origin.get("read-only").unwrap().as_bool(), Some(true));
  }
}
