//! Runtime script emission.
//!
//! A component's script is written at most once per emitter, no matter how
//! many documents resolve the component or how many resolutions race. The
//! first caller for a name wins an in-flight guard; everyone else awaits
//! the same write.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::registry::RuntimeScript;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to create scripts directory {dir}: {source}")]
    CreateDir {
        dir: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write runtime script {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct ScriptEmitter {
    scripts_dir: Utf8PathBuf,
    cells: Mutex<FxHashMap<SmolStr, Arc<OnceCell<Utf8PathBuf>>>>,
    written: AtomicUsize,
}

impl ScriptEmitter {
    pub fn new(scripts_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
            cells: Mutex::new(FxHashMap::default()),
            written: AtomicUsize::new(0),
        }
    }

    pub fn scripts_dir(&self) -> &Utf8Path {
        &self.scripts_dir
    }

    pub fn script_path(&self, name: &str) -> Utf8PathBuf {
        self.scripts_dir.join(format!("{name}.js"))
    }

    /// Emits `script` for component `name`, once. Concurrent callers for the
    /// same name coalesce onto a single write.
    pub async fn emit(
        &self,
        name: &SmolStr,
        script: &RuntimeScript,
    ) -> Result<Utf8PathBuf, ScriptError> {
        let cell = {
            let mut cells = self
                .cells
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(cells.entry(name.clone()).or_default())
        };
        cell.get_or_try_init(|| self.write_script(name, script))
            .await
            .cloned()
    }

    /// Number of scripts actually written to disk. Unchanged content found
    /// on disk does not count.
    pub fn written_count(&self) -> usize {
        self.written.load(Ordering::Relaxed)
    }

    async fn write_script(
        &self,
        name: &str,
        script: &RuntimeScript,
    ) -> Result<Utf8PathBuf, ScriptError> {
        tokio::fs::create_dir_all(&self.scripts_dir)
            .await
            .map_err(|source| ScriptError::CreateDir { dir: self.scripts_dir.clone(), source })?;

        let path = self.script_path(name);
        if let Ok(existing) = tokio::fs::read(&path).await {
            if blake3::hash(&existing) == blake3::hash(script.source.as_bytes()) {
                return Ok(path);
            }
        }
        tokio::fs::write(&path, &script.source)
            .await
            .map_err(|source| ScriptError::Write { path: path.clone(), source })?;
        self.written.fetch_add(1, Ordering::Relaxed);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf8_dir(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[tokio::test]
    async fn repeated_emits_write_once() {
        let dir = tempfile::tempdir().unwrap();
        let emitter = ScriptEmitter::new(utf8_dir(&dir).join("scripts"));
        let script = RuntimeScript::new("console.log('quiz');");
        let name = SmolStr::new("quiz");

        let first = emitter.emit(&name, &script).await.unwrap();
        let second = emitter.emit(&name, &script).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(emitter.written_count(), 1);
        assert_eq!(
            tokio::fs::read_to_string(&first).await.unwrap(),
            "console.log('quiz');"
        );
    }

    #[tokio::test]
    async fn concurrent_emits_coalesce() {
        let dir = tempfile::tempdir().unwrap();
        let emitter = Arc::new(ScriptEmitter::new(utf8_dir(&dir).join("scripts")));
        let script = RuntimeScript::new("export {};");
        let name = SmolStr::new("tabs");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let emitter = Arc::clone(&emitter);
            let script = script.clone();
            let name = name.clone();
            handles.push(tokio::spawn(async move { emitter.emit(&name, &script).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(emitter.written_count(), 1);
    }

    #[tokio::test]
    async fn unchanged_on_disk_content_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let scripts_dir = utf8_dir(&dir);
        tokio::fs::write(scripts_dir.join("details.js"), "noop();")
            .await
            .unwrap();

        let emitter = ScriptEmitter::new(scripts_dir);
        let name = SmolStr::new("details");
        emitter
            .emit(&name, &RuntimeScript::new("noop();"))
            .await
            .unwrap();
        assert_eq!(emitter.written_count(), 0);
    }
}
