//! Trace storage - one pretty-printed JSON file per exported trace

use crate::events::Trace;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub struct TraceStorage {
    dir: PathBuf,
}

impl TraceStorage {
    /// `~/.actiontrace`
    pub fn new() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME not set")?;
        Self::with_dir(PathBuf::from(home).join(".actiontrace"))
    }

    pub fn with_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Save as `action-trace-<recordedAt>.json`, never overwriting
    pub fn save(&self, trace: &Trace) -> Result<PathBuf> {
        let stamp = trace
            .metadata
            .recorded_at
            .format("%Y-%m-%dT%H-%M-%S-%3fZ")
            .to_string();
        let mut path = self.dir.join(format!("action-trace-{}.json", stamp));
        let mut n = 1;
        while path.exists() {
            path = self.dir.join(format!("action-trace-{}-{}.json", stamp, n));
            n += 1;
        }

        fs::write(&path, trace.to_json()?)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    /// Load by file name inside the storage dir, or by an existing path
    pub fn load(&self, file: &str) -> Result<Trace> {
        let path = self.resolve(file);
        let json =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let trace = Trace::from_json(&json)?;
        Ok(trace)
    }

    /// Saved trace file names, oldest first
    pub fn list(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(s) = name.to_str() {
                if s.ends_with(".json") {
                    files.push(s.to_string());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn delete(&self, file: &str) -> Result<()> {
        let path = self.dir.join(file);
        fs::remove_file(&path).with_context(|| format!("deleting {}", path.display()))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn resolve(&self, file: &str) -> PathBuf {
        let in_dir = self.dir.join(file);
        if in_dir.exists() {
            in_dir
        } else {
            PathBuf::from(file)
        }
    }
}
