use std::{
    collections::HashMap,
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::debug;

use waypost_common::{PrincipalId, Result};

/// Token written when a principal carries no metadata.
const ABSENT_TOKEN: &str = "?";

struct Inner {
    path: PathBuf,
    members: HashMap<PrincipalId, String>,
}

/// Durable set of authorized principals.
///
/// Every operation serializes through one lock covering both the file and the
/// in-memory map, so the two never observably diverge. `remove` rewrites the
/// whole file, O(n) in record count; fine for the expected tens to low
/// thousands of members.
pub struct RosterStore {
    inner: Mutex<Inner>,
}

impl RosterStore {
    /// Open the roster at `path`, creating an empty file if absent.
    ///
    /// Malformed lines (fewer than two fields, non-numeric id) are skipped;
    /// a partially corrupt roster still loads. I/O failure here is an error,
    /// since callers cannot proceed without their durable state.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        if !path.exists() {
            File::create(&path)?;
        }

        let mut members = HashMap::new();
        for line in fs::read_to_string(&path)?.lines() {
            let mut fields = line.split_whitespace();
            let (Some(id_field), Some(token)) = (fields.next(), fields.next()) else {
                continue;
            };
            let Ok(id) = id_field.parse::<PrincipalId>() else {
                debug!(line, "skipping roster line with non-numeric id");
                continue;
            };
            members.insert(id, token.to_string());
        }

        debug!(path = %path.display(), members = members.len(), "roster loaded");
        Ok(Self {
            inner: Mutex::new(Inner { path, members }),
        })
    }

    /// Authorize a principal. Appends one record and updates the map.
    ///
    /// Returns `Ok(false)` without touching the file when the id is already a
    /// member, so the log never accumulates duplicate records.
    pub fn add(&self, id: PrincipalId, token: Option<&str>) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        if inner.members.contains_key(&id) {
            return Ok(false);
        }

        let token = token.unwrap_or(ABSENT_TOKEN);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&inner.path)?;
        writeln!(file, "{id} {token}")?;

        inner.members.insert(id, token.to_string());
        Ok(true)
    }

    /// Revoke a principal, compacting the file.
    ///
    /// Non-matching records are rewritten to `<path>.tmp`, which is then
    /// renamed over the original. A crash before the rename leaves the
    /// original untouched; a crash after leaves the compacted file. Stale
    /// `.tmp` files from a mid-write crash are not cleaned up here.
    ///
    /// Returns `Ok(false)` for a non-member: neither file nor map changes.
    pub fn remove(&self, id: PrincipalId) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.members.contains_key(&id) {
            return Ok(false);
        }

        let tmp_path = tmp_path_for(&inner.path);
        let id_field = id.to_string();

        let source = fs::read_to_string(&inner.path)?;
        let mut out = BufWriter::new(File::create(&tmp_path)?);
        for line in source.lines() {
            if line.split_whitespace().next() != Some(id_field.as_str()) {
                writeln!(out, "{line}")?;
            }
        }
        out.flush()?;
        out.get_ref().sync_all()?;
        drop(out);

        fs::rename(&tmp_path, &inner.path)?;
        inner.members.remove(&id);
        Ok(true)
    }

    /// O(1) membership check.
    pub fn contains(&self, id: PrincipalId) -> bool {
        self.inner.lock().unwrap().members.contains_key(&id)
    }

    /// All member ids at this instant. Enumeration order is unspecified.
    pub fn snapshot(&self) -> Vec<PrincipalId> {
        self.inner.lock().unwrap().members.keys().copied().collect()
    }

    /// Current member count.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}
