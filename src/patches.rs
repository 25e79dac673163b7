use std::path::{Path, PathBuf};

/// Local checkout of the cross-build patch collection; one directory per source package.
#[derive(Clone, Debug)]
pub struct PatchDir {
    root: PathBuf,
}

impl PatchDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        if !root.is_dir() { log::debug!("Patch directory {} not found; no patch links will be added", root.display()); }
        Self { root }
    }

    pub fn root(&self) -> &Path { &self.root }

    pub fn has_patch(&self, name: &str) -> bool {
        if !is_plain_name(name) { return false; }
        self.root.join(name).is_dir()
    }
}

// A package name must stay a single path component below the patch root.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}
