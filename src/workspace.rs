use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

pub type WorkspaceId = u32;

/// Which workspace goes on which monitor, keyed by monitor descriptor.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Layout {
    workspaces: BTreeMap<String, WorkspaceId>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, descriptor: &str) -> Option<WorkspaceId> {
        self.workspaces.get(descriptor).copied()
    }

    pub fn contains(&self, descriptor: &str) -> bool {
        self.workspaces.contains_key(descriptor)
    }

    /// Returns the workspace previously assigned to `descriptor`, if any.
    pub fn insert(
        &mut self,
        descriptor: impl Into<String>,
        id: WorkspaceId,
    ) -> Option<WorkspaceId> {
        self.workspaces.insert(descriptor.into(), id)
    }

    pub fn remove(&mut self, descriptor: &str) -> Option<WorkspaceId> {
        self.workspaces.remove(descriptor)
    }

    pub fn len(&self) -> usize {
        self.workspaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workspaces.is_empty()
    }

    pub fn monitors(&self) -> BTreeSet<&str> {
        self.workspaces.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, WorkspaceId)> {
        self.workspaces.iter().map(|(desc, id)| (desc.as_str(), *id))
    }
}

impl<S: Into<String>> FromIterator<(S, WorkspaceId)> for Layout {
    fn from_iter<I: IntoIterator<Item = (S, WorkspaceId)>>(iter: I) -> Self {
        Self {
            workspaces: iter.into_iter().map(|(desc, id)| (desc.into(), id)).collect(),
        }
    }
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.workspaces.iter()).finish()
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (desc, id) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{desc}={id}")?;
        }
        Ok(())
    }
}
