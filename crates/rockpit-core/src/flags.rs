/// Per-call options for a [`Rocks`](crate::Rocks) operation.
///
/// Repository precedence: `from` prepends one repository ahead of the
/// defaults; `only_from` replaces the whole list with one repository. When
/// both are given, `from` wins and `only_from` is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationFlags {
    pub from: Option<String>,
    pub only_from: Option<String>,
    /// Also consult the engine's own (shared) trees when checking whether
    /// dependencies are already installed. Installs still land in the
    /// project tree.
    pub use_local: bool,
    pub only_deps: bool,
    pub force: bool,
    pub outdated: bool,
    pub porcelain: bool,
}

impl OperationFlags {
    #[must_use]
    pub fn from_repository(mut self, repository: impl Into<String>) -> Self {
        self.from = Some(repository.into());
        self
    }

    #[must_use]
    pub fn only_from_repository(mut self, repository: impl Into<String>) -> Self {
        self.only_from = Some(repository.into());
        self
    }

    #[must_use]
    pub fn with_use_local(mut self, use_local: bool) -> Self {
        self.use_local = use_local;
        self
    }

    #[must_use]
    pub fn with_only_deps(mut self, only_deps: bool) -> Self {
        self.only_deps = only_deps;
        self
    }

    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}
