use crate::CoreError;
use rockpit_engine::{AnonymousRockspec, DepsMode, EngineError, InstalledRock, PackageEngine};
use rockpit_schema::{DependencySpec, ParseError};
use tracing::debug;

/// A parsed project dependency list, ready to hand to an engine.
///
/// Parsing is all-or-nothing: the first bad specifier aborts, and nothing
/// reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fulfillment {
    rockspec: AnonymousRockspec,
}

impl Fulfillment {
    pub fn parse<S: AsRef<str>>(project_name: &str, specifiers: &[S]) -> Result<Self, ParseError> {
        let dependencies = specifiers
            .iter()
            .map(|s| DependencySpec::parse(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            rockspec: AnonymousRockspec::new(project_name, dependencies),
        })
    }

    pub fn dependencies(&self) -> &[DependencySpec] {
        &self.rockspec.dependencies
    }

    pub fn rockspec(&self) -> &AnonymousRockspec {
        &self.rockspec
    }

    /// Ask the engine to satisfy every dependency.
    pub fn run(&self, engine: &dyn PackageEngine) -> Result<Vec<InstalledRock>, EngineError> {
        debug!(
            "fulfilling {} dependencies for '{}'",
            self.rockspec.dependencies.len(),
            self.rockspec.name
        );
        engine.fulfill_dependencies(&self.rockspec, DepsMode::All)
    }
}

/// Parse `specifiers` and have `engine` satisfy them under whatever
/// configuration it currently holds.
pub fn fulfill<S: AsRef<str>>(
    engine: &dyn PackageEngine,
    project_name: &str,
    specifiers: &[S],
) -> Result<Vec<InstalledRock>, CoreError> {
    let plan = Fulfillment::parse(project_name, specifiers)?;
    Ok(plan.run(engine)?)
}
