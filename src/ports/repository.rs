//! Repository port for planning episode persistence.

use std::path::Path;

use crate::{Result, agent::PlanningEpisode};

/// Port for persisting and loading [`PlanningEpisode`]s.
///
/// Implementations choose the on-disk format. Loading re-runs model
/// validation, so a repository never hands back an inconsistent model.
///
/// # Examples
///
/// ```no_run
/// use inductive_aif::agent::PlanningEpisode;
/// use inductive_aif::ports::ModelRepository;
/// use std::path::Path;
///
/// fn archive<R: ModelRepository>(
///     repo: &R,
///     episode: &PlanningEpisode,
///     path: &Path,
/// ) -> inductive_aif::Result<()> {
///     repo.save(episode, path)
/// }
/// ```
pub trait ModelRepository {
    /// Save an episode to persistent storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can not be created or serialization fails.
    fn save(&self, episode: &PlanningEpisode, path: &Path) -> Result<()>;

    /// Load an episode from persistent storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can not be read, is malformed, or holds
    /// a model that fails validation.
    fn load(&self, path: &Path) -> Result<PlanningEpisode>;
}
