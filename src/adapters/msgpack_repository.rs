//! MessagePack implementation of the model repository.

use std::{fs::File, path::Path};

use tracing::debug;

use crate::{Result, agent::PlanningEpisode, error::Error, ports::ModelRepository};

/// Compact binary episode storage via rmp_serde.
///
/// # Examples
///
/// ```no_run
/// use inductive_aif::adapters::MsgPackModelRepository;
/// use inductive_aif::ports::ModelRepository;
/// use std::path::Path;
///
/// let repo = MsgPackModelRepository;
/// let episode = repo.load(Path::new("grid.msgpack"))?;
/// let agent = episode.into_agent()?;
/// # Ok::<(), inductive_aif::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackModelRepository;

impl MsgPackModelRepository {
    pub fn new() -> Self {
        Self
    }
}

impl ModelRepository for MsgPackModelRepository {
    fn save(&self, episode: &PlanningEpisode, path: &Path) -> Result<()> {
        let mut file = File::create(path).map_err(|source| Error::Io {
            operation: format!("create file {path:?}"),
            source,
        })?;

        rmp_serde::encode::write_named(&mut file, episode).map_err(|e| {
            Error::SerializationContext {
                operation: "serialize episode to MessagePack".to_string(),
                message: e.to_string(),
            }
        })?;

        debug!(path = %path.display(), "saved planning episode");
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<PlanningEpisode> {
        let file = File::open(path).map_err(|source| Error::Io {
            operation: format!("open file {path:?}"),
            source,
        })?;

        rmp_serde::decode::from_read(&file).map_err(|e| Error::SerializationContext {
            operation: "deserialize episode from MessagePack".to_string(),
            message: e.to_string(),
        })
    }
}
