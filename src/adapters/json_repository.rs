//! JSON implementation of the model repository.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use tracing::debug;

use crate::{Result, agent::PlanningEpisode, error::Error, ports::ModelRepository};

/// Human-readable episode storage, pretty-printed with serde_json.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonModelRepository;

impl JsonModelRepository {
    pub fn new() -> Self {
        Self
    }
}

impl ModelRepository for JsonModelRepository {
    fn save(&self, episode: &PlanningEpisode, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|source| Error::Io {
            operation: format!("create file {path:?}"),
            source,
        })?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer_pretty(&mut writer, episode).map_err(|e| {
            Error::SerializationContext {
                operation: "serialize episode to JSON".to_string(),
                message: e.to_string(),
            }
        })?;
        writer.flush().map_err(|source| Error::Io {
            operation: format!("flush file {path:?}"),
            source,
        })?;

        debug!(path = %path.display(), "saved planning episode");
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<PlanningEpisode> {
        let file = File::open(path).map_err(|source| Error::Io {
            operation: format!("open file {path:?}"),
            source,
        })?;

        serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::SerializationContext {
            operation: "deserialize episode from JSON".to_string(),
            message: e.to_string(),
        })
    }
}
