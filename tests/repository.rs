//! Saving and loading planning episodes.

mod common;

use common::{grid_model, one_hot};
use inductive_aif::{
    Error, PlannerConfig, PlanningEpisode,
    adapters::{JsonModelRepository, MsgPackModelRepository},
    ports::ModelRepository,
};
use tempfile::TempDir;

fn grid_episode() -> PlanningEpisode {
    PlanningEpisode {
        model: grid_model([4, 2]),
        goals: vec![one_hot(5, 4), one_hot(3, 2)],
        initial_beliefs: vec![one_hot(5, 0), one_hot(3, 0)],
        config: PlannerConfig::default().with_policy_len(2).with_seed(9),
    }
}

fn roundtrip<R: ModelRepository>(repo: &R, file_name: &str) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join(file_name);

    let episode = grid_episode();
    repo.save(&episode, &path).expect("Failed to save episode");
    assert!(path.exists(), "Saved file should exist");

    let loaded = repo.load(&path).expect("Failed to load episode");
    assert_eq!(loaded, episode);

    let mut original = episode.into_agent().unwrap();
    let mut restored = loaded.into_agent().unwrap();
    original.infer_policies().unwrap();
    restored.infer_policies().unwrap();
    assert_eq!(original.posterior(), restored.posterior());
}

#[test]
fn json_roundtrip_preserves_planning() {
    roundtrip(&JsonModelRepository::new(), "episode.json");
}

#[test]
fn msgpack_roundtrip_preserves_planning() {
    roundtrip(&MsgPackModelRepository::new(), "episode.msgpack");
}

#[test]
fn json_episode_without_config_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("episode.json");
    let mut value = serde_json::to_value(grid_episode()).unwrap();
    value.as_object_mut().unwrap().remove("config");
    std::fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

    let loaded = JsonModelRepository.load(&path).unwrap();
    assert_eq!(loaded.config, PlannerConfig::default());
}

#[test]
fn wrong_format_is_a_serialization_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("episode.msgpack");
    MsgPackModelRepository.save(&grid_episode(), &path).unwrap();

    let result = JsonModelRepository.load(&path);
    assert!(matches!(result, Err(Error::SerializationContext { .. })));
}
