pub mod inspect;
pub mod select;

use std::path::Path;

use anyhow::Context;
use tracing::debug;

use fleecy_core::{FleecyConfig, Participant};
use fleecy_selection::VmSelector;

/// Config, the requested participant and a selector wired for them.
pub struct Session {
    pub config: FleecyConfig,
    pub participant: Participant,
    pub selector: VmSelector,
}

impl Session {
    pub fn open(config_path: &Path, participant_id: &str) -> anyhow::Result<Self> {
        let config = load_config(config_path)?;
        let participant = config.participant(participant_id)?.clone();
        let selector = fleecy_cloud::build_selector(&config)?;
        debug!(
            config = %config_path.display(),
            participant = %participant.id,
            mode = ?config.provider.mode,
            "session opened"
        );
        Ok(Self {
            config,
            participant,
            selector,
        })
    }
}

pub fn load_config(path: &Path) -> anyhow::Result<FleecyConfig> {
    FleecyConfig::from_file(path).with_context(|| format!("Failed to load {}", path.display()))
}
