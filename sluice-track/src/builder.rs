// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Build the [`Tracker`] requested by an application's configuration.

use std::fs;
use std::io::BufWriter;
use std::rc::Rc;

use crate::tracker::{EntityManager, MultiTracker, TextTracker, dev_null_tracker};
use crate::{TrackConfigError, Tracker, Writer};

/// Configuration of a single text tracker.
#[derive(Clone, Debug)]
pub struct TrackerConfig<'a> {
    /// Whether this tracker is enabled.
    pub enable: bool,

    /// Level applied to entities matching `filter_regex` (or all entities if
    /// the regex is empty).
    pub level: log::Level,

    /// Entities to enable at `level`; all others are limited to errors.
    pub filter_regex: &'a str,

    /// File to write to, `None` means `stdout`.
    pub file: Option<&'a str>,
}

impl Default for TrackerConfig<'_> {
    fn default() -> Self {
        Self {
            enable: true,
            level: log::Level::Warn,
            filter_regex: "",
            file: None,
        }
    }
}

fn build_text_tracker(config: &TrackerConfig) -> Result<Tracker, TrackConfigError> {
    let default_level = if config.filter_regex.is_empty() {
        config.level
    } else {
        log::Level::Error
    };
    let mut entity_manager = EntityManager::new(default_level);
    if !config.filter_regex.is_empty() {
        entity_manager.add_entity_level_filter(config.filter_regex, config.level)?;
    }

    let writer: Writer = match config.file {
        Some(path) => {
            let file = fs::File::create(path).map_err(|e| {
                TrackConfigError(format!("Failed to create log file {path}: {e}"))
            })?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(std::io::stdout())),
    };
    Ok(Rc::new(TextTracker::new(entity_manager, writer)))
}

/// Set up the stdout and log-file trackers. When both are enabled their
/// events are fanned out through a [`MultiTracker`].
pub fn setup_trackers(
    stdout: &TrackerConfig,
    log_file: &TrackerConfig,
) -> Result<Tracker, TrackConfigError> {
    match (stdout.enable, log_file.enable && log_file.file.is_some()) {
        (true, true) => {
            let mut tracker = MultiTracker::default();
            tracker.add_tracker(build_text_tracker(stdout)?);
            tracker.add_tracker(build_text_tracker(log_file)?);
            Ok(Rc::new(tracker))
        }
        (true, false) => build_text_tracker(&TrackerConfig {
            file: None,
            ..stdout.clone()
        }),
        (false, true) => build_text_tracker(log_file),
        (false, false) => Ok(dev_null_tracker()),
    }
}
