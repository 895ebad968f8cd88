//! Bulk geo-tagging: write coordinates into per-file metadata, the media
//! index, and the transaction log.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use mediaflux_core::{EngineError, LogEntryKind, OperationCode, SelectedFileSet};

use crate::engine::MutationEngine;
use crate::hooks::ProgressSink;
use crate::write_guard::first_write_protected;

/// Opens per-file metadata write sessions.
///
/// Embedded-metadata formats are a deployment concern; the engine only
/// needs the open/set/commit protocol.
pub trait GeoWriter: Send {
    /// Open a write session for one file.
    fn begin(&self, path: &Path) -> Result<Box<dyn GeoSession>, EngineError>;
}

/// One per-file metadata write session.
pub trait GeoSession {
    /// Stage the coordinates.
    fn set_lat_lon(&mut self, latitude: f64, longitude: f64);

    /// Commit the staged write.
    fn commit(self: Box<Self>) -> Result<(), EngineError>;
}

/// Geo writer that stores coordinates in a JSON sidecar next to the file
/// (`photo.jpg` -> `photo.jpg.geo.json`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SidecarGeoWriter;

impl GeoWriter for SidecarGeoWriter {
    fn begin(&self, path: &Path) -> Result<Box<dyn GeoSession>, EngineError> {
        if !path.exists() {
            return Err(EngineError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            ));
        }
        Ok(Box::new(SidecarSession {
            sidecar: sidecar_path(path),
            staged: None,
        }))
    }
}

#[derive(Serialize)]
struct SidecarPayload {
    latitude: f64,
    longitude: f64,
}

struct SidecarSession {
    sidecar: PathBuf,
    staged: Option<SidecarPayload>,
}

impl GeoSession for SidecarSession {
    fn set_lat_lon(&mut self, latitude: f64, longitude: f64) {
        self.staged = Some(SidecarPayload {
            latitude,
            longitude,
        });
    }

    fn commit(self: Box<Self>) -> Result<(), EngineError> {
        let Some(payload) = self.staged else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&payload)
            .map_err(|e| EngineError::io(&self.sidecar, std::io::Error::other(e)))?;
        fs::write(&self.sidecar, json).map_err(|e| EngineError::io(&self.sidecar, e))
    }
}

/// Sidecar location for a media file.
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".geo.json");
    PathBuf::from(os)
}

/// Format one coordinate with six fractional digits, locale-independent.
pub fn format_lat_lon(value: f64) -> String {
    format!("{value:.6}")
}

impl MutationEngine {
    /// Write geo coordinates into each selected file's metadata, the index
    /// and the log, reporting progress at the configured tick interval.
    pub fn set_geo(
        &mut self,
        latitude: f64,
        longitude: f64,
        items: &SelectedFileSet,
        progress: &mut dyn ProgressSink,
    ) -> Result<i64, EngineError> {
        let tick = self.config.items_per_progress;
        self.set_geo_every(latitude, longitude, items, tick, progress)
    }

    /// Like [`set_geo`](Self::set_geo), with an explicit progress tick.
    ///
    /// Non-finite coordinates and empty selections change nothing. Progress
    /// is reported every `items_per_tick` items and the sink may cancel the
    /// remaining loop; already-written items are not rolled back. Returns
    /// the number of index rows whose geo field was updated, which may be
    /// lower than the number of successful metadata writes.
    pub fn set_geo_every(
        &mut self,
        latitude: f64,
        longitude: f64,
        items: &SelectedFileSet,
        items_per_tick: usize,
        progress: &mut dyn ProgressSink,
    ) -> Result<i64, EngineError> {
        if !latitude.is_finite() || !longitude.is_finite() || items.is_empty() {
            tracing::warn!(
                target: "mediaflux_ops",
                latitude,
                longitude,
                items = items.len(),
                "geo tagging skipped"
            );
            return Ok(0);
        }
        if let Some(err) = first_write_protected("Set geo", items.paths()) {
            return Err(err);
        }
        self.hooks
            .on_pre_process("setGeo", OperationCode::Update, items);
        self.logger.open()?;

        let payload = format!(
            "{} {}",
            format_lat_lon(latitude),
            format_lat_lon(longitude)
        );
        let total = items.len();
        let tick = items_per_tick.max(1);
        let mut countdown = 0usize;
        let mut done = 0usize;
        let mut rows_updated = 0i64;

        for (id, path) in items.iter() {
            if countdown == 0 {
                countdown = tick;
                if !progress.on_progress(done, total, Some(path)) {
                    break;
                }
            }
            countdown -= 1;
            done += 1;
            if path.as_os_str().is_empty() {
                continue;
            }

            let committed = self
                .geo_writer
                .begin(path)
                .and_then(|mut session| {
                    session.set_lat_lon(latitude, longitude);
                    session.commit()
                });
            if let Err(error) = committed {
                self.hooks.on_exception("setGeo", path, &error);
                continue;
            }

            match self.sync.set_geo(path, latitude, longitude) {
                Ok(rows) => rows_updated += rows as i64,
                Err(error) => self.hooks.on_exception("setGeo", path, &error),
            }
            self.log_item(id, path, LogEntryKind::Gps, payload.clone());
        }

        progress.on_progress(done, total, None);
        self.logger.close();
        Ok(rows_updated)
    }
}
