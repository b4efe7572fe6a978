//! On-screen target resolution and input injection.
//!
//! The locator turns display names into screen regions; the input surface
//! injects clicks and keystrokes. Both are traits so the executor can be
//! tested against deterministic implementations, and so a capture backend
//! can be swapped in without touching the execution loop.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use marionette_core::config::LocatorConfig;
use tracing::{debug, info};

use crate::error::{ExecuteError, LocateError};

/// A rectangle on the target window, with the recognizer's confidence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UiRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub confidence: f64,
}

impl UiRegion {
    pub fn center(&self) -> (i32, i32) {
        (
            self.x + self.width as i32 / 2,
            self.y + self.height as i32 / 2,
        )
    }

    /// Whether two regions sit close enough to be fragments of the same
    /// label.
    fn adjoins(&self, other: &UiRegion, tolerance: i32) -> bool {
        let vertical = (self.y - other.y).abs() <= tolerance;
        let gap = other.x - (self.x + self.width as i32);
        vertical && gap.abs() <= tolerance
    }

    fn union(&self, other: &UiRegion) -> UiRegion {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width as i32).max(other.x + other.width as i32);
        let bottom = (self.y + self.height as i32).max(other.y + other.height as i32);
        UiRegion {
            x,
            y,
            width: (right - x) as u32,
            height: (bottom - y) as u32,
            confidence: self.confidence.min(other.confidence),
        }
    }
}

/// Merge word-level recognition boxes into label-level regions.
///
/// Boxes must be in left-to-right order. A box extends the current run
/// when it adjoins the run's bounding region within `tolerance` pixels.
pub fn merge_regions(boxes: &[UiRegion], tolerance: i32) -> Vec<UiRegion> {
    let mut merged: Vec<UiRegion> = Vec::new();
    for region in boxes {
        match merged.last_mut() {
            Some(last) if last.adjoins(region, tolerance) => *last = last.union(region),
            _ => merged.push(*region),
        }
    }
    merged
}

/// What the executor asks the locator to find.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetSpec {
    pub name: String,
    pub is_chatroom: bool,
}

impl TargetSpec {
    pub fn new(name: impl Into<String>, is_chatroom: bool) -> Self {
        Self {
            name: name.into(),
            is_chatroom,
        }
    }
}

/// Resolves display names and fixed anchors to screen regions.
#[async_trait]
pub trait UiLocator: Send + Sync {
    /// Find a conversation entry by display name.
    async fn locate(&self, spec: &TargetSpec) -> Result<UiRegion, LocateError>;

    /// Find a fixed UI anchor, such as the conversation-list header. Used
    /// as the liveness probe during recovery.
    async fn locate_anchor(&self, anchor: &str) -> Result<UiRegion, LocateError>;
}

/// Injects input into the target window.
#[async_trait]
pub trait InputSurface: Send + Sync {
    async fn click(&self, region: &UiRegion) -> Result<(), ExecuteError>;
    async fn type_text(&self, text: &str) -> Result<(), ExecuteError>;
    async fn hotkey(&self, keys: &[&str]) -> Result<(), ExecuteError>;
    async fn scroll(&self, region: &UiRegion, lines: i32) -> Result<(), ExecuteError>;

    /// Bring the target window to the foreground.
    async fn refocus(&self) -> Result<(), ExecuteError>;

    /// Capture a re-authentication artifact, if the target is showing a
    /// login prompt. Returned as a URL the operator can open.
    async fn capture_login_artifact(&self) -> Result<Option<String>, ExecuteError>;
}

/// A locator over the conversation sidebar.
///
/// Entries are registered up front as the word boxes a recognizer would
/// produce for each row. `locate` merges the boxes and applies the
/// configured confidence threshold.
pub struct SidebarLocator {
    entries: Mutex<HashMap<String, Vec<UiRegion>>>,
    anchor: String,
    confidence_threshold: f64,
    merge_tolerance: i32,
}

impl SidebarLocator {
    pub fn new(config: &LocatorConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            anchor: config.anchor.clone(),
            confidence_threshold: config.confidence_threshold,
            merge_tolerance: config.merge_tolerance as i32,
        }
    }

    /// Register the recognition boxes for one sidebar row.
    pub fn register(&self, name: impl Into<String>, boxes: Vec<UiRegion>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(name.into(), boxes);
        }
    }

    /// Register a row as a single fully-confident box at the given index.
    pub fn register_row(&self, name: impl Into<String>, index: usize) {
        self.register(
            name,
            vec![UiRegion {
                x: 8,
                y: 64 + (index as i32) * 72,
                width: 240,
                height: 64,
                confidence: 1.0,
            }],
        );
    }

    fn resolve(&self, name: &str) -> Result<UiRegion, LocateError> {
        let boxes = {
            let entries = self
                .entries
                .lock()
                .map_err(|_| LocateError::Capture("sidebar state poisoned".to_string()))?;
            entries
                .get(name)
                .cloned()
                .ok_or_else(|| LocateError::NotFound(name.to_string()))?
        };
        let merged = merge_regions(&boxes, self.merge_tolerance);
        let best = merged
            .into_iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .ok_or_else(|| LocateError::NotFound(name.to_string()))?;
        if best.confidence < self.confidence_threshold {
            return Err(LocateError::LowConfidence {
                name: name.to_string(),
                confidence: best.confidence,
                threshold: self.confidence_threshold,
            });
        }
        Ok(best)
    }
}

#[async_trait]
impl UiLocator for SidebarLocator {
    async fn locate(&self, spec: &TargetSpec) -> Result<UiRegion, LocateError> {
        let region = self.resolve(&spec.name)?;
        debug!(target = %spec.name, x = region.x, y = region.y, "Located conversation");
        Ok(region)
    }

    async fn locate_anchor(&self, anchor: &str) -> Result<UiRegion, LocateError> {
        if anchor == self.anchor {
            Ok(UiRegion {
                x: 8,
                y: 16,
                width: 120,
                height: 32,
                confidence: 1.0,
            })
        } else {
            self.resolve(anchor)
        }
    }
}

/// An input surface that logs every injection instead of performing it.
/// Used when running without a real window attached.
#[derive(Default)]
pub struct LoggingSurface;

#[async_trait]
impl InputSurface for LoggingSurface {
    async fn click(&self, region: &UiRegion) -> Result<(), ExecuteError> {
        let (x, y) = region.center();
        info!(x, y, "click");
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), ExecuteError> {
        info!(chars = text.chars().count(), "type_text");
        Ok(())
    }

    async fn hotkey(&self, keys: &[&str]) -> Result<(), ExecuteError> {
        info!(keys = keys.join("+"), "hotkey");
        Ok(())
    }

    async fn scroll(&self, region: &UiRegion, lines: i32) -> Result<(), ExecuteError> {
        let (x, y) = region.center();
        info!(x, y, lines, "scroll");
        Ok(())
    }

    async fn refocus(&self) -> Result<(), ExecuteError> {
        info!("refocus");
        Ok(())
    }

    async fn capture_login_artifact(&self) -> Result<Option<String>, ExecuteError> {
        Ok(None)
    }
}
