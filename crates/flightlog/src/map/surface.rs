//! The map surface interface.
//!
//! A surface is the rendering backend: it draws the globe and the layered
//! geometry. Creation is asynchronous. `create` only starts the work and
//! returns a handle; the surface later reports readiness for that handle
//! through whatever event channel its owner wires up. Until then no layer
//! may be touched.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::geo::Coordinates;

/// Errors reported by a map surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The access token was missing or rejected by the provider.
    #[error("access token rejected")]
    Unauthorized,

    /// The container to render into does not exist.
    #[error("unknown container '{0}'")]
    UnknownContainer(String),

    /// The handle does not refer to a live surface.
    #[error("surface {0} is not live")]
    NotLive(SurfaceHandle),

    /// A layer was written before being added.
    #[error("unknown layer '{0}'")]
    UnknownLayer(String),

    /// A layer with this id already exists.
    #[error("layer '{0}' already exists")]
    DuplicateLayer(String),

    /// Anything else the backend reports.
    #[error("{0}")]
    Backend(String),
}

/// Opaque identifier of one created surface instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceHandle(pub u64);

impl fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How the globe is projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// 3D globe.
    #[default]
    Globe,
    /// Flat web mercator.
    Mercator,
}

/// Fixed parameters for creating a surface.
#[derive(Clone, PartialEq, Serialize)]
pub struct SurfaceOptions {
    /// Provider access token. Never logged.
    #[serde(skip_serializing)]
    pub access_token: String,
    /// Initial center.
    pub center: Coordinates,
    /// Initial zoom level.
    pub zoom: f64,
    /// Projection mode.
    pub projection: Projection,
    /// Whether to show zoom/rotate controls.
    pub navigation_control: bool,
}

impl fmt::Debug for SurfaceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceOptions")
            .field("access_token", &"<redacted>")
            .field("center", &self.center)
            .field("zoom", &self.zoom)
            .field("projection", &self.projection)
            .field("navigation_control", &self.navigation_control)
            .finish()
    }
}

/// Layer render type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Stroked lines.
    Line,
    /// Filled circles.
    Circle,
}

/// A layer definition: id, render type and paint settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSpec {
    /// Layer id, also the id of its data source.
    pub id: &'static str,
    /// Render type.
    pub kind: LayerKind,
    /// CSS color.
    pub color: &'static str,
    /// Line width or circle radius in pixels.
    pub size: f64,
    /// 0.0 to 1.0.
    pub opacity: f64,
}

/// Pointer events a layer can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionEvent {
    /// Feature clicked.
    Click,
    /// Pointer entered a feature.
    MouseEnter,
    /// Pointer left a feature.
    MouseLeave,
}

/// What the surface knows about a pointer event.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionContext {
    /// Layer the event fired on.
    pub layer_id: String,
    /// Event type.
    pub event: InteractionEvent,
    /// Pointer location.
    pub location: Coordinates,
    /// Topmost feature under the pointer, as GeoJSON.
    pub feature: Option<Value>,
}

/// Cursor styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// Platform default.
    Default,
    /// Pointing hand.
    Pointer,
}

/// What a handler asks the surface to do.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEffect {
    /// Open a popup.
    ShowPopup {
        /// Anchor location.
        at: Coordinates,
        /// Popup text, one entry per line.
        lines: Vec<String>,
    },
    /// Change the cursor.
    SetCursor(Cursor),
}

/// A registered pointer handler.
pub type InteractionHandler = Box<dyn Fn(&InteractionContext) -> Option<InteractionEffect>>;

/// A map rendering backend.
pub trait MapSurface {
    /// Start creating a surface in `container`.
    ///
    /// Returns the new handle immediately; readiness arrives later.
    ///
    /// # Errors
    ///
    /// Returns an error if creation cannot even start, e.g. a rejected token.
    fn create(
        &mut self,
        container: &str,
        options: &SurfaceOptions,
    ) -> Result<SurfaceHandle, SurfaceError>;

    /// Add an empty layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is not live or the layer exists.
    fn add_layer(&mut self, handle: SurfaceHandle, spec: &LayerSpec) -> Result<(), SurfaceError>;

    /// Replace a layer's data with a GeoJSON feature collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is not live or the layer is unknown.
    fn upsert_layer(
        &mut self,
        handle: SurfaceHandle,
        layer_id: &str,
        data: &Value,
    ) -> Result<(), SurfaceError>;

    /// Register a pointer handler on a layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is not live or the layer is unknown.
    fn add_interaction_handler(
        &mut self,
        handle: SurfaceHandle,
        layer_id: &str,
        event: InteractionEvent,
        handler: InteractionHandler,
    ) -> Result<(), SurfaceError>;

    /// Tear the surface down. Unknown or dead handles are ignored.
    fn destroy(&mut self, handle: SurfaceHandle);
}
