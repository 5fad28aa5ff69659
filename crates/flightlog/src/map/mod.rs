//! The route map.
//!
//! Flights are projected into two GeoJSON layers (route lines and airport
//! points) and pushed to a [`MapSurface`] by a [`MapSyncController`], which
//! buffers updates until the surface has finished loading.

pub mod controller;
pub mod geojson;
pub mod headless;
pub mod interaction;
pub mod projection;
pub mod runtime;
pub mod surface;

pub use controller::{MapSyncController, SyncState};
pub use geojson::{Feature, FeatureCollection, Geometry};
pub use headless::{HeadlessSurface, SurfaceCall};
pub use interaction::{AIRPORTS_LAYER, ROUTES_LAYER};
pub use projection::{project_airports, project_routes, AirportProperties, AirportRole, RouteProperties};
pub use runtime::{MapView, ViewEvent};
pub use surface::{
    Cursor, InteractionContext, InteractionEffect, InteractionEvent, LayerKind, LayerSpec,
    MapSurface, Projection, SurfaceError, SurfaceHandle, SurfaceOptions,
};
