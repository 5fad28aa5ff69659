//! Keeps a map surface's two layers in step with the latest flight snapshot.
//!
//! The surface becomes usable only some time after it is created, so the
//! controller is an explicit state machine:
//!
//! ```text
//! Uninitialized --mount(token)--> Initializing --ready(h)--> LayersPending --> Ready
//!       ^                                                                        |
//!       +------------------------- unmount / token change ----------------------+
//! ```
//!
//! Snapshots submitted before `Ready` go into a single pending slot; only the
//! newest survives. Reaching `Ready` applies it once.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace, warn};

use super::interaction::{self, AIRPORTS_LAYER, LAYERS, ROUTES_LAYER};
use super::projection::{project_airports, project_routes};
use super::surface::{MapSurface, SurfaceError, SurfaceHandle, SurfaceOptions};
use crate::flight::Flight;

/// Where the controller is in the surface lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// No surface.
    Uninitialized,
    /// Surface requested, waiting for its ready signal.
    Initializing,
    /// Ready signal received, registering layers and handlers.
    LayersPending,
    /// Layers registered; submits are applied immediately.
    Ready,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::LayersPending => "layers pending",
            Self::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// Owns one map surface and drives its layers from flight snapshots.
pub struct MapSyncController<S: MapSurface> {
    surface: S,
    container: String,
    options: SurfaceOptions,
    state: SyncState,
    handle: Option<SurfaceHandle>,
    layers_registered: bool,
    pending: Option<Vec<Flight>>,
    applied: Option<Applied>,
}

/// What the surface currently shows.
struct Applied {
    fingerprint: blake3::Hash,
    routes: Value,
}

impl<S: MapSurface> fmt::Debug for MapSyncController<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapSyncController")
            .field("container", &self.container)
            .field("state", &self.state)
            .field("handle", &self.handle)
            .field("layers_registered", &self.layers_registered)
            .field("pending", &self.pending.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

impl<S: MapSurface> MapSyncController<S> {
    /// A controller for `container`, not yet mounted.
    ///
    /// Any token in `options` is discarded; tokens are supplied through
    /// [`mount`](Self::mount) and [`on_token_change`](Self::on_token_change).
    pub fn new(surface: S, container: impl Into<String>, options: SurfaceOptions) -> Self {
        Self {
            surface,
            container: container.into(),
            options: SurfaceOptions {
                access_token: String::new(),
                ..options
            },
            state: SyncState::Uninitialized,
            handle: None,
            layers_registered: false,
            pending: None,
            applied: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Whether submits are applied immediately.
    pub fn is_ready(&self) -> bool {
        self.state == SyncState::Ready
    }

    /// The buffered snapshot, if one is waiting for `Ready`.
    pub fn pending(&self) -> Option<&[Flight]> {
        self.pending.as_deref()
    }

    /// The live surface handle, if creation succeeded.
    pub fn handle(&self) -> Option<SurfaceHandle> {
        self.handle
    }

    /// The surface backend.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// The surface backend, mutably.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Start a surface with `token`.
    ///
    /// A blank token leaves the controller unmounted. Mounting twice is
    /// ignored; use [`on_token_change`](Self::on_token_change) to restart.
    pub fn mount(&mut self, token: &str) {
        if self.state != SyncState::Uninitialized {
            debug!(state = %self.state, "Already mounted");
            return;
        }
        self.start(token);
    }

    /// Destroy the surface and drop all buffered state.
    pub fn unmount(&mut self) {
        self.teardown();
    }

    /// Tear down and start again with `token`.
    pub fn on_token_change(&mut self, token: &str) {
        debug!("Access token changed");
        self.teardown();
        self.start(token);
    }

    /// The surface reported `handle` ready.
    ///
    /// Registers both layers and every handler, then applies any buffered
    /// snapshot. Signals for a handle other than the live one are stale and
    /// dropped; a repeated signal for the live one is ignored.
    pub fn on_surface_ready(&mut self, handle: SurfaceHandle) {
        if self.handle != Some(handle) {
            debug!(%handle, live = ?self.handle, "Discarding stale ready signal");
            return;
        }
        if self.layers_registered {
            trace!(%handle, "Layers already registered");
            return;
        }
        self.layers_registered = true;
        self.transition(SyncState::LayersPending);

        if let Err(e) = self.register(handle) {
            warn!(%handle, error = %e, "Layer registration failed; map stays unavailable");
            return;
        }
        self.transition(SyncState::Ready);

        if let Some(flights) = self.pending.take() {
            self.apply(handle, &flights);
        }
    }

    /// Show `flights` on the map.
    ///
    /// Applied at once when `Ready`, otherwise kept as the pending snapshot
    /// in place of any older one. Never fails; write errors are logged.
    pub fn submit(&mut self, flights: Vec<Flight>) {
        match (self.state, self.handle) {
            (SyncState::Ready, Some(handle)) => self.apply(handle, &flights),
            _ => {
                trace!(state = %self.state, flights = flights.len(), "Buffering snapshot");
                self.pending = Some(flights);
            }
        }
    }

    fn start(&mut self, token: &str) {
        if token.trim().is_empty() {
            warn!("No map access token configured; map disabled");
            return;
        }

        let options = SurfaceOptions {
            access_token: token.to_string(),
            ..self.options.clone()
        };
        self.transition(SyncState::Initializing);

        match self.surface.create(&self.container, &options) {
            Ok(handle) => {
                debug!(%handle, container = %self.container, "Surface requested");
                self.handle = Some(handle);
            }
            // No retry; the controller waits in Initializing until torn down.
            Err(e) => warn!(error = %e, "Surface creation failed"),
        }
    }

    fn teardown(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.surface.destroy(handle);
            debug!(%handle, "Surface destroyed");
        }
        self.layers_registered = false;
        self.pending = None;
        self.applied = None;
        self.transition(SyncState::Uninitialized);
    }

    fn register(&mut self, handle: SurfaceHandle) -> Result<(), SurfaceError> {
        for spec in &LAYERS {
            self.surface.add_layer(handle, spec)?;
        }
        for (layer, event, handler) in interaction::handlers() {
            self.surface
                .add_interaction_handler(handle, layer, event, handler)?;
        }
        Ok(())
    }

    fn apply(&mut self, handle: SurfaceHandle, flights: &[Flight]) {
        let routes = serde_json::to_value(project_routes(flights));
        let airports = serde_json::to_value(project_airports(flights));
        let (routes, airports) = match (routes, airports) {
            (Ok(r), Ok(a)) => (r, a),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Could not serialize layer data");
                return;
            }
        };

        let fingerprint = fingerprint(&routes, &airports);
        if self.applied.as_ref().map(|a| a.fingerprint) == Some(fingerprint) {
            trace!(flights = flights.len(), "Snapshot unchanged");
            return;
        }

        let previous = self.applied.take();
        if let Err(e) = self.surface.upsert_layer(handle, ROUTES_LAYER, &routes) {
            warn!(%handle, layer = ROUTES_LAYER, error = %e, "Layer write failed");
            self.applied = previous;
            return;
        }
        if let Err(e) = self.surface.upsert_layer(handle, AIRPORTS_LAYER, &airports) {
            warn!(%handle, layer = AIRPORTS_LAYER, error = %e, "Layer write failed");
            self.restore_routes(handle, previous);
            return;
        }
        self.applied = Some(Applied {
            fingerprint,
            routes,
        });
        debug!(%handle, flights = flights.len(), "Layers updated");
    }

    /// Put the routes layer back in step with the airports layer after a
    /// half-applied snapshot.
    fn restore_routes(&mut self, handle: SurfaceHandle, previous: Option<Applied>) {
        let routes = match &previous {
            Some(applied) => Ok(applied.routes.clone()),
            None => serde_json::to_value(project_routes(&[])),
        };
        let restored = routes
            .map_err(|e| SurfaceError::Backend(e.to_string()))
            .and_then(|routes| self.surface.upsert_layer(handle, ROUTES_LAYER, &routes));
        match restored {
            Ok(()) => {
                debug!(%handle, "Routes layer rolled back");
                self.applied = previous;
            }
            Err(e) => warn!(%handle, error = %e, "Routes rollback failed"),
        }
    }

    fn transition(&mut self, next: SyncState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "Map sync state");
            self.state = next;
        }
    }
}

fn fingerprint(routes: &Value, airports: &Value) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(routes.to_string().as_bytes());
    hasher.update(&[0]);
    hasher.update(airports.to_string().as_bytes());
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::fixtures;
    use crate::geo::Coordinates;
    use crate::map::headless::{HeadlessSurface, SurfaceCall};
    use crate::map::surface::{Cursor, InteractionEffect, InteractionEvent, Projection};

    fn controller() -> MapSyncController<HeadlessSurface> {
        crate::logging::init_test_logging();
        let options = SurfaceOptions {
            access_token: String::new(),
            center: Coordinates::new(-30.0, 30.0),
            zoom: 1.5,
            projection: Projection::Globe,
            navigation_control: true,
        };
        MapSyncController::new(HeadlessSurface::new(), "map", options)
    }

    fn ready_controller() -> (MapSyncController<HeadlessSurface>, SurfaceHandle) {
        let mut c = controller();
        c.mount("pk.test");
        let handle = c.handle().unwrap();
        c.on_surface_ready(handle);
        assert!(c.is_ready());
        (c, handle)
    }

    fn two_flights() -> Vec<Flight> {
        vec![
            fixtures::flight("a", "JFK", "LHR", "2024-01-01"),
            fixtures::flight("b", "LHR", "CDG", "2024-02-01"),
        ]
    }

    fn counts(c: &MapSyncController<HeadlessSurface>, h: SurfaceHandle) -> (usize, usize) {
        (
            c.surface().feature_count(h, ROUTES_LAYER).unwrap(),
            c.surface().feature_count(h, AIRPORTS_LAYER).unwrap(),
        )
    }

    #[test]
    fn test_starts_uninitialized() {
        let c = controller();
        assert_eq!(c.state(), SyncState::Uninitialized);
        assert!(c.handle().is_none());
        assert!(c.pending().is_none());
    }

    #[test]
    fn test_mount_without_token_stays_uninitialized() {
        let mut c = controller();
        c.mount("");
        assert_eq!(c.state(), SyncState::Uninitialized);
        assert!(c.surface().calls().is_empty());
    }

    #[test]
    fn test_mount_passes_token_to_surface_only() {
        let mut c = controller();
        c.mount("pk.test");
        assert_eq!(c.state(), SyncState::Initializing);

        let handle = c.handle().unwrap();
        let (container, options) = c.surface().created_with(handle).unwrap();
        assert_eq!(container, "map");
        assert_eq!(options.access_token, "pk.test");
        assert_eq!(options.projection, Projection::Globe);
        assert!(c.options.access_token.is_empty());
    }

    #[test]
    fn test_submit_before_ready_never_writes() {
        let mut c = controller();
        c.submit(two_flights());
        c.mount("pk.test");
        c.submit(two_flights());

        assert_eq!(c.surface().write_count(), 0);
        assert_eq!(c.pending().map(<[Flight]>::len), Some(2));
    }

    #[test]
    fn test_buffered_snapshot_applied_once_on_ready() {
        let mut c = controller();
        c.mount("pk.test");
        c.submit(vec![fixtures::flight("x", "SFO", "HND", "2023-01-01")]);
        c.submit(two_flights());

        let handle = c.handle().unwrap();
        c.on_surface_ready(handle);

        assert!(c.is_ready());
        assert!(c.pending().is_none());
        assert_eq!(c.surface().write_count(), 2);
        assert_eq!(counts(&c, handle), (2, 3));

        // Nothing left to apply a second time.
        c.on_surface_ready(handle);
        assert_eq!(c.surface().write_count(), 2);
    }

    #[test]
    fn test_ready_registers_layers_and_handlers_once() {
        let (mut c, handle) = ready_controller();
        assert_eq!(c.surface().layer_ids(handle), vec![AIRPORTS_LAYER, ROUTES_LAYER]);
        assert_eq!(c.surface().handler_count(handle), 6);

        c.on_surface_ready(handle);
        let adds = c
            .surface()
            .calls()
            .iter()
            .filter(|call| matches!(call, SurfaceCall::AddLayer(..)))
            .count();
        assert_eq!(adds, 2);
        assert_eq!(c.surface().handler_count(handle), 6);
    }

    #[test]
    fn test_ready_without_pending_leaves_layers_empty() {
        let (c, handle) = ready_controller();
        assert_eq!(c.surface().write_count(), 0);
        assert!(c.surface().layer_data(handle, ROUTES_LAYER).is_none());
    }

    #[test]
    fn test_submit_when_ready_writes_both_layers() {
        let (mut c, handle) = ready_controller();
        c.submit(two_flights());
        assert_eq!(counts(&c, handle), (2, 3));
    }

    #[test]
    fn test_submit_empty_clears_both_layers() {
        let (mut c, handle) = ready_controller();
        c.submit(two_flights());
        c.submit(Vec::new());

        assert_eq!(counts(&c, handle), (0, 0));
        let routes = c.surface().layer_data(handle, ROUTES_LAYER).unwrap();
        assert_eq!(routes["type"], "FeatureCollection");
    }

    #[test]
    fn test_identical_resubmit_is_noop() {
        let (mut c, _) = ready_controller();
        c.submit(two_flights());
        c.submit(two_flights());
        assert_eq!(c.surface().write_count(), 2);

        c.submit(vec![fixtures::flight("a", "JFK", "LHR", "2024-01-01")]);
        assert_eq!(c.surface().write_count(), 4);
    }

    #[test]
    fn test_failed_write_is_retried_on_next_submit() {
        let (mut c, handle) = ready_controller();
        c.surface_mut().set_fail_writes(true);
        c.submit(two_flights());
        assert!(c.is_ready());
        assert_eq!(c.surface().write_count(), 0);

        c.surface_mut().set_fail_writes(false);
        c.submit(two_flights());
        assert_eq!(counts(&c, handle), (2, 3));
    }

    #[test]
    fn test_half_failed_write_rolls_routes_back() {
        let (mut c, handle) = ready_controller();
        let one = vec![fixtures::flight("a", "JFK", "LHR", "2024-01-01")];
        c.submit(one.clone());
        assert_eq!(counts(&c, handle), (1, 2));

        c.surface_mut().set_fail_layer(Some(AIRPORTS_LAYER));
        c.submit(two_flights());
        assert_eq!(counts(&c, handle), (1, 2));
        assert_eq!(
            c.surface().layer_data(handle, ROUTES_LAYER),
            Some(&serde_json::to_value(project_routes(&one)).unwrap())
        );

        // Still showing `one`, so resubmitting it writes nothing.
        c.surface_mut().set_fail_layer(None);
        c.surface_mut().clear_calls();
        c.submit(one);
        assert_eq!(c.surface().write_count(), 0);

        c.submit(two_flights());
        assert_eq!(counts(&c, handle), (2, 3));
    }

    #[test]
    fn test_half_failed_first_write_leaves_layers_empty() {
        let (mut c, handle) = ready_controller();
        c.surface_mut().set_fail_layer(Some(AIRPORTS_LAYER));
        c.submit(two_flights());
        assert_eq!(c.surface().feature_count(handle, ROUTES_LAYER), Some(0));
        assert!(c.surface().layer_data(handle, AIRPORTS_LAYER).is_none());

        c.surface_mut().set_fail_layer(None);
        c.submit(two_flights());
        assert_eq!(counts(&c, handle), (2, 3));
    }

    #[test]
    fn test_token_change_while_ready_tears_down() {
        let (mut c, old) = ready_controller();
        c.submit(two_flights());
        c.surface_mut().clear_calls();

        c.on_token_change("pk.other");
        assert_eq!(c.state(), SyncState::Initializing);
        assert!(!c.surface().is_live(old));
        let new = c.handle().unwrap();
        assert_ne!(new, old);

        c.submit(vec![fixtures::flight("c", "SFO", "HND", "2024-03-01")]);
        assert_eq!(c.pending().map(<[Flight]>::len), Some(1));
        assert!(c
            .surface()
            .calls()
            .iter()
            .all(|call| !matches!(call, SurfaceCall::Upsert(h, _) if *h == old)));

        c.on_surface_ready(new);
        assert_eq!(counts(&c, new), (1, 2));
    }

    #[test]
    fn test_stale_ready_is_discarded() {
        let mut c = controller();
        c.mount("pk.test");
        let old = c.handle().unwrap();
        c.on_token_change("pk.other");
        c.submit(two_flights());

        c.on_surface_ready(old);
        assert_eq!(c.state(), SyncState::Initializing);
        assert_eq!(c.surface().layer_ids(old), Vec::<&str>::new());
        assert!(c.pending().is_some());
    }

    #[test]
    fn test_ready_after_unmount_is_discarded() {
        let mut c = controller();
        c.mount("pk.test");
        let handle = c.handle().unwrap();
        c.submit(two_flights());
        c.unmount();

        assert_eq!(c.state(), SyncState::Uninitialized);
        assert!(c.pending().is_none());
        c.on_surface_ready(handle);
        assert_eq!(c.state(), SyncState::Uninitialized);
        assert_eq!(c.surface().write_count(), 0);
    }

    #[test]
    fn test_token_change_to_blank_unmounts() {
        let (mut c, handle) = ready_controller();
        c.on_token_change(" ");
        assert_eq!(c.state(), SyncState::Uninitialized);
        assert!(!c.surface().is_live(handle));
    }

    #[test]
    fn test_mount_twice_keeps_surface() {
        let mut c = controller();
        c.mount("pk.test");
        let handle = c.handle();
        c.mount("pk.test");
        assert_eq!(c.handle(), handle);
    }

    #[test]
    fn test_create_failure_keeps_buffering() {
        let mut c = MapSyncController::new(HeadlessSurface::new(), "", controller().options);
        c.mount("pk.test");
        assert_eq!(c.state(), SyncState::Initializing);
        assert!(c.handle().is_none());

        c.submit(two_flights());
        assert!(c.pending().is_some());
        c.on_surface_ready(SurfaceHandle(1));
        assert_eq!(c.state(), SyncState::Initializing);
        assert_eq!(c.surface().write_count(), 0);
    }

    #[test]
    fn test_handlers_produce_popups_and_cursors() {
        let (mut c, handle) = ready_controller();
        c.submit(two_flights());
        let at = Coordinates::new(1.0, 51.0);

        let popup = c
            .surface()
            .dispatch(handle, ROUTES_LAYER, InteractionEvent::Click, at, 1)
            .unwrap();
        assert!(matches!(
            &popup[..],
            [InteractionEffect::ShowPopup { lines, .. }] if lines[0] == "LHR → CDG"
        ));

        let cursor = c
            .surface()
            .dispatch(handle, AIRPORTS_LAYER, InteractionEvent::MouseEnter, at, 0)
            .unwrap();
        assert_eq!(cursor, vec![InteractionEffect::SetCursor(Cursor::Pointer)]);
    }
}
