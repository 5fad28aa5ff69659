//! An in-process map surface.
//!
//! `HeadlessSurface` draws nothing. It keeps each surface's layers, their
//! latest data and the registered handlers, and logs every call it receives.
//! The `render` command uses it to produce the layer GeoJSON, and tests use
//! it to observe exactly what the controller writes and when.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};

use super::runtime::ViewEvent;
use super::surface::{
    InteractionContext, InteractionEffect, InteractionEvent, InteractionHandler, LayerSpec,
    MapSurface, SurfaceError, SurfaceHandle, SurfaceOptions,
};
use crate::geo::Coordinates;

/// One call received by a [`HeadlessSurface`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    /// `create` succeeded.
    Create(SurfaceHandle),
    /// `add_layer`.
    AddLayer(SurfaceHandle, String),
    /// `upsert_layer`.
    Upsert(SurfaceHandle, String),
    /// `add_interaction_handler`.
    AddHandler(SurfaceHandle, String, InteractionEvent),
    /// `destroy`.
    Destroy(SurfaceHandle),
}

struct Layer {
    spec: LayerSpec,
    data: Option<Value>,
}

struct LiveSurface {
    container: String,
    options: SurfaceOptions,
    layers: BTreeMap<String, Layer>,
    handlers: Vec<(String, InteractionEvent, InteractionHandler)>,
}

/// A map surface that records instead of rendering.
#[derive(Default)]
pub struct HeadlessSurface {
    next_handle: u64,
    live: BTreeMap<SurfaceHandle, LiveSurface>,
    calls: Vec<SurfaceCall>,
    ready_tx: Option<UnboundedSender<ViewEvent>>,
    fail_writes: bool,
    fail_layer: Option<String>,
}

impl fmt::Debug for HeadlessSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessSurface")
            .field("live", &self.live.keys().collect::<Vec<_>>())
            .field("calls", &self.calls.len())
            .field("posts_ready", &self.ready_tx.is_some())
            .finish_non_exhaustive()
    }
}

impl HeadlessSurface {
    /// A surface that never reports readiness by itself.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Post [`ViewEvent::SurfaceReady`] to `tx` after every successful create.
    #[must_use]
    pub fn with_ready_sender(mut self, tx: UnboundedSender<ViewEvent>) -> Self {
        self.ready_tx = Some(tx);
        self
    }

    /// Make every `upsert_layer` fail with a backend error.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Make `upsert_layer` fail for `layer_id` only; `None` lifts it.
    pub fn set_fail_layer(&mut self, layer_id: Option<&str>) {
        self.fail_layer = layer_id.map(str::to_string);
    }

    /// Every call received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    /// Forget the call log.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of `upsert_layer` calls in the log.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, SurfaceCall::Upsert(..)))
            .count()
    }

    /// Whether `handle` is created and not yet destroyed.
    #[must_use]
    pub fn is_live(&self, handle: SurfaceHandle) -> bool {
        self.live.contains_key(&handle)
    }

    /// The most recently created live handle.
    #[must_use]
    pub fn latest_handle(&self) -> Option<SurfaceHandle> {
        self.live.keys().next_back().copied()
    }

    /// Container and options a live surface was created with.
    #[must_use]
    pub fn created_with(&self, handle: SurfaceHandle) -> Option<(&str, &SurfaceOptions)> {
        self.live
            .get(&handle)
            .map(|s| (s.container.as_str(), &s.options))
    }

    /// Ids of the layers on a live surface, in id order.
    #[must_use]
    pub fn layer_ids(&self, handle: SurfaceHandle) -> Vec<&str> {
        self.live
            .get(&handle)
            .map(|s| s.layers.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Definition of a layer.
    #[must_use]
    pub fn layer_spec(&self, handle: SurfaceHandle, layer_id: &str) -> Option<&LayerSpec> {
        self.live
            .get(&handle)?
            .layers
            .get(layer_id)
            .map(|l| &l.spec)
    }

    /// Latest data written to a layer, `None` if never written.
    #[must_use]
    pub fn layer_data(&self, handle: SurfaceHandle, layer_id: &str) -> Option<&Value> {
        self.live
            .get(&handle)?
            .layers
            .get(layer_id)?
            .data
            .as_ref()
    }

    /// Number of features in a layer's latest data.
    #[must_use]
    pub fn feature_count(&self, handle: SurfaceHandle, layer_id: &str) -> Option<usize> {
        self.layer_data(handle, layer_id)?
            .get("features")?
            .as_array()
            .map(Vec::len)
    }

    /// Number of handlers registered on a live surface.
    #[must_use]
    pub fn handler_count(&self, handle: SurfaceHandle) -> usize {
        self.live.get(&handle).map_or(0, |s| s.handlers.len())
    }

    /// Fire a pointer event at feature `index` of a layer and collect the
    /// effects of every matching handler.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is not live or the layer is unknown.
    pub fn dispatch(
        &self,
        handle: SurfaceHandle,
        layer_id: &str,
        event: InteractionEvent,
        location: Coordinates,
        index: usize,
    ) -> Result<Vec<InteractionEffect>, SurfaceError> {
        let surface = self.live.get(&handle).ok_or(SurfaceError::NotLive(handle))?;
        let layer = surface
            .layers
            .get(layer_id)
            .ok_or_else(|| SurfaceError::UnknownLayer(layer_id.to_string()))?;

        let ctx = InteractionContext {
            layer_id: layer_id.to_string(),
            event,
            location,
            feature: layer
                .data
                .as_ref()
                .and_then(|d| d.get("features"))
                .and_then(|f| f.get(index))
                .cloned(),
        };

        Ok(surface
            .handlers
            .iter()
            .filter(|(l, e, _)| l == layer_id && *e == event)
            .filter_map(|(_, _, handler)| handler(&ctx))
            .collect())
    }

    fn live_mut(&mut self, handle: SurfaceHandle) -> Result<&mut LiveSurface, SurfaceError> {
        self.live.get_mut(&handle).ok_or(SurfaceError::NotLive(handle))
    }
}

impl MapSurface for HeadlessSurface {
    fn create(
        &mut self,
        container: &str,
        options: &SurfaceOptions,
    ) -> Result<SurfaceHandle, SurfaceError> {
        if options.access_token.trim().is_empty() {
            return Err(SurfaceError::Unauthorized);
        }
        if container.trim().is_empty() {
            return Err(SurfaceError::UnknownContainer(container.to_string()));
        }

        self.next_handle += 1;
        let handle = SurfaceHandle(self.next_handle);
        self.live.insert(
            handle,
            LiveSurface {
                container: container.to_string(),
                options: options.clone(),
                layers: BTreeMap::new(),
                handlers: Vec::new(),
            },
        );
        self.calls.push(SurfaceCall::Create(handle));
        debug!(%handle, container, "Headless surface created");

        if let Some(tx) = &self.ready_tx {
            if tx.send(ViewEvent::SurfaceReady(handle)).is_err() {
                debug!(%handle, "No receiver for surface ready");
            }
        }
        Ok(handle)
    }

    fn add_layer(&mut self, handle: SurfaceHandle, spec: &LayerSpec) -> Result<(), SurfaceError> {
        let surface = self.live_mut(handle)?;
        if surface.layers.contains_key(spec.id) {
            return Err(SurfaceError::DuplicateLayer(spec.id.to_string()));
        }
        surface.layers.insert(
            spec.id.to_string(),
            Layer {
                spec: spec.clone(),
                data: None,
            },
        );
        self.calls
            .push(SurfaceCall::AddLayer(handle, spec.id.to_string()));
        Ok(())
    }

    fn upsert_layer(
        &mut self,
        handle: SurfaceHandle,
        layer_id: &str,
        data: &Value,
    ) -> Result<(), SurfaceError> {
        let fail = self.fail_writes || self.fail_layer.as_deref() == Some(layer_id);
        let layer = self
            .live_mut(handle)?
            .layers
            .get_mut(layer_id)
            .ok_or_else(|| SurfaceError::UnknownLayer(layer_id.to_string()))?;
        if fail {
            return Err(SurfaceError::Backend("write rejected".to_string()));
        }

        layer.data = Some(data.clone());
        self.calls
            .push(SurfaceCall::Upsert(handle, layer_id.to_string()));
        trace!(%handle, layer_id, "Layer data replaced");
        Ok(())
    }

    fn add_interaction_handler(
        &mut self,
        handle: SurfaceHandle,
        layer_id: &str,
        event: InteractionEvent,
        handler: InteractionHandler,
    ) -> Result<(), SurfaceError> {
        let surface = self.live_mut(handle)?;
        if !surface.layers.contains_key(layer_id) {
            return Err(SurfaceError::UnknownLayer(layer_id.to_string()));
        }
        surface
            .handlers
            .push((layer_id.to_string(), event, handler));
        self.calls
            .push(SurfaceCall::AddHandler(handle, layer_id.to_string(), event));
        Ok(())
    }

    fn destroy(&mut self, handle: SurfaceHandle) {
        if self.live.remove(&handle).is_some() {
            self.calls.push(SurfaceCall::Destroy(handle));
            debug!(%handle, "Headless surface destroyed");
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::sync::mpsc;

    use super::*;
    use crate::map::interaction::{
        AIRPORTS_LAYER, AIRPORTS_LAYER_SPEC, ROUTES_LAYER, ROUTES_LAYER_SPEC,
    };
    use crate::map::surface::{Cursor, Projection};

    fn options(token: &str) -> SurfaceOptions {
        SurfaceOptions {
            access_token: token.to_string(),
            center: Coordinates::new(-30.0, 30.0),
            zoom: 1.5,
            projection: Projection::Globe,
            navigation_control: true,
        }
    }

    #[test]
    fn test_create_rejects_blank_token() {
        let mut surface = HeadlessSurface::new();
        assert_eq!(
            surface.create("map", &options("  ")),
            Err(SurfaceError::Unauthorized)
        );
        assert!(surface.calls().is_empty());
    }

    #[test]
    fn test_create_rejects_blank_container() {
        let mut surface = HeadlessSurface::new();
        assert!(matches!(
            surface.create("", &options("pk.test")),
            Err(SurfaceError::UnknownContainer(_))
        ));
    }

    #[test]
    fn test_handles_are_distinct() {
        let mut surface = HeadlessSurface::new();
        let a = surface.create("map", &options("pk.test")).unwrap();
        let b = surface.create("map", &options("pk.test")).unwrap();
        assert_ne!(a, b);
        assert_eq!(surface.latest_handle(), Some(b));
        assert_eq!(surface.created_with(a).unwrap().0, "map");
    }

    #[test]
    fn test_create_posts_ready() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut surface = HeadlessSurface::new().with_ready_sender(tx);
        let handle = surface.create("map", &options("pk.test")).unwrap();
        assert_eq!(rx.try_recv().unwrap(), ViewEvent::SurfaceReady(handle));
    }

    #[test]
    fn test_layers_and_writes() {
        let mut surface = HeadlessSurface::new();
        let handle = surface.create("map", &options("pk.test")).unwrap();

        assert_eq!(
            surface.upsert_layer(handle, ROUTES_LAYER, &json!({})),
            Err(SurfaceError::UnknownLayer(ROUTES_LAYER.to_string()))
        );

        surface.add_layer(handle, &ROUTES_LAYER_SPEC).unwrap();
        surface.add_layer(handle, &AIRPORTS_LAYER_SPEC).unwrap();
        assert!(matches!(
            surface.add_layer(handle, &ROUTES_LAYER_SPEC),
            Err(SurfaceError::DuplicateLayer(_))
        ));
        assert_eq!(surface.layer_ids(handle), vec!["airports", "routes"]);
        assert!(surface.layer_data(handle, ROUTES_LAYER).is_none());

        let data = json!({ "type": "FeatureCollection", "features": [] });
        surface.upsert_layer(handle, ROUTES_LAYER, &data).unwrap();
        assert_eq!(surface.layer_data(handle, ROUTES_LAYER), Some(&data));
        assert_eq!(surface.feature_count(handle, ROUTES_LAYER), Some(0));
        assert_eq!(surface.write_count(), 1);
    }

    #[test]
    fn test_destroyed_handle_is_not_live() {
        let mut surface = HeadlessSurface::new();
        let handle = surface.create("map", &options("pk.test")).unwrap();
        surface.destroy(handle);
        surface.destroy(handle);

        assert!(!surface.is_live(handle));
        assert_eq!(
            surface.add_layer(handle, &ROUTES_LAYER_SPEC),
            Err(SurfaceError::NotLive(handle))
        );
        let destroys = surface
            .calls()
            .iter()
            .filter(|c| matches!(c, SurfaceCall::Destroy(_)))
            .count();
        assert_eq!(destroys, 1);
    }

    #[test]
    fn test_failing_writes() {
        let mut surface = HeadlessSurface::new();
        let handle = surface.create("map", &options("pk.test")).unwrap();
        surface.add_layer(handle, &ROUTES_LAYER_SPEC).unwrap();
        surface.set_fail_writes(true);

        assert!(matches!(
            surface.upsert_layer(handle, ROUTES_LAYER, &json!({})),
            Err(SurfaceError::Backend(_))
        ));
        assert_eq!(surface.write_count(), 0);
    }

    #[test]
    fn test_failing_single_layer() {
        let mut surface = HeadlessSurface::new();
        let handle = surface.create("map", &options("pk.test")).unwrap();
        surface.add_layer(handle, &ROUTES_LAYER_SPEC).unwrap();
        surface.add_layer(handle, &AIRPORTS_LAYER_SPEC).unwrap();
        surface.set_fail_layer(Some(AIRPORTS_LAYER));

        surface.upsert_layer(handle, ROUTES_LAYER, &json!({})).unwrap();
        assert!(surface
            .upsert_layer(handle, AIRPORTS_LAYER, &json!({}))
            .is_err());

        surface.set_fail_layer(None);
        surface.upsert_layer(handle, AIRPORTS_LAYER, &json!({})).unwrap();
        assert_eq!(surface.write_count(), 2);
    }

    #[test]
    fn test_dispatch_runs_matching_handlers() {
        let mut surface = HeadlessSurface::new();
        let handle = surface.create("map", &options("pk.test")).unwrap();
        surface.add_layer(handle, &ROUTES_LAYER_SPEC).unwrap();
        surface
            .add_interaction_handler(
                handle,
                ROUTES_LAYER,
                InteractionEvent::MouseEnter,
                Box::new(|_| Some(InteractionEffect::SetCursor(Cursor::Pointer))),
            )
            .unwrap();
        assert_eq!(surface.handler_count(handle), 1);

        let at = Coordinates::new(0.0, 0.0);
        let effects = surface
            .dispatch(handle, ROUTES_LAYER, InteractionEvent::MouseEnter, at, 0)
            .unwrap();
        assert_eq!(effects, vec![InteractionEffect::SetCursor(Cursor::Pointer)]);

        let none = surface
            .dispatch(handle, ROUTES_LAYER, InteractionEvent::Click, at, 0)
            .unwrap();
        assert!(none.is_empty());
    }
}
