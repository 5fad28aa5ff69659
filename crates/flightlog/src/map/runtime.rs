//! Event loop around a [`MapSyncController`].
//!
//! Everything that can happen to the map arrives as a [`ViewEvent`] on one
//! unbounded channel and is handled in order on a single task. Surfaces post
//! their ready signal to the same channel, so readiness is always a separate,
//! later event.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use super::controller::MapSyncController;
use super::surface::{MapSurface, SurfaceHandle};
use crate::error::{Error, Result};
use crate::flight::Flight;

/// Something that happened to the map view.
#[derive(Clone, PartialEq)]
pub enum ViewEvent {
    /// View shown with this access token.
    Mount(String),
    /// New flight snapshot.
    Submit(Vec<Flight>),
    /// Access token replaced.
    TokenChanged(String),
    /// Surface finished loading.
    SurfaceReady(SurfaceHandle),
    /// View removed.
    Unmount,
}

impl fmt::Debug for ViewEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mount(_) => f.write_str("Mount(<token>)"),
            Self::Submit(flights) => write!(f, "Submit({} flights)", flights.len()),
            Self::TokenChanged(_) => f.write_str("TokenChanged(<token>)"),
            Self::SurfaceReady(handle) => write!(f, "SurfaceReady({handle})"),
            Self::Unmount => f.write_str("Unmount"),
        }
    }
}

/// A map view: a controller plus the channel that feeds it.
pub struct MapView<S: MapSurface> {
    controller: MapSyncController<S>,
    tx: UnboundedSender<ViewEvent>,
    rx: UnboundedReceiver<ViewEvent>,
    latest: Option<Vec<Flight>>,
}

impl<S: MapSurface> fmt::Debug for MapView<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapView")
            .field("controller", &self.controller)
            .field("latest", &self.latest.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

/// A fresh event channel for a [`MapView`].
#[must_use]
pub fn channel() -> (UnboundedSender<ViewEvent>, UnboundedReceiver<ViewEvent>) {
    mpsc::unbounded_channel()
}

impl<S: MapSurface> MapView<S> {
    /// A view over `controller`, fed by `rx`.
    ///
    /// `tx` must be the sending half of the same channel; the surface inside
    /// `controller` may hold another clone of it.
    pub fn new(
        controller: MapSyncController<S>,
        tx: UnboundedSender<ViewEvent>,
        rx: UnboundedReceiver<ViewEvent>,
    ) -> Self {
        Self {
            controller,
            tx,
            rx,
            latest: None,
        }
    }

    /// A sender for posting events to this view.
    pub fn sender(&self) -> UnboundedSender<ViewEvent> {
        self.tx.clone()
    }

    /// The controller.
    pub fn controller(&self) -> &MapSyncController<S> {
        &self.controller
    }

    /// The controller, mutably.
    pub fn controller_mut(&mut self) -> &mut MapSyncController<S> {
        &mut self.controller
    }

    /// Queue an event.
    pub fn post(&self, event: ViewEvent) {
        if let Err(e) = self.tx.send(event) {
            debug!(event = ?e.0, "View channel closed, dropping event");
        }
    }

    /// Apply one event.
    ///
    /// The most recent snapshot is remembered and handed to every new
    /// surface, so remounting or changing the token redraws the same flights.
    pub fn handle_event(&mut self, event: ViewEvent) {
        debug!(?event, "Map view event");
        match event {
            ViewEvent::Mount(token) => {
                self.controller.mount(&token);
                self.resubmit();
            }
            ViewEvent::TokenChanged(token) => {
                self.controller.on_token_change(&token);
                self.resubmit();
            }
            ViewEvent::Submit(flights) => {
                self.latest = Some(flights.clone());
                self.controller.submit(flights);
            }
            ViewEvent::SurfaceReady(handle) => self.controller.on_surface_ready(handle),
            ViewEvent::Unmount => self.controller.unmount(),
        }
    }

    /// Apply every event already queued without waiting. Returns how many
    /// were handled.
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Wait for the next event and apply it.
    pub async fn next_event(&mut self) -> bool {
        match self.rx.recv().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Handle events until the controller is ready.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SurfaceNotReady`] if `timeout` passes first.
    pub async fn run_until_ready(&mut self, timeout: Duration) -> Result<()> {
        if self.controller.is_ready() {
            return Ok(());
        }

        let wait = async {
            while self.next_event().await {
                if self.controller.is_ready() {
                    return true;
                }
            }
            false
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(true) => Ok(()),
            Ok(false) | Err(_) => {
                warn!(
                    timeout_ms = timeout.as_millis(),
                    state = %self.controller.state(),
                    "Map not ready"
                );
                Err(Error::SurfaceNotReady { timeout })
            }
        }
    }

    /// Consume the view and return its controller.
    pub fn into_controller(self) -> MapSyncController<S> {
        self.controller
    }

    fn resubmit(&mut self) {
        if let Some(flights) = &self.latest {
            self.controller.submit(flights.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::fixtures;
    use crate::geo::Coordinates;
    use crate::map::controller::SyncState;
    use crate::map::headless::HeadlessSurface;
    use crate::map::interaction::{AIRPORTS_LAYER, ROUTES_LAYER};
    use crate::map::surface::{Projection, SurfaceOptions};

    fn view(posts_ready: bool) -> MapView<HeadlessSurface> {
        let (tx, rx) = channel();
        let surface = if posts_ready {
            HeadlessSurface::new().with_ready_sender(tx.clone())
        } else {
            HeadlessSurface::new()
        };
        let options = SurfaceOptions {
            access_token: String::new(),
            center: Coordinates::new(-30.0, 30.0),
            zoom: 1.5,
            projection: Projection::Globe,
            navigation_control: true,
        };
        MapView::new(MapSyncController::new(surface, "map", options), tx, rx)
    }

    fn flights() -> Vec<Flight> {
        vec![
            fixtures::flight("a", "JFK", "LHR", "2024-01-01"),
            fixtures::flight("b", "LHR", "CDG", "2024-02-01"),
        ]
    }

    #[tokio::test]
    async fn test_ready_arrives_as_later_event() {
        let mut view = view(true);
        view.post(ViewEvent::Mount("pk.test".to_string()));
        view.post(ViewEvent::Submit(flights()));

        // Mount, then Submit; the ready signal is queued behind both.
        assert!(view.next_event().await);
        assert!(view.next_event().await);
        assert!(!view.controller().is_ready());
        assert_eq!(view.controller().surface().write_count(), 0);

        view.run_until_ready(Duration::from_secs(1)).await.unwrap();
        let handle = view.controller().handle().unwrap();
        let surface = view.controller().surface();
        assert_eq!(surface.feature_count(handle, ROUTES_LAYER), Some(2));
        assert_eq!(surface.feature_count(handle, AIRPORTS_LAYER), Some(3));
    }

    #[tokio::test]
    async fn test_run_until_ready_times_out() {
        let mut view = view(false);
        view.post(ViewEvent::Mount("pk.test".to_string()));

        let err = view
            .run_until_ready(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SurfaceNotReady { .. }));
    }

    #[tokio::test]
    async fn test_rejected_token_never_ready() {
        let mut view = view(true);
        view.post(ViewEvent::Mount("   ".to_string()));
        assert!(view.run_until_ready(Duration::from_millis(20)).await.is_err());
    }

    #[tokio::test]
    async fn test_run_until_ready_when_already_ready() {
        let mut view = view(true);
        view.post(ViewEvent::Mount("pk.test".to_string()));
        view.run_until_ready(Duration::from_secs(1)).await.unwrap();
        view.run_until_ready(Duration::from_millis(1)).await.unwrap();
    }

    #[test]
    fn test_token_change_redraws_latest_snapshot() {
        let mut view = view(true);
        view.post(ViewEvent::Mount("pk.test".to_string()));
        view.post(ViewEvent::Submit(flights()));
        view.drain();
        view.drain();
        let old = view.controller().handle().unwrap();
        assert!(view.controller().is_ready());

        view.post(ViewEvent::TokenChanged("pk.other".to_string()));
        view.drain();
        view.drain();

        let new = view.controller().handle().unwrap();
        assert_ne!(old, new);
        assert!(!view.controller().surface().is_live(old));
        assert_eq!(
            view.controller().surface().feature_count(new, ROUTES_LAYER),
            Some(2)
        );
    }

    #[test]
    fn test_unmount_then_late_ready() {
        let mut view = view(true);
        view.post(ViewEvent::Mount("pk.test".to_string()));
        view.post(ViewEvent::Unmount);
        // Mount, Unmount, then the ready for the destroyed surface.
        assert_eq!(view.drain(), 3);
        assert!(!view.controller().is_ready());
        assert_eq!(view.controller().surface().write_count(), 0);
    }

    #[test]
    fn test_post_to_closed_channel_is_dropped() {
        let (tx, orphaned) = channel();
        drop(orphaned);
        let (_unused, rx) = channel();
        let controller = view(false).into_controller();
        let mut view = MapView::new(controller, tx, rx);

        view.post(ViewEvent::Mount("pk.test".to_string()));
        assert_eq!(view.drain(), 0);
        assert_eq!(view.controller().state(), SyncState::Uninitialized);
    }

    #[test]
    fn test_event_debug_hides_token() {
        let event = ViewEvent::Mount("pk.secret".to_string());
        assert!(!format!("{event:?}").contains("pk.secret"));
    }
}
