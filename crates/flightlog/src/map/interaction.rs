//! Layer definitions and their pointer handlers.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::projection::{AirportProperties, RouteProperties};
use super::surface::{
    Cursor, InteractionContext, InteractionEffect, InteractionEvent, InteractionHandler,
    LayerKind, LayerSpec,
};
use crate::flight::display_date;
use crate::geo::Coordinates;

/// Id of the route line layer.
pub const ROUTES_LAYER: &str = "routes";

/// Id of the airport point layer.
pub const AIRPORTS_LAYER: &str = "airports";

/// Route lines.
pub const ROUTES_LAYER_SPEC: LayerSpec = LayerSpec {
    id: ROUTES_LAYER,
    kind: LayerKind::Line,
    color: "#3b82f6",
    size: 2.0,
    opacity: 0.8,
};

/// Airport markers.
pub const AIRPORTS_LAYER_SPEC: LayerSpec = LayerSpec {
    id: AIRPORTS_LAYER,
    kind: LayerKind::Circle,
    color: "#ef4444",
    size: 6.0,
    opacity: 1.0,
};

/// Both layers in registration order (routes below airports).
pub const LAYERS: [LayerSpec; 2] = [ROUTES_LAYER_SPEC, AIRPORTS_LAYER_SPEC];

/// Every handler the controller registers, as `(layer, event, handler)`.
#[must_use]
pub fn handlers() -> Vec<(&'static str, InteractionEvent, InteractionHandler)> {
    let mut all = vec![
        entry(ROUTES_LAYER, InteractionEvent::Click, route_popup),
        entry(AIRPORTS_LAYER, InteractionEvent::Click, airport_popup),
    ];
    for layer in [ROUTES_LAYER, AIRPORTS_LAYER] {
        all.push(entry(layer, InteractionEvent::MouseEnter, hover_cursor));
        all.push(entry(layer, InteractionEvent::MouseLeave, hover_cursor));
    }
    all
}

fn entry(
    layer: &'static str,
    event: InteractionEvent,
    f: fn(&InteractionContext) -> Option<InteractionEffect>,
) -> (&'static str, InteractionEvent, InteractionHandler) {
    let handler: InteractionHandler = Box::new(f);
    (layer, event, handler)
}

/// Popup for a clicked route, anchored at the click.
#[must_use]
pub fn route_popup(ctx: &InteractionContext) -> Option<InteractionEffect> {
    let props: RouteProperties = feature_properties(ctx.feature.as_ref()?)?;
    Some(InteractionEffect::ShowPopup {
        at: ctx.location,
        lines: vec![
            format!("{} → {}", props.from, props.to),
            format!("{} · {}", props.airline, props.aircraft),
            display_date(&props.date),
        ],
    })
}

/// Popup for a clicked airport, anchored at the airport itself.
#[must_use]
pub fn airport_popup(ctx: &InteractionContext) -> Option<InteractionEffect> {
    let feature = ctx.feature.as_ref()?;
    let props: AirportProperties = feature_properties(feature)?;
    let at = feature
        .pointer("/geometry/coordinates")
        .and_then(|c| serde_json::from_value::<Coordinates>(c.clone()).ok())
        .unwrap_or(ctx.location);

    Some(InteractionEffect::ShowPopup {
        at,
        lines: vec![props.code, props.role.to_string()],
    })
}

/// Pointer cursor while hovering a feature, default otherwise.
#[must_use]
pub fn hover_cursor(ctx: &InteractionContext) -> Option<InteractionEffect> {
    match ctx.event {
        InteractionEvent::MouseEnter => Some(InteractionEffect::SetCursor(Cursor::Pointer)),
        InteractionEvent::MouseLeave => Some(InteractionEffect::SetCursor(Cursor::Default)),
        InteractionEvent::Click => None,
    }
}

fn feature_properties<P: DeserializeOwned>(feature: &Value) -> Option<P> {
    serde_json::from_value(feature.get("properties")?.clone()).ok()
}
