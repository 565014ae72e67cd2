// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bezier painting of projected connections with egui.

use crate::projector::{Direction, RenderConnection};
use egui::{Pos2, Stroke};

/// Segments per curve
const BEZIER_SEGMENTS: usize = 32;

/// Control points of the cubic curve for a connection.
///
/// Handles are horizontal and half as long as the distance between the ends,
/// pointing away from the anchored port along its direction.
pub fn connection_curve(connection: &RenderConnection) -> [Pos2; 4] {
    let from = connection.from;
    let to = connection.to;
    let handle = from.distance(to) / 2.0;
    let sign = match connection.direction {
        Direction::Right => 1.0,
        Direction::Left => -1.0,
    };
    [
        from,
        Pos2::new(from.x + sign * handle, from.y),
        Pos2::new(to.x - sign * handle, to.y),
        to,
    ]
}

/// Generate points along a cubic bezier curve
pub fn bezier_points(p0: Pos2, p1: Pos2, p2: Pos2, p3: Pos2, segments: usize) -> Vec<Pos2> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|i| {
            let t = i as f32 / segments as f32;
            let u = 1.0 - t;
            let w0 = u * u * u;
            let w1 = 3.0 * u * u * t;
            let w2 = 3.0 * u * t * t;
            let w3 = t * t * t;
            Pos2::new(
                w0 * p0.x + w1 * p1.x + w2 * p2.x + w3 * p3.x,
                w0 * p0.y + w1 * p1.y + w2 * p2.y + w3 * p3.y,
            )
        })
        .collect()
}

/// Draw every connection as a bezier polyline
pub fn paint_connections(painter: &egui::Painter, connections: &[RenderConnection], stroke: Stroke) {
    for connection in connections {
        let [p0, p1, p2, p3] = connection_curve(connection);
        painter.add(egui::Shape::line(
            bezier_points(p0, p1, p2, p3, BEZIER_SEGMENTS),
            stroke,
        ));
    }
}
