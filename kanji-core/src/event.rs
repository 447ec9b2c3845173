//! Input events for the drawing surface.
//!
//! Coordinates are in viewport (client) space, exactly as the host receives
//! them. The drawing surface maps them into its logical space.

use serde::{Deserialize, Serialize};

/// Phase of a touch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchPhase {
    /// Touch started (finger down).
    Start,
    /// Touch moved (finger dragging).
    Move,
    /// Touch ended (finger up).
    End,
    /// Touch cancelled (e.g., palm rejection).
    Cancel,
}

/// A single touch point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    /// Touch identifier (for multi-touch).
    pub id: u32,
    /// X position in viewport coordinates.
    pub client_x: f32,
    /// Y position in viewport coordinates.
    pub client_y: f32,
}

impl TouchPoint {
    /// Touch point at a viewport position.
    #[must_use]
    pub fn at(id: u32, client_x: f32, client_y: f32) -> Self {
        Self {
            id,
            client_x,
            client_y,
        }
    }
}

/// A touch event with one or more touch points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchEvent {
    /// Phase of this touch event.
    pub phase: TouchPhase,
    /// Touches currently on the surface. Empty on `End`.
    pub touches: Vec<TouchPoint>,
}

impl TouchEvent {
    /// Create a new touch event.
    #[must_use]
    pub fn new(phase: TouchPhase, touches: Vec<TouchPoint>) -> Self {
        Self { phase, touches }
    }

    /// Get the primary (first) touch point.
    #[must_use]
    pub fn primary_touch(&self) -> Option<&TouchPoint> {
        self.touches.first()
    }

    /// Check if this is a multi-touch event.
    #[must_use]
    pub fn is_multi_touch(&self) -> bool {
        self.touches.len() > 1
    }
}

/// Device that produced a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    /// Mouse or trackpad.
    Mouse,
    /// Finger on a touch screen.
    Touch,
    /// Stylus.
    Pen,
}

/// Normalized phase shared by pointer and touch input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Button pressed / finger down.
    Down,
    /// Pointer moved.
    Move,
    /// Button released / finger up.
    Up,
    /// Pointer left the surface.
    Leave,
    /// Platform cancelled the gesture.
    Cancel,
}

/// All input events the drawing surface can receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InputEvent {
    /// Raw touch event.
    Touch(TouchEvent),

    /// Pointer (mouse or pen) event.
    Pointer {
        /// Device kind.
        kind: PointerKind,
        /// Phase.
        phase: PointerPhase,
        /// X position in viewport coordinates.
        client_x: f32,
        /// Y position in viewport coordinates.
        client_y: f32,
    },
}

impl InputEvent {
    /// Mouse event at a viewport position.
    #[must_use]
    pub fn mouse(phase: PointerPhase, client_x: f32, client_y: f32) -> Self {
        Self::Pointer {
            kind: PointerKind::Mouse,
            phase,
            client_x,
            client_y,
        }
    }

    /// Single-finger touch event at a viewport position.
    #[must_use]
    pub fn touch(phase: TouchPhase, client_x: f32, client_y: f32) -> Self {
        let touches = match phase {
            TouchPhase::End | TouchPhase::Cancel => Vec::new(),
            TouchPhase::Start | TouchPhase::Move => vec![TouchPoint::at(0, client_x, client_y)],
        };
        Self::Touch(TouchEvent::new(phase, touches))
    }

    /// Device kind that produced the event.
    #[must_use]
    pub fn kind(&self) -> PointerKind {
        match self {
            Self::Touch(_) => PointerKind::Touch,
            Self::Pointer { kind, .. } => *kind,
        }
    }

    /// Normalized phase.
    #[must_use]
    pub fn phase(&self) -> PointerPhase {
        match self {
            Self::Touch(touch) => match touch.phase {
                TouchPhase::Start => PointerPhase::Down,
                TouchPhase::Move => PointerPhase::Move,
                TouchPhase::End => PointerPhase::Up,
                TouchPhase::Cancel => PointerPhase::Cancel,
            },
            Self::Pointer { phase, .. } => *phase,
        }
    }

    /// Whether more than one finger is down (a pinch or scroll gesture).
    #[must_use]
    pub fn is_multi_touch(&self) -> bool {
        matches!(self, Self::Touch(touch) if touch.is_multi_touch())
    }

    /// Viewport position of the primary pointer, if the event carries one.
    #[must_use]
    pub fn client_position(&self) -> Option<(f32, f32)> {
        match self {
            Self::Touch(touch) => touch.primary_touch().map(|t| (t.client_x, t.client_y)),
            Self::Pointer {
                client_x, client_y, ..
            } => Some((*client_x, *client_y)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_phase_normalization() {
        let start = InputEvent::touch(TouchPhase::Start, 10.0, 20.0);
        assert_eq!(start.phase(), PointerPhase::Down);
        assert_eq!(start.kind(), PointerKind::Touch);
        assert_eq!(start.client_position(), Some((10.0, 20.0)));

        let end = InputEvent::touch(TouchPhase::End, 10.0, 20.0);
        assert_eq!(end.phase(), PointerPhase::Up);
        assert_eq!(end.client_position(), None);
    }

    #[test]
    fn test_multi_touch_uses_first_finger() {
        let event = TouchEvent::new(
            TouchPhase::Move,
            vec![TouchPoint::at(3, 1.0, 2.0), TouchPoint::at(4, 50.0, 60.0)],
        );
        assert!(event.is_multi_touch());
        assert!(InputEvent::Touch(event.clone()).is_multi_touch());
        assert!(!InputEvent::touch(TouchPhase::Move, 1.0, 2.0).is_multi_touch());
        assert_eq!(
            InputEvent::Touch(event).client_position(),
            Some((1.0, 2.0))
        );
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = InputEvent::mouse(PointerPhase::Down, 5.0, 6.0);
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "Pointer");
        assert_eq!(json["data"]["kind"], "mouse");
        assert_eq!(json["data"]["phase"], "down");

        let back: InputEvent = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, event);
    }
}
