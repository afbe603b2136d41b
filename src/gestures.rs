// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Scripted viewport input.
//!
//! The headless viewer has no pointer, so pan, zoom and click gestures are read
//! from a script with one gesture per line:
//!
//! ```text
//! # cycle verb args...
//! 2 pan 40 -10
//! 3 wheel 650 380 in
//! 3 wheel 650 380 out mod
//! 4 click 700 400
//! 5 zoom-in
//! 6 reset
//! 7 resize 1920 1080
//! ```
//!
//! Each gesture is applied just before the frame for its cycle is written.

use std::str::FromStr;

use log::{debug, info};
use radar_scope::transform::wheel_zoom_factor;
use radar_scope::{RadarTransform, Scope, ScreenVec};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum GestureError {
    #[error("line {line}: expected `<cycle> <verb> [args]`")]
    Incomplete { line: usize },
    #[error("line {line}: invalid number `{value}`")]
    InvalidNumber { line: usize, value: String },
    #[error("line {line}: unknown gesture `{verb}`")]
    UnknownVerb { line: usize, verb: String },
}

/// One viewport input event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// Drag by a pixel delta.
    Pan(ScreenVec),
    /// One wheel notch at a cursor position.
    Wheel {
        at: ScreenVec,
        zoom_in: bool,
        modified: bool,
    },
    /// Primary click at a cursor position.
    Click(ScreenVec),
    ZoomIn,
    ZoomOut,
    Reset,
    /// Window resized to the given size; the origin follows the new center.
    Resize { width: f64, height: f64 },
}

impl Gesture {
    /// Apply to the view, toggling highlight on whatever a click lands on.
    pub fn apply(self, view: &mut RadarTransform, scope: &Scope) {
        match self {
            Self::Pan(delta) => view.pan_by(delta),
            Self::Wheel { at, zoom_in, modified } => {
                view.zoom_at(at, wheel_zoom_factor(zoom_in, modified));
            }
            Self::Click(at) => match scope.select_at(at, view) {
                Some((id, highlighted)) => info!("{id} highlight {}", if highlighted { "on" } else { "off" }),
                None => debug!("Click at ({:.0}, {:.0}) hit nothing", at.x, at.y),
            },
            Self::ZoomIn => view.zoom_in(),
            Self::ZoomOut => view.zoom_out(),
            Self::Reset => view.reset(),
            Self::Resize { width, height } => {
                view.set_viewport_center(ScreenVec::new(width / 2.0, height / 2.0));
            }
        }
    }
}

/// A gesture bound to the update cycle it fires on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledGesture {
    pub cycle: u64,
    pub gesture: Gesture,
}

/// Gestures in cycle order, consumed as cycles advance.
#[derive(Debug, Default)]
pub struct GestureScript {
    pending: Vec<ScheduledGesture>,
}

impl GestureScript {
    /// Parse a script. Blank lines and `#` comments are ignored.
    pub fn parse(text: &str) -> Result<Self, GestureError> {
        let mut pending = text
            .lines()
            .enumerate()
            .filter_map(|(idx, raw)| {
                let line = raw.split('#').next().unwrap_or_default().trim();
                (!line.is_empty()).then(|| parse_line(idx + 1, line))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Stable, so gestures sharing a cycle keep script order
        pending.sort_by_key(|g| g.cycle);
        pending.reverse();
        Ok(Self { pending })
    }

    /// Remove and return every gesture due at or before `cycle`.
    pub fn take_due(&mut self, cycle: u64) -> Vec<Gesture> {
        let mut due = Vec::new();
        while self.pending.last().is_some_and(|g| g.cycle <= cycle) {
            if let Some(scheduled) = self.pending.pop() {
                due.push(scheduled.gesture);
            }
        }
        due
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl FromStr for GestureScript {
    type Err = GestureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_line(line: usize, text: &str) -> Result<ScheduledGesture, GestureError> {
    let mut fields = text.split_whitespace();
    let cycle = fields.next().ok_or(GestureError::Incomplete { line })?;
    let cycle = cycle.parse::<u64>().map_err(|_| GestureError::InvalidNumber {
        line,
        value: cycle.to_string(),
    })?;
    let verb = fields.next().ok_or(GestureError::Incomplete { line })?;

    let mut number = || -> Result<f64, GestureError> {
        let value = fields.next().ok_or(GestureError::Incomplete { line })?;
        value.parse::<f64>().map_err(|_| GestureError::InvalidNumber {
            line,
            value: value.to_string(),
        })
    };

    let gesture = match verb {
        "pan" => Gesture::Pan(ScreenVec::new(number()?, number()?)),
        "click" => Gesture::Click(ScreenVec::new(number()?, number()?)),
        "wheel" => {
            let at = ScreenVec::new(number()?, number()?);
            let zoom_in = match fields.next() {
                Some("in") => true,
                Some("out") => false,
                Some(other) => {
                    return Err(GestureError::UnknownVerb {
                        line,
                        verb: format!("wheel {other}"),
                    })
                }
                None => return Err(GestureError::Incomplete { line }),
            };
            let modified = fields.next() == Some("mod");
            Gesture::Wheel { at, zoom_in, modified }
        }
        "zoom-in" => Gesture::ZoomIn,
        "zoom-out" => Gesture::ZoomOut,
        "reset" => Gesture::Reset,
        "resize" => Gesture::Resize {
            width: number()?,
            height: number()?,
        },
        other => {
            return Err(GestureError::UnknownVerb {
                line,
                verb: other.to_string(),
            })
        }
    };

    Ok(ScheduledGesture { cycle, gesture })
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_scope::{GeoPoint, RawReport};

    const ORD: GeoPoint = GeoPoint::new(41.9786, -87.9048);

    fn view() -> RadarTransform {
        RadarTransform::new(ORD, 1.0, ScreenVec::new(700.0, 400.0))
    }

    #[test]
    fn test_parse_script() {
        let mut script = GestureScript::parse(
            "# warm up\n\
             3 wheel 650 380 out mod\n\
             1 pan 40 -10\n\
             \n\
             3 click 700 400  # select\n\
             5 reset\n",
        )
        .unwrap();

        assert!(script.take_due(0).is_empty());
        assert_eq!(script.take_due(1), [Gesture::Pan(ScreenVec::new(40.0, -10.0))]);
        assert_eq!(
            script.take_due(4),
            [
                Gesture::Wheel {
                    at: ScreenVec::new(650.0, 380.0),
                    zoom_in: false,
                    modified: true,
                },
                Gesture::Click(ScreenVec::new(700.0, 400.0)),
            ]
        );
        assert!(!script.is_empty());
        assert_eq!(script.take_due(10), [Gesture::Reset]);
        assert!(script.is_empty());
    }

    #[test]
    fn test_parse_errors_carry_line_numbers() {
        assert_eq!(
            GestureScript::parse("1 pan 4\n").unwrap_err(),
            GestureError::Incomplete { line: 1 }
        );
        assert_eq!(
            GestureScript::parse("\nx pan 1 2").unwrap_err(),
            GestureError::InvalidNumber {
                line: 2,
                value: "x".to_string()
            }
        );
        assert!(matches!(
            "1 spin".parse::<GestureScript>(),
            Err(GestureError::UnknownVerb { line: 1, .. })
        ));
    }

    #[test]
    fn test_wheel_keeps_cursor_anchored() {
        let scope = Scope::default();
        let mut view = view();
        let cursor = ScreenVec::new(650.0, 380.0);
        let before = view.pixel_to_geo(cursor);

        Gesture::Wheel {
            at: cursor,
            zoom_in: true,
            modified: false,
        }
        .apply(&mut view, &scope);

        assert!((view.scale() - 1.1).abs() < 1e-12);
        let after = view.pixel_to_geo(cursor);
        assert!((after.lat - before.lat).abs() < 1e-9);
        assert!((after.lon - before.lon).abs() < 1e-9);
    }

    #[test]
    fn test_click_toggles_highlight() {
        let scope = Scope::default();
        scope.ingest(&[RawReport::at("AAL7", ORD.lat, ORD.lon)]);
        let mut view = view();

        Gesture::Click(ScreenVec::new(703.0, 398.0)).apply(&mut view, &scope);
        assert_eq!(scope.with_tracks(|s| s.is_highlighted("AAL7")), Some(true));

        Gesture::Click(ScreenVec::new(703.0, 398.0)).apply(&mut view, &scope);
        assert_eq!(scope.with_tracks(|s| s.is_highlighted("AAL7")), Some(false));
    }

    #[test]
    fn test_resize_moves_origin_with_pan_kept() {
        let scope = Scope::default();
        let mut view = view();
        let mut script = GestureScript::parse("1 pan 10 20
2 resize 1920 1080").unwrap();

        for cycle in 1..=2 {
            for gesture in script.take_due(cycle) {
                gesture.apply(&mut view, &scope);
            }
        }

        assert_eq!(view.viewport_center(), ScreenVec::new(960.0, 540.0));
        assert_eq!(view.origin_pixel(), ScreenVec::new(970.0, 560.0));
    }

    #[test]
    fn test_buttons_and_reset() {
        let scope = Scope::default();
        let mut view = view();

        Gesture::Pan(ScreenVec::new(25.0, 5.0)).apply(&mut view, &scope);
        Gesture::ZoomIn.apply(&mut view, &scope);
        Gesture::ZoomIn.apply(&mut view, &scope);
        Gesture::ZoomOut.apply(&mut view, &scope);
        assert!((view.scale() - 1.2).abs() < 1e-12);

        Gesture::Reset.apply(&mut view, &scope);
        assert!((view.scale() - 1.0).abs() < f64::EPSILON);
        assert_eq!(view.pan_offset(), ScreenVec::ZERO);
    }
}
