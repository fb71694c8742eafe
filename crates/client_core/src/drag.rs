//! Drag session state machine for reordering a list.
//!
//! A session is `Idle` until [`DragSession::begin`] lifts an item, then
//! `Dragging` until it is released or cancelled. Pointer moves and keyboard
//! steps both resolve the provisional insertion point with the same
//! nearest-center collision rule, so identical intents give identical drops.

use crate::error::ReorderError;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn distance_squared(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    fn minus(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

/// On-screen rectangle of one list slot, captured when the drag starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ItemRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Vertical list of `count` rows, each `row_height` tall.
    pub fn stacked(count: usize, row_height: f32) -> Vec<ItemRect> {
        (0..count)
            .map(|index| ItemRect::new(0.0, index as f32 * row_height, 100.0, row_height))
            .collect()
    }
}

/// Index of the slot whose center is nearest to `pointer`. Ties go to the lower index.
pub fn closest_center(layout: &[ItemRect], pointer: Point) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, rect) in layout.iter().enumerate() {
        let distance = rect.center().distance_squared(pointer);
        match best {
            Some((_, best_distance)) if best_distance <= distance => {}
            _ => best = Some((index, distance)),
        }
    }
    best.map(|(index, _)| index)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStep {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging { origin: usize, target: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    Dropped { origin: usize, destination: usize },
    Cancelled { origin: usize },
}

#[derive(Debug, Clone)]
struct ActiveDrag {
    origin: usize,
    target: usize,
    layout: Vec<ItemRect>,
    pointer: Point,
}

#[derive(Debug, Default)]
pub struct DragSession {
    active: Option<ActiveDrag>,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        match &self.active {
            Some(active) => DragState::Dragging {
                origin: active.origin,
                target: active.target,
            },
            None => DragState::Idle,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    pub fn begin(&mut self, origin: usize, layout: Vec<ItemRect>) -> Result<(), ReorderError> {
        if let Some(active) = &self.active {
            return Err(ReorderError::DragInProgress {
                origin: active.origin,
            });
        }
        let Some(rect) = layout.get(origin) else {
            return Err(ReorderError::IndexOutOfRange {
                index: origin,
                len: layout.len(),
            });
        };

        self.active = Some(ActiveDrag {
            origin,
            target: origin,
            pointer: rect.center(),
            layout,
        });
        Ok(())
    }

    /// Moves the virtual pointer and returns the new provisional target.
    pub fn pointer_moved(&mut self, pointer: Point) -> Result<usize, ReorderError> {
        let active = self.active.as_mut().ok_or(ReorderError::NoActiveDrag)?;
        active.pointer = pointer;
        if let Some(target) = closest_center(&active.layout, pointer) {
            active.target = target;
        }
        Ok(active.target)
    }

    /// Keyboard movement: park the pointer on the neighbouring slot's center,
    /// clamped to the list bounds, then resolve like a pointer move.
    pub fn key_step(&mut self, step: KeyStep) -> Result<usize, ReorderError> {
        let active = self.active.as_ref().ok_or(ReorderError::NoActiveDrag)?;
        let last = active.layout.len().saturating_sub(1);
        let next = match step {
            KeyStep::Up => active.target.saturating_sub(1),
            KeyStep::Down => (active.target + 1).min(last),
        };
        let pointer = active.layout[next].center();
        self.pointer_moved(pointer)
    }

    /// Ends the gesture. Releasing over the origin is a cancellation.
    pub fn release(&mut self) -> Result<DropOutcome, ReorderError> {
        let active = self.active.take().ok_or(ReorderError::NoActiveDrag)?;
        if active.target == active.origin {
            return Ok(DropOutcome::Cancelled {
                origin: active.origin,
            });
        }
        Ok(DropOutcome::Dropped {
            origin: active.origin,
            destination: active.target,
        })
    }

    pub fn cancel(&mut self) -> Option<DropOutcome> {
        self.active
            .take()
            .map(|active| DropOutcome::Cancelled {
                origin: active.origin,
            })
    }

    /// Arrangement the list would have if released now.
    pub fn preview_order<T: Clone>(&self, items: &[T]) -> Vec<T> {
        match &self.active {
            Some(active) if active.origin < items.len() && active.target < items.len() => {
                let mut preview = items.to_vec();
                let item = preview.remove(active.origin);
                preview.insert(active.target, item);
                preview
            }
            _ => items.to_vec(),
        }
    }

    /// Visual translation for the item currently at `index`.
    ///
    /// The lifted item follows the pointer; every other item slides to the slot
    /// it would occupy after the drop.
    pub fn item_offset(&self, index: usize) -> Point {
        let Some(active) = &self.active else {
            return Point::default();
        };
        let Some(rect) = active.layout.get(index) else {
            return Point::default();
        };
        if index == active.origin {
            return active.pointer.minus(rect.center());
        }

        let (origin, target) = (active.origin, active.target);
        let shifted = if origin < target && index > origin && index <= target {
            index - 1
        } else if target < origin && index >= target && index < origin {
            index + 1
        } else {
            index
        };
        active.layout[shifted].center().minus(rect.center())
    }
}

#[cfg(test)]
#[path = "tests/drag_tests.rs"]
mod tests;
