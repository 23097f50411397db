use crate::touch::error::TouchError;
use crate::touch::model::{DrawIntent, Point, Shape, TouchEvent, TouchEventKind, TouchId};
use crate::touch::registry::{SlotHandle, TouchRegistry};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerGeometry {
    pub begin_radius: f64,
    pub end_size: f64,
}

impl Default for MarkerGeometry {
    fn default() -> Self {
        Self {
            begin_radius: 30.0,
            end_size: 30.0,
        }
    }
}

/// Outcome of one accepted touch event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub slot: SlotHandle,
    pub intent: Option<DrawIntent>,
    /// A begin arrived for an identifier that was still active; the old slot was ended first.
    pub replaced_stale: bool,
}

/// Applies begin/update/end transitions to the registry and reports what to draw.
///
/// Drawing is left to the caller so the transitions can be checked without a surface.
#[derive(Debug, Clone)]
pub struct TouchStateMachine {
    registry: TouchRegistry,
    markers: MarkerGeometry,
}

impl TouchStateMachine {
    pub fn new(capacity: usize, markers: MarkerGeometry) -> Self {
        Self {
            registry: TouchRegistry::with_capacity(capacity),
            markers,
        }
    }

    pub fn registry(&self) -> &TouchRegistry {
        &self.registry
    }

    pub fn handle(&mut self, event: TouchEvent) -> Result<Transition, TouchError> {
        match event.kind {
            TouchEventKind::Begin => self.begin(event.id, event.position),
            TouchEventKind::Update => self.update(event.id, event.position),
            TouchEventKind::End => self.end(event.id, event.position),
            TouchEventKind::Cancel => self.cancel(event.id, event.position),
        }
    }

    /// Ends every live contact without drawing end markers.
    pub fn cancel_all(&mut self) -> usize {
        self.registry.release_all()
    }

    pub fn active_positions(&self) -> Vec<(TouchId, Point)> {
        self.registry
            .active()
            .filter_map(|(_, slot)| slot.touch_id().map(|id| (id, slot.position())))
            .collect()
    }

    fn begin(&mut self, id: TouchId, position: Point) -> Result<Transition, TouchError> {
        let mut replaced_stale = false;
        if let Some(stale) = self.registry.find(id) {
            let last = self
                .registry
                .get(stale)
                .map(|slot| slot.position())
                .unwrap_or(position);
            self.registry.release(stale, last)?;
            replaced_stale = true;
        }

        let slot = self.registry.allocate(id, position)?;
        Ok(Transition {
            slot,
            intent: Some(DrawIntent {
                id,
                shape: Shape::Ring {
                    center: position,
                    radius: self.markers.begin_radius,
                },
            }),
            replaced_stale,
        })
    }

    fn update(&mut self, id: TouchId, position: Point) -> Result<Transition, TouchError> {
        let (slot, previous) = self.lookup(id, TouchEventKind::Update)?;
        self.registry.update(slot, position)?;
        Ok(Transition {
            slot,
            intent: Some(DrawIntent {
                id,
                shape: Shape::Segment {
                    from: previous,
                    to: position,
                },
            }),
            replaced_stale: false,
        })
    }

    fn end(&mut self, id: TouchId, position: Point) -> Result<Transition, TouchError> {
        let (slot, _) = self.lookup(id, TouchEventKind::End)?;
        self.registry.release(slot, position)?;
        Ok(Transition {
            slot,
            intent: Some(DrawIntent {
                id,
                shape: Shape::Square {
                    center: position,
                    size: self.markers.end_size,
                },
            }),
            replaced_stale: false,
        })
    }

    fn cancel(&mut self, id: TouchId, position: Point) -> Result<Transition, TouchError> {
        let (slot, _) = self.lookup(id, TouchEventKind::Cancel)?;
        self.registry.release(slot, position)?;
        Ok(Transition {
            slot,
            intent: None,
            replaced_stale: false,
        })
    }

    fn lookup(&self, id: TouchId, kind: TouchEventKind) -> Result<(SlotHandle, Point), TouchError> {
        let slot = self
            .registry
            .find(id)
            .ok_or(TouchError::NotFound { id, kind })?;
        let position = self
            .registry
            .get(slot)
            .map(|slot| slot.position())
            .ok_or(TouchError::StaleHandle)?;
        Ok((slot, position))
    }
}

impl Default for TouchStateMachine {
    fn default() -> Self {
        Self::new(
            crate::touch::registry::DEFAULT_MAX_TOUCHES,
            MarkerGeometry::default(),
        )
    }
}
