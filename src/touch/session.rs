//! winit window with a softbuffer-backed front buffer.

use crate::touch::compositor::PresentTarget;
use crate::touch::dispatch::{EventSource, SessionEvent, SourceStatus};
use crate::touch::model::{Point, TouchEvent};
use crate::touch::render::{convert_rgba_to_xrgb_rect, DirtyRect, Surface};
use anyhow::{anyhow, Context as _};
use std::num::NonZeroU32;
use std::rc::Rc;
use std::time::Duration;
use winit::dpi::PhysicalSize;
use winit::event::{Event, Touch, TouchPhase, WindowEvent};
use winit::event_loop::EventLoop;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowBuilder};

pub const WINDOW_TITLE: &str = "multitouch";

/// An open window, split into its input and output halves.
pub struct WindowSession {
    // Dropped first: the surface must not outlive the window or its event loop.
    output: WindowOutput,
    input: WindowInput,
}

/// Event side of the window.
pub struct WindowInput {
    // Declared before the event loop so it is dropped first.
    window: Rc<Window>,
    event_loop: EventLoop<()>,
}

/// Presentation side of the window.
pub struct WindowOutput {
    surface: softbuffer::Surface<Rc<Window>, Rc<Window>>,
    // Kept alive for the surface.
    _context: softbuffer::Context<Rc<Window>>,
    size: (NonZeroU32, NonZeroU32),
}

impl WindowSession {
    /// Opens a fixed-size window. Fails when no display is reachable.
    pub fn open(width: u32, height: u32) -> anyhow::Result<Self> {
        let (Some(nz_width), Some(nz_height)) = (NonZeroU32::new(width), NonZeroU32::new(height))
        else {
            anyhow::bail!("window size must be non-zero, got {width}x{height}");
        };

        let event_loop = EventLoop::new().context("failed to connect to the window system")?;
        let window = WindowBuilder::new()
            .with_title(WINDOW_TITLE)
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(false)
            .build(&event_loop)
            .context("failed to create window")?;
        let window = Rc::new(window);

        let context = softbuffer::Context::new(window.clone())
            .map_err(|err| anyhow!("failed to create drawing context: {err}"))?;
        let mut surface = softbuffer::Surface::new(&context, window.clone())
            .map_err(|err| anyhow!("failed to create window surface: {err}"))?;
        surface
            .resize(nz_width, nz_height)
            .map_err(|err| anyhow!("failed to size window surface: {err}"))?;

        tracing::info!(width, height, "window opened");
        Ok(Self {
            input: WindowInput {
                window,
                event_loop,
            },
            output: WindowOutput {
                surface,
                _context: context,
                size: (nz_width, nz_height),
            },
        })
    }

    /// Borrows both halves at once so the loop can read input and present in the same pass.
    pub fn split(&mut self) -> (&mut WindowInput, &mut WindowOutput) {
        (&mut self.input, &mut self.output)
    }
}

impl EventSource for WindowInput {
    fn pump(&mut self, timeout: Duration, events: &mut Vec<SessionEvent>) -> SourceStatus {
        let window_id = self.window.id();
        // Screen coordinates need the window origin; X11 answers this with a round trip,
        // so it is asked once per pump rather than per event.
        let origin = self
            .window
            .inner_position()
            .ok()
            .map(|pos| Point::new(f64::from(pos.x), f64::from(pos.y)));
        let before = events.len();
        let status = self.event_loop.pump_events(Some(timeout), |event, _| {
            if let Event::WindowEvent { window_id: id, event } = event {
                if id == window_id {
                    if let Some(event) = translate(event, origin) {
                        events.push(event);
                    }
                }
            }
        });

        match status {
            PumpStatus::Exit(code) => {
                tracing::debug!(code, "event loop exited");
                SourceStatus::Disconnected
            }
            PumpStatus::Continue if events.len() > before => SourceStatus::Ready,
            PumpStatus::Continue => SourceStatus::Idle,
        }
    }
}

impl PresentTarget for WindowOutput {
    fn present(&mut self, front: &Surface, region: DirtyRect) -> anyhow::Result<()> {
        let (width, height) = front.size();
        if (width, height) != (self.size.0.get(), self.size.1.get()) {
            anyhow::bail!(
                "front buffer is {width}x{height} but the window surface is {}x{}",
                self.size.0,
                self.size.1
            );
        }
        let (Some(damage_width), Some(damage_height)) = (
            NonZeroU32::new(region.width as u32),
            NonZeroU32::new(region.height as u32),
        ) else {
            return Ok(());
        };

        let mut buffer = self
            .surface
            .buffer_mut()
            .map_err(|err| anyhow!("failed to map window buffer: {err}"))?;
        // Buffer contents are not guaranteed to survive between frames.
        convert_rgba_to_xrgb_rect(front.pixels(), &mut buffer, width, front.full_rect());
        buffer
            .present_with_damage(&[softbuffer::Rect {
                x: region.x as u32,
                y: region.y as u32,
                width: damage_width,
                height: damage_height,
            }])
            .map_err(|err| anyhow!("failed to present frame: {err}"))
    }
}

fn translate(event: WindowEvent, origin: Option<Point>) -> Option<SessionEvent> {
    match event {
        WindowEvent::Touch(Touch {
            phase, location, id, ..
        }) => {
            let (x, y) = (location.x, location.y);
            let touch = match phase {
                TouchPhase::Started => TouchEvent::begin(id, x, y),
                TouchPhase::Moved => TouchEvent::update(id, x, y),
                TouchPhase::Ended => TouchEvent::end(id, x, y),
                TouchPhase::Cancelled => TouchEvent::cancel(id, x, y),
            };
            Some(SessionEvent::Touch(match origin {
                Some(origin) => touch.with_window_origin(origin),
                None => touch,
            }))
        }
        WindowEvent::RedrawRequested | WindowEvent::Resized(_) => Some(SessionEvent::Expose(None)),
        WindowEvent::CloseRequested | WindowEvent::Destroyed => Some(SessionEvent::CloseRequested),
        _ => None,
    }
}
