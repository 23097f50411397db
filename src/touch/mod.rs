pub mod composite;
pub mod compositor;
pub mod devices;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod registry;
pub mod render;
pub mod session;
pub mod shutdown;
pub mod state;
pub mod trace;

pub use compositor::{CompositorStyle, LayeredCompositor, PresentTarget};
pub use dispatch::{
    DispatchConfig, DispatchOutcome, DispatchStats, Dispatcher, EventSource, SessionEvent,
    SourceStatus,
};
pub use error::{SurfaceError, TouchError};
pub use model::{Color, Point, StrokeStyle, TouchEvent, TouchEventKind, TouchId};
pub use registry::TouchRegistry;
pub use render::{DirtyRect, Surface};
pub use session::WindowSession;
pub use shutdown::CancellationToken;
pub use state::{MarkerGeometry, TouchStateMachine};
