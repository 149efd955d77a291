pub mod publisher;
pub mod socket;
pub mod wire;

pub use publisher::{serve_viewer, Frame, StreamPublisher, Viewer, ViewerExit};
pub use wire::WireFormat;
