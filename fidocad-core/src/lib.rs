//! FidoCad Core Library
//!
//! Drawing model, token grammar, coordinate mapping and macro libraries for
//! FidoCad schematic and PCB drawings.

pub mod coords;
pub mod error;
pub mod geom;
pub mod layers;
pub mod library;
pub mod model;
pub mod parser;
pub mod primitive;
pub mod settings;

// Re-export commonly used types
pub use coords::{round_half_up, Dimension, MapCoordinates, Point, PointF};
pub use error::{ModelError, ModelResult, ParseError, ParseErrorKind};
pub use layers::{standard_layers, Color, Layer, MAX_LAYERS};
pub use library::{is_standard_key, MacroDesc, MacroLibrary};
pub use model::DrawingModel;
pub use parser::{parse_primitives, parse_text};
pub use primitive::{AdvText, Labels, MacroCall, PadStyle, Primitive, Shape};
pub use settings::DrawingSettings;

/// Version information for the FidoCad core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
