//! Parameter Value Language (PDS/VICAR label) parser, tree model and lister.
//!
//! Four pieces, leaves first: a sliding, filterable [`window::InputWindow`]
//! over a byte stream; the [`window::VmsRecordsFilter`] and
//! [`window::LineCountFilter`] that transform it in place; the
//! [`parser::Parser`] that drives the window into a [`parameter`] tree; and
//! [`lister`]/[`selector`] for emitting text back out and looking parameters
//! up by pathname.
//!
//! ```
//! use pvl::parser::{parse_str, ParserOptions};
//!
//! let (parsed, diagnostics) = parse_str(
//!     "GROUP = IMAGE\n  LINES = 100\nEND_GROUP = IMAGE\nEND",
//!     ParserOptions::default(),
//! );
//! let parameter = parsed.expect("parse ok").expect("non-empty input");
//! assert!(diagnostics.is_empty());
//! assert_eq!(parameter.pathname(), "/IMAGE");
//! ```

pub mod error;
pub mod lister;
pub mod location;
pub mod parameter;
pub mod parser;
pub mod selector;
pub mod value;
pub mod window;

pub use error::{Diagnostic, DiagnosticKind, IngestError, ParseError};
pub use lister::{list, list_root, ListerOptions};
pub use location::{Location, Position, NO_LIMIT};
pub use parameter::{Aggregate, AggregateKind, Assignment, Parameter};
pub use parser::{parse, parse_str, ParserOptions};
pub use selector::{KindFilter, Selector};
pub use value::{ArrayKind, StringKind, Value, ValueKind};
pub use window::{InputWindow, LineCountFilter, VmsRecordsFilter};
