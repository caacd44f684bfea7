//! A stack-based rendering core for grouped, parameterized text templates.
//!
//! # Features
//!
//! - Precompiled templates: an instruction buffer, a string constant pool and
//!   a formal-argument table, assembled through [`CodeBuilder`].
//! - Groups: named templates with imports, per-kind attribute renderers and a
//!   pluggable [`ErrorSink`].
//! - Attribute scoping: embedded templates resolve references through the
//!   chain of instances that embedded them.
//! - Iteration with separators, rotating multi-template application and
//!   parallel zip maps with `i`/`i0` iteration indices.
//! - Option-driven output: `separator`, `null`, `format`, `anchor` and
//!   `wrap`, honored through an indentation- and wrap-aware writer.
//! - Render faults never abort: they are reported to the group's error sink
//!   and rendering continues with sensible fallback text.
//!
//! # Introduction
//!
//! A [`Group`] holds compiled templates. The compiler that produces
//! instruction streams lives outside this crate; [`CodeBuilder`] is the
//! surface it targets, and is also how the examples here assemble code.
//!
//! ```
//! use weft::{ops, CodeBuilder, Group};
//!
//! let group = Group::new();
//!
//! // hello(name) ::= "Hello, <name>!"
//! let mut b = CodeBuilder::new("hello");
//! b.arg("name");
//! b.emit_str(ops::LOAD_STR, "Hello, ");
//! b.emit(ops::WRITE);
//! b.emit_str(ops::LOAD_ATTR, "name");
//! b.emit(ops::WRITE);
//! b.emit_str(ops::LOAD_STR, "!");
//! b.emit(ops::WRITE);
//! group.define(b.build());
//!
//! let template = group.get_instance_of("hello").unwrap();
//! template.set("name", "World");
//! assert_eq!(template.render(), "Hello, World!");
//! ```
//!
//! Attributes are [`Value`]s and convert from ordinary Rust data:
//!
//! ```
//! # use weft::{ops, CodeBuilder, Group};
//! # let group = weft::Group::new();
//! # let mut b = CodeBuilder::new("g");
//! # b.arg("names");
//! # b.emit_str(ops::LOAD_ATTR, "names");
//! # b.emit(ops::WRITE);
//! # group.define(b.build());
//! let template = group.get_instance_of("g").unwrap();
//! template.set("names", vec!["a", "b", "c"]);
//! assert_eq!(template.render(), "abc");
//! ```
//!
//! To observe render faults instead of logging them, install a collecting
//! sink:
//!
//! ```
//! use std::rc::Rc;
//! use weft::CollectingErrorSink;
//!
//! let group = weft::Group::new();
//! let errors = Rc::new(CollectingErrorSink::new());
//! group.set_error_sink(Rc::clone(&errors) as Rc<dyn weft::ErrorSink>);
//! ```

mod code;
mod debug;
mod error;
mod group;
mod interp;
mod template;
pub mod value;
mod writer;

pub use crate::code::ops;
pub use crate::code::{CodeBuilder, CompiledTemplate, FormalArgs, FormalArgument, UNKNOWN_NAME};
pub use crate::debug::{EvalTemplateEvent, InterpEvent};
pub use crate::error::{
    CollectingErrorSink, ErrorKind, ErrorSink, LoggingErrorSink, RuntimeError,
};
pub use crate::group::{AttributeRenderer, Group, DEFAULT_KEY, DICT_KEY};
pub use crate::interp::Interpreter;
pub use crate::ops::{RenderOption, NUM_OPTIONS};
pub use crate::template::Template;
pub use crate::value::{IterValue, ObjectModel, Value, ValueKind};
pub use crate::writer::{
    AutoIndentWriter, IoWriter, NoIndentWriter, TemplateWriter, WriteResult,
};
