//! Runtime diagnostics.
//!
//! Rendering never fails with `Err`: faults are reported to the group's
//! [`ErrorSink`] and execution continues with a safe sentinel, so a broken
//! reference degrades to reasonable fallback text instead of aborting the
//! whole render.

use std::cell::RefCell;
use std::fmt;

/// What went wrong.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    #[error("no such template: {0}")]
    NoSuchTemplate(String),

    #[error("no such imported template: {0}")]
    NoImportedTemplate(String),

    #[error("no such property: {0}")]
    NoSuchProperty(String),

    #[error("attribute {0} isn't defined")]
    NoAttributeDefinition(String),

    #[error("{op} expects a string, not {actual}")]
    ExpectingString {
        op: &'static str,
        actual: &'static str,
    },

    #[error("expecting a single argument, template {template} declares {arity}")]
    ExpectingSingleArgument { template: String, arity: usize },

    #[error("template has no formal arguments to zip values onto")]
    MissingFormalArguments,

    #[error("zipping {values} value streams but template declares {formals} arguments")]
    MapArgumentCountMismatch { values: usize, formals: usize },

    #[error("error writing output")]
    WriteIoError,

    #[error("internal error: {0}")]
    InternalError(String),
}

/// One reported fault: where it happened and what it was.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    /// Name of the template whose frame was executing.
    pub template: Option<String>,
    /// Address of the opcode that was executing, when one was.
    pub ip: Option<usize>,
    pub kind: ErrorKind,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(template) = &self.template {
            write!(f, "{template}")?;
            if let Some(ip) = self.ip {
                write!(f, " @ {ip}")?;
            }
            write!(f, ": ")?;
        }
        fmt::Display::fmt(&self.kind, f)
    }
}

/// Receives runtime fault records during rendering.
pub trait ErrorSink {
    fn runtime_error(&self, err: RuntimeError);
}

/// Buffers every reported fault for later inspection.
#[derive(Debug, Default)]
pub struct CollectingErrorSink {
    errors: RefCell<Vec<RuntimeError>>,
}

impl CollectingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<RuntimeError> {
        self.errors.borrow().clone()
    }

    /// Drain the buffered faults.
    pub fn take(&self) -> Vec<RuntimeError> {
        std::mem::take(&mut *self.errors.borrow_mut())
    }

    pub fn is_empty(&self) -> bool {
        self.errors.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.borrow().len()
    }
}

impl ErrorSink for CollectingErrorSink {
    fn runtime_error(&self, err: RuntimeError) {
        self.errors.borrow_mut().push(err);
    }
}

/// Logs every reported fault through `tracing`. The default sink.
#[derive(Debug, Default)]
pub struct LoggingErrorSink;

impl ErrorSink for LoggingErrorSink {
    fn runtime_error(&self, err: RuntimeError) {
        tracing::error!(target: "weft", "{err}");
    }
}
