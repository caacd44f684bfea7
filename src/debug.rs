//! Interpreter event collection, active only when the group's debug flag is
//! set. Hosts use the events to pair output chunks with the templates that
//! produced them.

use crate::template::Template;

/// An event recorded while interpreting.
#[derive(Debug, Clone)]
pub enum InterpEvent {
    EvalTemplate(EvalTemplateEvent),
}

/// One template frame finished executing.
#[derive(Debug, Clone)]
pub struct EvalTemplateEvent {
    pub template: Template,
    /// Writer offset of the first character this frame wrote.
    pub start: usize,
    /// Writer offset of the last character this frame wrote.
    pub stop: usize,
}
