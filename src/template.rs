//! Template instances.
//!
//! A [`Template`] binds a compiled template to a group context and an
//! attribute table. Instances form a chain while rendering: each embedded
//! instance holds a non-owning link to the instance that embedded it, which
//! attribute lookups walk outward.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::code::CompiledTemplate;
use crate::debug::InterpEvent;
use crate::error::{ErrorKind, RuntimeError};
use crate::group::Group;
use crate::interp::Interpreter;
use crate::value::Value;
use crate::writer::{AutoIndentWriter, TemplateWriter};

/// A template instance: a cheap, clonable handle.
#[derive(Clone)]
pub struct Template {
    inner: Rc<RefCell<Instance>>,
}

struct Instance {
    imp: Rc<CompiledTemplate>,
    attributes: HashMap<String, Value>,
    /// The instance that embedded this one. Non-owning: parents hold children
    /// through attribute values, never the reverse.
    enclosing: Option<Weak<RefCell<Instance>>>,
    /// The group driving lookups during this render; may differ from the
    /// compiled template's native group.
    group: Rc<Group>,
    pass_through: bool,
    events: Vec<InterpEvent>,
}

impl Template {
    pub(crate) fn new(imp: Rc<CompiledTemplate>, group: Rc<Group>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Instance {
                imp,
                attributes: HashMap::new(),
                enclosing: None,
                group,
                pass_through: false,
                events: Vec::new(),
            })),
        }
    }

    pub fn name(&self) -> String {
        self.inner.borrow().imp.name.clone()
    }

    pub fn compiled(&self) -> Rc<CompiledTemplate> {
        Rc::clone(&self.inner.borrow().imp)
    }

    pub fn group(&self) -> Rc<Group> {
        Rc::clone(&self.inner.borrow().group)
    }

    /// Set an attribute, verifying it against the declared formal arguments.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> &Self {
        self.check_attribute_exists(name, None);
        self.raw_set(name, value.into());
        self
    }

    /// Set an attribute without checking the formal-argument table.
    pub(crate) fn raw_set(&self, name: &str, value: Value) {
        self.inner
            .borrow_mut()
            .attributes
            .insert(name.to_string(), value);
    }

    /// Report `NoAttributeDefinition` unless the name is a declared formal.
    /// Templates whose formals were never declared accept anything.
    pub(crate) fn check_attribute_exists(&self, name: &str, ip: Option<usize>) {
        let inner = self.inner.borrow();
        if inner.imp.args.is_unknown() || inner.imp.args.contains(name) {
            return;
        }
        inner.group.errors().runtime_error(RuntimeError {
            template: Some(inner.imp.name.clone()),
            ip,
            kind: ErrorKind::NoAttributeDefinition(name.to_string()),
        });
    }

    /// Look up an attribute here, then up the enclosing chain. The walk
    /// stops at the first instance whose table contains the name, so an
    /// attribute explicitly set to null shadows any enclosing value.
    pub fn get_attribute(&self, name: &str) -> Option<Value> {
        let mut current = self.clone();
        loop {
            let (value, next) = {
                let inner = current.inner.borrow();
                (
                    inner.attributes.get(name).cloned(),
                    inner
                        .enclosing
                        .as_ref()
                        .and_then(Weak::upgrade)
                        .map(|inner| Template { inner }),
                )
            };
            if let Some(v) = value {
                return Some(v);
            }
            current = next?;
        }
    }

    /// Look up an attribute of this instance only; no scope walk.
    pub fn local_attribute(&self, name: &str) -> Option<Value> {
        self.inner.borrow().attributes.get(name).cloned()
    }

    pub(crate) fn set_enclosing(&self, parent: &Template) {
        self.inner.borrow_mut().enclosing = Some(Rc::downgrade(&parent.inner));
    }

    pub fn enclosing(&self) -> Option<Template> {
        self.inner
            .borrow()
            .enclosing
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Template { inner })
    }

    pub(crate) fn set_pass_through(&self, pass_through: bool) {
        self.inner.borrow_mut().pass_through = pass_through;
    }

    pub fn pass_through(&self) -> bool {
        self.inner.borrow().pass_through
    }

    /// Render to a string with a fresh interpreter and an indenting writer.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut writer = AutoIndentWriter::new(&mut out);
        Interpreter::new(self.group()).exec(&mut writer, self);
        out
    }

    /// Render through the given writer; returns the characters written.
    pub fn render_to(&self, out: &mut dyn TemplateWriter) -> usize {
        Interpreter::new(self.group()).exec(out, self)
    }

    /// Evaluation events recorded for this instance's children while the
    /// group's debug flag was set.
    pub fn events(&self) -> Vec<InterpEvent> {
        self.inner.borrow().events.clone()
    }

    pub(crate) fn clear_events(&self) {
        self.inner.borrow_mut().events.clear();
    }

    pub(crate) fn push_event(&self, event: InterpEvent) {
        self.inner.borrow_mut().events.push(event);
    }

    /// Stable identity for one instance, valid while it is alive.
    pub(crate) fn ptr_id(&self) -> usize {
        Rc::as_ptr(&self.inner) as usize
    }

    /// The call chain from the outermost instance down to this one, for
    /// traces: `[outer inner leaf]`.
    pub(crate) fn enclosing_chain_string(&self) -> String {
        let mut names = Vec::new();
        let mut current = Some(self.clone());
        while let Some(t) = current {
            names.push(t.name());
            current = t.enclosing();
        }
        names.reverse();
        format!("[{}]", names.join(" "))
    }
}

impl PartialEq for Template {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Template")
            .field("name", &inner.imp.name)
            .field("attributes", &inner.attributes.keys())
            .finish()
    }
}
