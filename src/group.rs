//! A group is a namespace of templates: compiled definitions, imported
//! groups, attribute renderers and the error sink renders report to.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::code::CompiledTemplate;
use crate::error::{ErrorSink, LoggingErrorSink};
use crate::template::Template;
use crate::value::{Value, ValueKind};

/// Dictionary values equal to this sentinel resolve to the looked-up key.
pub const DICT_KEY: &str = "key";
/// The entry a dictionary falls back to when a key is missing.
pub const DEFAULT_KEY: &str = "default";

/// Renders values of one [`ValueKind`], optionally honoring a format string
/// and the render locale.
pub trait AttributeRenderer {
    fn render(&self, value: &Value, format: Option<&str>, locale: &str) -> String;
}

/// A namespace of templates with shared renderers and imports.
pub struct Group {
    /// Self-handle; instances hold their creating group by `Rc`.
    me: Weak<Group>,
    templates: RefCell<HashMap<String, Rc<CompiledTemplate>>>,
    imports: RefCell<Vec<Rc<Group>>>,
    renderers: RefCell<HashMap<ValueKind, Rc<dyn AttributeRenderer>>>,
    errors: RefCell<Rc<dyn ErrorSink>>,
    debug: Cell<bool>,
}

impl Group {
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            me: me.clone(),
            templates: RefCell::new(HashMap::new()),
            imports: RefCell::new(Vec::new()),
            renderers: RefCell::new(HashMap::new()),
            errors: RefCell::new(Rc::new(LoggingErrorSink)),
            debug: Cell::new(false),
        })
    }

    fn rc(&self) -> Rc<Group> {
        // A live &self implies a live strong count.
        self.me.upgrade().expect("group handle outlived its Rc")
    }

    /// Register a compiled template, stamping this group as its native group.
    pub fn define(&self, compiled: CompiledTemplate) -> Rc<CompiledTemplate> {
        let compiled = Rc::new(compiled);
        *compiled.native_group.borrow_mut() = self.me.clone();
        self.templates
            .borrow_mut()
            .insert(compiled.name.clone(), Rc::clone(&compiled));
        compiled
    }

    /// Add a group to search when `super`-style references miss here.
    pub fn import(&self, group: Rc<Group>) {
        self.imports.borrow_mut().push(group);
    }

    /// Find a compiled template here or in any imported group.
    pub fn lookup_template(&self, name: &str) -> Option<Rc<CompiledTemplate>> {
        if let Some(compiled) = self.templates.borrow().get(name) {
            return Some(Rc::clone(compiled));
        }
        self.lookup_imported_template(name)
    }

    /// Find a compiled template in the imported groups only.
    pub fn lookup_imported_template(&self, name: &str) -> Option<Rc<CompiledTemplate>> {
        self.imports
            .borrow()
            .iter()
            .find_map(|group| group.lookup_template(name))
    }

    /// Instantiate a registered template.
    pub fn get_instance_of(&self, name: &str) -> Option<Template> {
        let compiled = self.lookup_template(name)?;
        Some(Template::new(compiled, self.rc()))
    }

    /// Instantiate a registered template as a child of `caller`. Misses are
    /// reported by the caller, which substitutes a blank.
    pub fn get_embedded_instance_of(&self, caller: &Template, name: &str) -> Option<Template> {
        let st = self.get_instance_of(name)?;
        st.set_enclosing(caller);
        Some(st)
    }

    /// Instantiate an already compiled template in this group's context.
    pub fn create_string_template(&self, compiled: Rc<CompiledTemplate>) -> Template {
        Template::new(compiled, self.rc())
    }

    /// A nameless template that renders nothing; the sentinel substituted
    /// when a lookup misses.
    pub fn blank(&self) -> Template {
        Template::new(Rc::new(CompiledTemplate::anonymous()), self.rc())
    }

    pub fn register_renderer(&self, kind: ValueKind, renderer: Rc<dyn AttributeRenderer>) {
        self.renderers.borrow_mut().insert(kind, renderer);
    }

    pub fn attribute_renderer(&self, kind: ValueKind) -> Option<Rc<dyn AttributeRenderer>> {
        self.renderers.borrow().get(&kind).cloned()
    }

    pub fn set_error_sink(&self, sink: Rc<dyn ErrorSink>) {
        *self.errors.borrow_mut() = sink;
    }

    pub fn errors(&self) -> Rc<dyn ErrorSink> {
        Rc::clone(&self.errors.borrow())
    }

    /// Collect interpreter events and execution traces while rendering.
    pub fn set_debug(&self, debug: bool) {
        self.debug.set(debug);
    }

    pub fn debug(&self) -> bool {
        self.debug.get()
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("templates", &self.templates.borrow().keys())
            .field("imports", &self.imports.borrow().len())
            .field("debug", &self.debug.get())
            .finish()
    }
}
