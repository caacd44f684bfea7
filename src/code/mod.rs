//! Compiled templates: instruction buffer, string constant pool and
//! formal-argument table, plus the [`CodeBuilder`] an external compiler (and
//! the test suite) uses to assemble them.

mod disasm;
pub mod ops;

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::group::Group;

/// The name given to templates that have none.
pub const UNKNOWN_NAME: &str = "anonymous";

/// An immutable compiled template.
pub struct CompiledTemplate {
    pub(crate) name: String,
    pub(crate) instrs: Vec<u8>,
    pub(crate) strings: Vec<String>,
    pub(crate) args: FormalArgs,
    /// The group this template was defined in; render-time lookups may run
    /// against a different group.
    pub(crate) native_group: RefCell<Weak<Group>>,
}

impl CompiledTemplate {
    pub(crate) fn anonymous() -> Self {
        Self {
            name: UNKNOWN_NAME.to_string(),
            instrs: Vec::new(),
            strings: Vec::new(),
            args: FormalArgs::Unknown,
            native_group: RefCell::new(Weak::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code_size(&self) -> usize {
        self.instrs.len()
    }

    pub fn args(&self) -> &FormalArgs {
        &self.args
    }

    pub fn native_group(&self) -> Option<Rc<Group>> {
        self.native_group.borrow().upgrade()
    }

    /// The full disassembly, one instruction per line.
    pub fn dump(&self) -> String {
        disasm::disassemble(self)
    }

    /// Disassemble the instruction at `ip`; returns the text and the address
    /// of the next instruction.
    pub fn disassemble_instruction(&self, ip: usize) -> (String, usize) {
        disasm::disassemble_instruction(self, ip)
    }
}

impl fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<compiled {}>", self.name)
    }
}

/// The formal-argument table of a template.
///
/// `Unknown` marks templates whose arguments were never declared (anonymous
/// sub-templates, hand-assembled code); the null-against-formals check is
/// skipped for them. `Defined` preserves declaration order, which is the
/// positional order parallel maps bind by.
#[derive(Debug, Default)]
pub enum FormalArgs {
    #[default]
    Unknown,
    Defined(IndexMap<String, FormalArgument>),
}

impl FormalArgs {
    pub fn is_unknown(&self) -> bool {
        matches!(self, FormalArgs::Unknown)
    }

    pub fn len(&self) -> usize {
        match self {
            FormalArgs::Unknown => 0,
            FormalArgs::Defined(args) => args.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, name: &str) -> Option<&FormalArgument> {
        match self {
            FormalArgs::Unknown => None,
            FormalArgs::Defined(args) => args.get(name),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Argument names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            FormalArgs::Unknown => Vec::new(),
            FormalArgs::Defined(args) => args.keys().map(String::as_str).collect(),
        }
    }

    pub fn values(&self) -> impl Iterator<Item = &FormalArgument> {
        match self {
            FormalArgs::Unknown => None,
            FormalArgs::Defined(args) => Some(args.values()),
        }
        .into_iter()
        .flatten()
    }
}

/// A declared template argument, possibly with a compiled default value.
#[derive(Debug, Clone)]
pub struct FormalArgument {
    pub name: String,
    pub default: Option<Rc<CompiledTemplate>>,
    /// The raw source of the default value; `{<(...)>}`-shaped defaults are
    /// evaluated eagerly to strings when injected.
    pub default_source: Option<String>,
}

/// Assembles a [`CompiledTemplate`].
///
/// # Examples
///
/// ```
/// use weft::{ops, CodeBuilder};
///
/// let mut b = CodeBuilder::new("hello");
/// b.arg("name");
/// b.emit_str(ops::LOAD_STR, "Hello, ");
/// b.emit(ops::WRITE);
/// b.emit_str(ops::LOAD_ATTR, "name");
/// b.emit(ops::WRITE);
/// let compiled = b.build();
/// assert_eq!(compiled.name(), "hello");
/// ```
#[derive(Debug)]
pub struct CodeBuilder {
    name: String,
    instrs: Vec<u8>,
    strings: Vec<String>,
    args: Option<IndexMap<String, FormalArgument>>,
}

impl CodeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instrs: Vec::new(),
            strings: Vec::new(),
            args: None,
        }
    }

    /// Declare a formal argument. Declaration order is significant.
    pub fn arg(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        self.args.get_or_insert_with(IndexMap::new).insert(
            name.clone(),
            FormalArgument {
                name,
                default: None,
                default_source: None,
            },
        );
        self
    }

    /// Declare a formal argument with a compiled default value.
    pub fn arg_with_default(
        &mut self,
        name: impl Into<String>,
        default: Rc<CompiledTemplate>,
        source: impl Into<String>,
    ) -> &mut Self {
        let name = name.into();
        self.args.get_or_insert_with(IndexMap::new).insert(
            name.clone(),
            FormalArgument {
                name,
                default: Some(default),
                default_source: Some(source.into()),
            },
        );
        self
    }

    /// Intern a string into the constant pool and return its index.
    pub fn intern(&mut self, s: &str) -> u16 {
        if let Some(i) = self.strings.iter().position(|x| x == s) {
            return i as u16;
        }
        self.strings.push(s.to_string());
        (self.strings.len() - 1) as u16
    }

    /// Emit an instruction with no operands.
    pub fn emit(&mut self, op: u8) {
        self.instrs.push(op);
    }

    /// Emit an instruction with one short operand; returns the operand's byte
    /// offset so branch targets can be patched later.
    pub fn emit1(&mut self, op: u8, operand: u16) -> usize {
        self.instrs.push(op);
        let at = self.instrs.len();
        self.instrs.extend_from_slice(&operand.to_be_bytes());
        at
    }

    /// Emit an instruction whose operand is an interned pool string.
    pub fn emit_str(&mut self, op: u8, s: &str) -> usize {
        let i = self.intern(s);
        self.emit1(op, i)
    }

    /// Overwrite a previously emitted short operand.
    pub fn patch(&mut self, at: usize, addr: u16) {
        self.instrs[at..at + 2].copy_from_slice(&addr.to_be_bytes());
    }

    /// The address the next instruction will be emitted at.
    pub fn here(&self) -> u16 {
        self.instrs.len() as u16
    }

    pub fn build(self) -> CompiledTemplate {
        CompiledTemplate {
            name: self.name,
            instrs: self.instrs,
            strings: self.strings,
            args: match self.args {
                None => FormalArgs::Unknown,
                Some(args) => FormalArgs::Defined(args),
            },
            native_group: RefCell::new(Weak::new()),
        }
    }
}
