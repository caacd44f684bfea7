//! The interpreter: a stack-based dispatcher over a template's instruction
//! buffer, plus the render engine that writes values through the writer.
//!
//! One interpreter services one render request. Runtime faults never
//! propagate out of [`exec`][Interpreter::exec] as errors; they are reported
//! to the group's error sink and execution continues with a sentinel.

mod map;
pub(crate) mod ops;
mod props;
pub(crate) mod stack;

use std::collections::HashSet;
use std::fmt::Write as _;
use std::rc::Rc;

use crate::code::ops::{self as bc, get_u16, RenderOption, NUM_OPTIONS};
use crate::debug::{EvalTemplateEvent, InterpEvent};
use crate::error::{ErrorKind, RuntimeError};
use crate::group::Group;
use crate::interp::stack::OperandStack;
use crate::template::Template;
use crate::value::Value;
use crate::writer::{NoIndentWriter, TemplateWriter, NEWLINE};

/// Pre-rendered option strings, indexed by [`RenderOption`].
type Options = [Option<String>; NUM_OPTIONS];

/// Executes template bytecode against a group.
pub struct Interpreter {
    pub(crate) group: Rc<Group>,
    locale: String,
    pub(crate) operands: OperandStack,
    /// Address of the opcode currently executing, for diagnostics.
    pub(crate) current_ip: usize,
    /// Characters written on the current output line.
    nwline: usize,
    /// Log each instruction as it executes.
    pub trace: bool,
    events: Vec<InterpEvent>,
    execute_trace: Vec<String>,
    /// Instances whose stale event lists were already cleared this run.
    events_initialized: HashSet<usize>,
}

impl Interpreter {
    pub fn new(group: Rc<Group>) -> Self {
        Self::with_locale(group, "en")
    }

    /// An interpreter whose attribute renderers see the given locale tag.
    pub fn with_locale(group: Rc<Group>, locale: impl Into<String>) -> Self {
        Self {
            group,
            locale: locale.into(),
            operands: OperandStack::new(),
            current_ip: 0,
            nwline: 0,
            trace: false,
            events: Vec::new(),
            execute_trace: Vec::new(),
            events_initialized: HashSet::new(),
        }
    }

    /// Events collected across this interpreter's exec calls (debug only).
    pub fn events(&self) -> &[InterpEvent] {
        &self.events
    }

    /// One line per executed instruction (debug only).
    pub fn execution_trace(&self) -> &[String] {
        &self.execute_trace
    }

    /// Execute `self_t`'s instructions, writing to `out`; returns how many
    /// characters this frame wrote.
    pub fn exec(&mut self, out: &mut dyn TemplateWriter, self_t: &Template) -> usize {
        let start = out.index();
        let mut prev_opcode: u8 = 0;
        let mut n = 0usize;
        let imp = self_t.compiled();
        let code = &imp.instrs;
        let debug = self.group.debug();
        let mut ip = 0usize;
        while ip < imp.code_size() {
            if self.trace || debug {
                self.trace_instr(self_t, ip);
            }
            let opcode = code[ip];
            self.current_ip = ip;
            ip += 1;
            match opcode {
                bc::LOAD_STR => {
                    let i = get_u16(code, ip);
                    ip += 2;
                    self.operands.push(Value::Str(imp.strings[i].clone()));
                }

                bc::LOAD_ATTR => {
                    let i = get_u16(code, ip);
                    ip += 2;
                    let name = &imp.strings[i];
                    // A name stored as an explicit null resolves to null
                    // here; the formals check applies either way.
                    let value = self_t.get_attribute(name).unwrap_or(Value::Null);
                    if value.is_null() {
                        self.check_null_attribute_against_formals(self_t, name);
                    }
                    self.operands.push(value);
                }

                bc::LOAD_LOCAL => {
                    let i = get_u16(code, ip);
                    ip += 2;
                    let value = self_t.local_attribute(&imp.strings[i]);
                    self.operands.push(value.unwrap_or(Value::Null));
                }

                bc::LOAD_PROP => {
                    let i = get_u16(code, ip);
                    ip += 2;
                    let receiver = self.operands.pop();
                    let property = Value::Str(imp.strings[i].clone());
                    let value = self.get_object_property(self_t, receiver, property);
                    self.operands.push(value);
                }

                bc::LOAD_PROP_IND => {
                    let property = self.operands.pop();
                    let receiver = self.operands.pop();
                    let value = self.get_object_property(self_t, receiver, property);
                    self.operands.push(value);
                }

                bc::NEW => {
                    let i = get_u16(code, ip);
                    ip += 2;
                    let name = &imp.strings[i];
                    let st = self.embedded_instance(self_t, name);
                    self.operands.push(Value::Template(st));
                }

                bc::NEW_IND => {
                    let name = self.pop_string();
                    let st = self.embedded_instance(self_t, &name);
                    self.operands.push(Value::Template(st));
                }

                bc::SUPER_NEW => {
                    let i = get_u16(code, ip);
                    ip += 2;
                    let name = &imp.strings[i];
                    // super.foo resolves against the imports of the group
                    // where self_t was defined, not the render-time group.
                    let imported = imp
                        .native_group()
                        .and_then(|g| g.lookup_imported_template(name));
                    let st = match imported {
                        Some(compiled) => self.group.create_string_template(compiled),
                        None => {
                            self.report(self_t, ErrorKind::NoImportedTemplate(name.clone()));
                            self.group.blank()
                        }
                    };
                    self.operands.push(Value::Template(st));
                }

                bc::STORE_ATTR => {
                    let i = get_u16(code, ip);
                    ip += 2;
                    let name = &imp.strings[i];
                    let value = self.operands.pop();
                    let st = self.peek_template();
                    st.check_attribute_exists(name, Some(self.current_ip));
                    st.raw_set(name, value);
                }

                bc::STORE_SOLE_ARG => {
                    let value = self.operands.pop();
                    let st = self.peek_template();
                    self.set_sole_argument(self_t, &st, value);
                }

                bc::SET_PASS_THRU => {
                    self.peek_template().set_pass_through(true);
                }

                bc::STORE_OPTION => {
                    let k = get_u16(code, ip);
                    ip += 2;
                    let value = self.operands.pop();
                    match self.operands.peek_mut() {
                        Value::List(slots) if slots.len() == NUM_OPTIONS => slots[k] = value,
                        _ => panic!("expected options array on operand stack"),
                    }
                }

                bc::WRITE => {
                    let value = self.operands.pop();
                    let n1 = self.write_object_no_options(out, self_t, value);
                    n += n1;
                    self.nwline += n1;
                }

                bc::WRITE_OPT => {
                    let options = self.operands.pop();
                    let value = self.operands.pop();
                    let n2 = self.write_object_with_options(out, self_t, value, options);
                    n += n2;
                    self.nwline += n2;
                }

                bc::MAP => {
                    let name = self.pop_string();
                    let attr = self.operands.pop();
                    self.map(self_t, attr, name);
                }

                bc::ROT_MAP => {
                    let nmaps = get_u16(code, ip);
                    ip += 2;
                    let mut names = Vec::with_capacity(nmaps);
                    for _ in 0..nmaps {
                        names.push(self.pop_string());
                    }
                    names.reverse();
                    let attr = self.operands.pop();
                    self.rot_map(self_t, attr, names);
                }

                bc::PAR_MAP => {
                    let name = self.pop_string();
                    let nmaps = get_u16(code, ip);
                    ip += 2;
                    let mut exprs = Vec::with_capacity(nmaps);
                    for _ in 0..nmaps {
                        exprs.push(self.operands.pop());
                    }
                    exprs.reverse();
                    let result = self.par_map(self_t, exprs, name);
                    self.operands.push(result);
                }

                bc::BR => {
                    ip = get_u16(code, ip);
                }

                bc::BRF => {
                    let addr = get_u16(code, ip);
                    ip += 2;
                    let value = self.operands.pop();
                    if !ops::test_truthy(&value) {
                        ip = addr;
                    }
                }

                bc::OPTIONS => {
                    self.operands.push(Value::List(vec![Value::Null; NUM_OPTIONS]));
                }

                bc::LIST => {
                    self.operands.push(Value::List(Vec::new()));
                }

                bc::ADD => {
                    let value = self.operands.pop();
                    match self.operands.peek_mut() {
                        Value::List(list) => ops::add_to_list(list, value),
                        _ => panic!("expected list on operand stack"),
                    }
                }

                bc::TOSTR => {
                    let value = self.operands.pop();
                    let s = self.to_display(self_t, value);
                    self.operands.push(s.map(Value::Str).unwrap_or(Value::Null));
                }

                bc::FIRST => {
                    let value = self.operands.pop();
                    self.operands.push(ops::first(value));
                }

                bc::LAST => {
                    let value = self.operands.pop();
                    self.operands.push(ops::last(value));
                }

                bc::REST => {
                    let value = self.operands.pop();
                    self.operands.push(ops::rest(value));
                }

                bc::TRUNC => {
                    let value = self.operands.pop();
                    self.operands.push(ops::trunc(value));
                }

                bc::STRIP => {
                    let value = self.operands.pop();
                    self.operands.push(ops::strip(value));
                }

                bc::REVERSE => {
                    let value = self.operands.pop();
                    self.operands.push(ops::reverse(value));
                }

                bc::LENGTH => {
                    let value = self.operands.pop();
                    self.operands.push(ops::length(value));
                }

                bc::TRIM => {
                    let value = self.operands.pop();
                    match value {
                        Value::Str(s) => self.operands.push(Value::Str(s.trim().to_string())),
                        value => {
                            self.report(
                                self_t,
                                ErrorKind::ExpectingString {
                                    op: "trim",
                                    actual: value.kind().name(),
                                },
                            );
                            self.operands.push(value);
                        }
                    }
                }

                bc::STRLEN => {
                    let value = self.operands.pop();
                    match value {
                        Value::Str(s) => {
                            self.operands.push(Value::Int(s.chars().count() as i64));
                        }
                        value => {
                            self.report(
                                self_t,
                                ErrorKind::ExpectingString {
                                    op: "strlen",
                                    actual: value.kind().name(),
                                },
                            );
                            self.operands.push(Value::Int(0));
                        }
                    }
                }

                bc::NOT => {
                    let value = self.operands.pop();
                    self.operands.push(Value::Bool(!ops::test_truthy(&value)));
                }

                bc::OR => {
                    let right = self.operands.pop();
                    let left = self.operands.pop();
                    self.operands
                        .push(Value::Bool(ops::test_truthy(&left) || ops::test_truthy(&right)));
                }

                bc::AND => {
                    let right = self.operands.pop();
                    let left = self.operands.pop();
                    self.operands
                        .push(Value::Bool(ops::test_truthy(&left) && ops::test_truthy(&right)));
                }

                bc::INDENT => {
                    let i = get_u16(code, ip);
                    ip += 2;
                    out.push_indentation(imp.strings[i].clone());
                }

                bc::DEDENT => {
                    out.pop_indentation();
                }

                bc::NEWLINE => {
                    if prev_opcode == bc::NEWLINE || prev_opcode == bc::INDENT || self.nwline > 0 {
                        // The newline itself is not charged to this frame.
                        if out.write(NEWLINE).is_err() {
                            self.io_report(self_t);
                        }
                    }
                    self.nwline = 0;
                }

                bc::NOOP => {}

                bc::POP => {
                    let _ = self.operands.pop();
                }

                _ => {
                    self.report(
                        self_t,
                        ErrorKind::InternalError(format!(
                            "invalid bytecode @ {}: {opcode}",
                            ip - 1
                        )),
                    );
                    tracing::error!(target: "weft::interp", "\n{}", imp.dump());
                    return n;
                }
            }
            prev_opcode = opcode;
        }

        if debug {
            let stop = out.index().saturating_sub(1);
            let event = EvalTemplateEvent {
                template: self_t.clone(),
                start,
                stop,
            };
            self.events.push(InterpEvent::EvalTemplate(event.clone()));
            if let Some(parent) = self_t.enclosing() {
                // First time we touch a parent this run, wipe events left
                // over from a previous render.
                if self.events_initialized.insert(parent.ptr_id()) {
                    parent.clear_events();
                }
                parent.push_event(InterpEvent::EvalTemplate(event));
            }
        }
        n
    }

    /// Write an expression result that carries no options, e.g. `<name>`.
    pub(crate) fn write_object_no_options(
        &mut self,
        out: &mut dyn TemplateWriter,
        self_t: &Template,
        value: Value,
    ) -> usize {
        self.write_object(out, self_t, value, None)
    }

    /// Write an expression result with options, e.g.
    /// `<names; separator=", ">`. Option values are pre-rendered to strings;
    /// the anchor option brackets the write with an anchor push/pop.
    pub(crate) fn write_object_with_options(
        &mut self,
        out: &mut dyn TemplateWriter,
        self_t: &Template,
        value: Value,
        options: Value,
    ) -> usize {
        let Value::List(slots) = options else {
            panic!("expected options array on operand stack");
        };
        let mut rendered: Options = Default::default();
        for (i, slot) in slots.into_iter().enumerate().take(NUM_OPTIONS) {
            rendered[i] = self.to_display(self_t, slot);
        }

        let anchored = rendered[RenderOption::Anchor.index()].is_some();
        if anchored {
            out.push_anchor_point();
        }
        let n = self.write_object(out, self_t, value, Some(&rendered));
        if anchored {
            out.pop_anchor_point();
        }
        n
    }

    /// Emit text for a value, differentiating templates, iterables and
    /// everything else.
    fn write_object(
        &mut self,
        out: &mut dyn TemplateWriter,
        self_t: &Template,
        value: Value,
        options: Option<&Options>,
    ) -> usize {
        let value = if value.is_null() {
            match options.and_then(|o| o[RenderOption::Null.index()].clone()) {
                Some(substitute) => Value::Str(substitute),
                None => return 0,
            }
        } else {
            value
        };

        if let Value::Template(st) = value {
            st.set_enclosing(self_t);
            self.set_default_arguments(&st);
            if let Some(wrap) = options.and_then(|o| o[RenderOption::Wrap.index()].as_deref()) {
                // The writer may queue a line break before the template's
                // first output.
                if out.write_wrap(wrap).is_err() {
                    self.io_report(self_t);
                }
            }
            return self.exec(out, &st);
        }

        let result = match ops::normalize_to_iterator(value) {
            Value::Iter(it) => self.write_iterator(out, self_t, it, options),
            value => self.write_pojo(out, value, options),
        };
        match result {
            Ok(n) => n,
            Err(_) => {
                self.io_report(self_t);
                0
            }
        }
    }

    /// Write the elements of an iterator, separating values that produced
    /// output. A null element with no null-substitute neither renders nor
    /// causes a separator.
    fn write_iterator(
        &mut self,
        out: &mut dyn TemplateWriter,
        self_t: &Template,
        it: crate::value::IterValue,
        options: Option<&Options>,
    ) -> Result<usize, std::fmt::Error> {
        let mut n = 0;
        let separator = options.and_then(|o| o[RenderOption::Separator.index()].as_deref());
        let has_null_substitute =
            options.is_some_and(|o| o[RenderOption::Null.index()].is_some());
        let mut seen_a_value = false;
        while let Some(value) = it.next() {
            if seen_a_value && (!value.is_null() || has_null_substitute) {
                if let Some(sep) = separator {
                    n += out.write_separator(sep)?;
                }
            }
            let nw = self.write_object(out, self_t, value, options);
            if nw > 0 {
                seen_a_value = true;
            }
            n += nw;
        }
        Ok(n)
    }

    /// Write a plain value through its registered renderer, or its natural
    /// string form.
    fn write_pojo(
        &mut self,
        out: &mut dyn TemplateWriter,
        value: Value,
        options: Option<&Options>,
    ) -> Result<usize, std::fmt::Error> {
        let format = options.and_then(|o| o[RenderOption::Format.index()].as_deref());
        let text = match self.group.attribute_renderer(value.kind()) {
            Some(renderer) => renderer.render(&value, format, &self.locale),
            None => value.to_string(),
        };
        match options.and_then(|o| o[RenderOption::Wrap.index()].as_deref()) {
            Some(wrap) => out.write_wrapped(&text, wrap),
            None => out.write(&text),
        }
    }

    /// Bind an unnamed value: to the single declared formal, or to `it` when
    /// none are declared. Multiple formals are reported and the first wins.
    pub(crate) fn set_sole_argument(&mut self, self_t: &Template, st: &Template, value: Value) {
        let imp = st.compiled();
        let nargs = imp.args().len();
        let name = if nargs > 0 {
            if nargs != 1 {
                self.report(
                    self_t,
                    ErrorKind::ExpectingSingleArgument {
                        template: st.name(),
                        arity: nargs,
                    },
                );
            }
            imp.args().names()[0].to_string()
        } else {
            "it".to_string()
        };
        st.raw_set(&name, value);
    }

    /// Inject default values for formals the invocation left unset. Defaults
    /// evaluate in the invoked template's own scope; `{<(...)>}`-shaped
    /// defaults are rendered to strings eagerly, the rest bind lazily as
    /// sub-templates.
    pub(crate) fn set_default_arguments(&mut self, invoked: &Template) {
        let imp = invoked.compiled();
        let defaults: Vec<_> = imp
            .args()
            .values()
            .filter(|arg| arg.default.is_some())
            .cloned()
            .collect();
        for arg in defaults {
            let Some(default) = arg.default else { continue };
            let unset = matches!(invoked.local_attribute(&arg.name), None | Some(Value::Null));
            if !unset {
                continue;
            }
            let default_st = self.group.create_string_template(default);
            let raw = arg.default_source.as_deref().unwrap_or("");
            if raw.starts_with("{<(") && raw.ends_with(")>}") {
                let rendered = self.to_display(invoked, Value::Template(default_st));
                invoked.raw_set(&arg.name, rendered.map(Value::Str).unwrap_or(Value::Null));
            } else {
                invoked.raw_set(&arg.name, Value::Template(default_st));
            }
        }
    }

    /// A null attribute reference is fine if some enclosing template declares
    /// the name as a formal; otherwise it is a dangling reference.
    fn check_null_attribute_against_formals(&mut self, self_t: &Template, name: &str) {
        if self_t.compiled().args().is_unknown() {
            return;
        }
        let mut current = Some(self_t.clone());
        while let Some(t) = current {
            if t.compiled().args().contains(name) {
                return;
            }
            current = t.enclosing();
        }
        self.report(self_t, ErrorKind::NoAttributeDefinition(name.to_string()));
    }

    /// Render a value to a string: strings pass through, templates and other
    /// values render through a non-indenting writer, null converts to none.
    pub(crate) fn to_display(&mut self, self_t: &Template, value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::Str(s) => Some(s),
            value => {
                let mut buf = String::new();
                let mut writer = NoIndentWriter::new(&mut buf);
                self.write_object_no_options(&mut writer, self_t, value);
                Some(buf)
            }
        }
    }

    fn embedded_instance(&mut self, self_t: &Template, name: &str) -> Template {
        match self.group.get_embedded_instance_of(self_t, name) {
            Some(st) => st,
            None => {
                self.report(self_t, ErrorKind::NoSuchTemplate(name.to_string()));
                self.group.blank()
            }
        }
    }

    fn peek_template(&mut self) -> Template {
        match self.operands.peek() {
            Value::Template(st) => st.clone(),
            _ => panic!("expected template on operand stack"),
        }
    }

    fn pop_string(&mut self) -> String {
        match self.operands.pop() {
            Value::Str(s) => s,
            value => value.to_string(),
        }
    }

    pub(crate) fn report(&self, self_t: &Template, kind: ErrorKind) {
        self.group.errors().runtime_error(RuntimeError {
            template: Some(self_t.name()),
            ip: Some(self.current_ip),
            kind,
        });
    }

    fn io_report(&self, self_t: &Template) {
        self.group.errors().runtime_error(RuntimeError {
            template: Some(self_t.name()),
            ip: None,
            kind: ErrorKind::WriteIoError,
        });
    }

    fn trace_instr(&mut self, self_t: &Template, ip: usize) {
        let imp = self_t.compiled();
        let (dis, _) = imp.disassemble_instruction(ip);
        let prefix = if imp.name() == crate::code::UNKNOWN_NAME {
            String::new()
        } else {
            format!("{}:", imp.name())
        };
        let mut line = format!("{:<40}", format!("{prefix}{dis}"));
        line.push_str("\tstack=[");
        for value in self.operands.iter() {
            print_for_trace(&mut line, value);
        }
        line.push_str(" ], calls=");
        line.push_str(&self_t.enclosing_chain_string());
        let _ = write!(
            line,
            ", sp={}, nw={}",
            self.operands.len() as isize - 1,
            self.nwline
        );
        tracing::trace!(target: "weft::interp", "{line}");
        if self.group.debug() {
            self.execute_trace.push(line);
        }
    }
}

fn print_for_trace(buf: &mut String, value: &Value) {
    match value {
        Value::Null => buf.push_str(" null"),
        Value::Template(st) => {
            let _ = write!(buf, " {}()", st.name());
        }
        Value::List(items) => {
            buf.push_str(" [");
            for item in items {
                print_for_trace(buf, item);
            }
            buf.push_str(" ]");
        }
        Value::Iter(it) => {
            buf.push_str(" [");
            for item in it.snapshot() {
                print_for_trace(buf, &item);
            }
            buf.push_str(" ]");
        }
        value => {
            let _ = write!(buf, " {value}");
        }
    }
}
