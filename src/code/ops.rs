//! The instruction set.
//!
//! Each instruction is a one-byte opcode followed by zero or more 2-byte
//! big-endian unsigned operands. String-pool indices, branch targets and map
//! counts are all shorts.

/// Push a pool string.
pub const LOAD_STR: u8 = 1;
/// Look up an attribute through the enclosing-scope chain and push it.
pub const LOAD_ATTR: u8 = 2;
/// Push an attribute of the current template only; no scope walk.
pub const LOAD_LOCAL: u8 = 3;
/// Pop a receiver, push the named property of it.
pub const LOAD_PROP: u8 = 4;
/// Pop a property name then a receiver, push the property.
pub const LOAD_PROP_IND: u8 = 5;
/// Instantiate the named template and push it.
pub const NEW: u8 = 6;
/// Pop a template name, instantiate it and push it.
pub const NEW_IND: u8 = 7;
/// Instantiate the named template from the defining group's imports.
pub const SUPER_NEW: u8 = 8;
/// Pop a value, store it as a named attribute of the template on top.
pub const STORE_ATTR: u8 = 9;
/// Pop a value, store it as the sole argument of the template on top.
pub const STORE_SOLE_ARG: u8 = 10;
/// Mark the template on top as passing unresolved references outward.
pub const SET_PASS_THRU: u8 = 11;
/// Pop a value into the given slot of the options array on top.
pub const STORE_OPTION: u8 = 12;
/// Pop a value and write it without options.
pub const WRITE: u8 = 13;
/// Pop an options array then a value and write the value with the options.
pub const WRITE_OPT: u8 = 14;
/// Pop a template name then an attribute, push the mapped result.
pub const MAP: u8 = 15;
/// Pop n template names then an attribute, push the rotating-map result.
pub const ROT_MAP: u8 = 16;
/// Pop a template name then n expressions, push the parallel-map result.
pub const PAR_MAP: u8 = 17;
/// Unconditional branch.
pub const BR: u8 = 18;
/// Pop a value, branch if it is not truthy.
pub const BRF: u8 = 19;
/// Push a fresh options array, all slots empty.
pub const OPTIONS: u8 = 20;
/// Push an empty sequence.
pub const LIST: u8 = 21;
/// Pop a value and append it to the sequence on top; iterables spread.
pub const ADD: u8 = 22;
/// Replace the top of stack with its string rendering.
pub const TOSTR: u8 = 23;
pub const FIRST: u8 = 24;
pub const LAST: u8 = 25;
pub const REST: u8 = 26;
pub const TRUNC: u8 = 27;
pub const STRIP: u8 = 28;
pub const REVERSE: u8 = 29;
pub const LENGTH: u8 = 30;
/// Trim the string on top; non-strings are reported and left unchanged.
pub const TRIM: u8 = 31;
/// Replace the string on top with its length; non-strings push 0.
pub const STRLEN: u8 = 32;
pub const NOT: u8 = 33;
pub const OR: u8 = 34;
pub const AND: u8 = 35;
/// Push the given pool string onto the writer's indentation stack.
pub const INDENT: u8 = 36;
pub const DEDENT: u8 = 37;
/// Emit a platform newline if the current line produced output.
pub const NEWLINE: u8 = 38;
pub const NOOP: u8 = 39;
pub const POP: u8 = 40;

/// Positional slots of an options array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOption {
    Anchor = 0,
    Format = 1,
    Null = 2,
    Separator = 3,
    Wrap = 4,
}

/// The fixed length of an options array.
pub const NUM_OPTIONS: usize = 5;

impl RenderOption {
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// How an operand should be decoded and displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// An index into the string constant pool.
    StrIndex,
    /// An absolute branch target.
    Addr,
    /// A plain count (map arity, option slot).
    Count,
}

/// Static description of one opcode.
#[derive(Debug, Clone, Copy)]
pub struct OpInfo {
    pub name: &'static str,
    pub operands: &'static [Operand],
}

/// Metadata for an opcode, or `None` if the byte is not an instruction.
pub fn info(op: u8) -> Option<OpInfo> {
    use Operand::*;
    let (name, operands): (&'static str, &'static [Operand]) = match op {
        LOAD_STR => ("load_str", &[StrIndex]),
        LOAD_ATTR => ("load_attr", &[StrIndex]),
        LOAD_LOCAL => ("load_local", &[StrIndex]),
        LOAD_PROP => ("load_prop", &[StrIndex]),
        LOAD_PROP_IND => ("load_prop_ind", &[]),
        NEW => ("new", &[StrIndex]),
        NEW_IND => ("new_ind", &[]),
        SUPER_NEW => ("super_new", &[StrIndex]),
        STORE_ATTR => ("store_attr", &[StrIndex]),
        STORE_SOLE_ARG => ("store_sole_arg", &[]),
        SET_PASS_THRU => ("set_pass_thru", &[]),
        STORE_OPTION => ("store_option", &[Count]),
        WRITE => ("write", &[]),
        WRITE_OPT => ("write_opt", &[]),
        MAP => ("map", &[]),
        ROT_MAP => ("rot_map", &[Count]),
        PAR_MAP => ("par_map", &[Count]),
        BR => ("br", &[Addr]),
        BRF => ("brf", &[Addr]),
        OPTIONS => ("options", &[]),
        LIST => ("list", &[]),
        ADD => ("add", &[]),
        TOSTR => ("tostr", &[]),
        FIRST => ("first", &[]),
        LAST => ("last", &[]),
        REST => ("rest", &[]),
        TRUNC => ("trunc", &[]),
        STRIP => ("strip", &[]),
        REVERSE => ("reverse", &[]),
        LENGTH => ("length", &[]),
        TRIM => ("trim", &[]),
        STRLEN => ("strlen", &[]),
        NOT => ("not", &[]),
        OR => ("or", &[]),
        AND => ("and", &[]),
        INDENT => ("indent", &[StrIndex]),
        DEDENT => ("dedent", &[]),
        NEWLINE => ("newline", &[]),
        NOOP => ("noop", &[]),
        POP => ("pop", &[]),
        _ => return None,
    };
    Some(OpInfo { name, operands })
}

/// Decode a big-endian unsigned short at `at`.
#[inline]
pub(crate) fn get_u16(code: &[u8], at: usize) -> usize {
    ((code[at] as usize) << 8) | code[at + 1] as usize
}
