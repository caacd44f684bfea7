use std::rc::Rc;

use weft::{
    ops, AutoIndentWriter, CodeBuilder, CollectingErrorSink, ErrorKind, ErrorSink, Group,
    RenderOption, Value,
};

fn collect_errors(group: &Rc<Group>) -> Rc<CollectingErrorSink> {
    let sink = Rc::new(CollectingErrorSink::new());
    group.set_error_sink(Rc::clone(&sink) as Rc<dyn ErrorSink>);
    sink
}

#[test]
fn simple_reference_renders_and_counts_chars() {
    let group = Group::new();
    let mut b = CodeBuilder::new("hello");
    b.arg("name");
    b.emit_str(ops::LOAD_STR, "Hello, ");
    b.emit(ops::WRITE);
    b.emit_str(ops::LOAD_ATTR, "name");
    b.emit(ops::WRITE);
    b.emit_str(ops::LOAD_STR, "!");
    b.emit(ops::WRITE);
    group.define(b.build());

    let template = group.get_instance_of("hello").unwrap();
    template.set("name", "World");

    let mut out = String::new();
    let mut writer = AutoIndentWriter::new(&mut out);
    let n = template.render_to(&mut writer);
    drop(writer);
    assert_eq!(out, "Hello, World!");
    assert_eq!(n, 13);
}

#[test]
fn iteration_separates_only_produced_values() {
    let group = Group::new();
    let errors = collect_errors(&group);
    let mut b = CodeBuilder::new("g");
    b.arg("names");
    b.emit_str(ops::LOAD_ATTR, "names");
    b.emit(ops::OPTIONS);
    b.emit_str(ops::LOAD_STR, ", ");
    b.emit1(ops::STORE_OPTION, RenderOption::Separator.index() as u16);
    b.emit(ops::WRITE_OPT);
    group.define(b.build());

    let template = group.get_instance_of("g").unwrap();
    template.set(
        "names",
        Value::List(vec![Value::from("a"), Value::Null, Value::from("b")]),
    );
    assert_eq!(template.render(), "a, b");
    assert!(errors.is_empty());
}

#[test]
fn null_attribute_with_declared_formal_is_fine() {
    let group = Group::new();
    let errors = collect_errors(&group);
    let mut b = CodeBuilder::new("t");
    b.arg("x");
    b.emit_str(ops::LOAD_ATTR, "x");
    b.emit(ops::WRITE);
    group.define(b.build());

    let template = group.get_instance_of("t").unwrap();
    assert_eq!(template.render(), "");
    assert!(errors.is_empty());
}

#[test]
fn undeclared_attribute_reference_is_reported() {
    let group = Group::new();
    let errors = collect_errors(&group);
    let mut b = CodeBuilder::new("t");
    b.arg("x");
    b.emit_str(ops::LOAD_ATTR, "y");
    b.emit(ops::WRITE);
    group.define(b.build());

    let template = group.get_instance_of("t").unwrap();
    assert_eq!(template.render(), "");
    let errors = errors.take();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::NoAttributeDefinition("y".into()));
    assert_eq!(errors[0].template.as_deref(), Some("t"));
}

#[test]
fn map_property_resolves_keys_and_falls_back_to_default() {
    let group = Group::new();
    for (name, key) in [("a1", "k1"), ("a2", "missing")] {
        let mut b = CodeBuilder::new(name);
        b.arg("attr");
        b.emit_str(ops::LOAD_ATTR, "attr");
        b.emit_str(ops::LOAD_PROP, key);
        b.emit(ops::WRITE);
        group.define(b.build());
    }

    let attr = Value::from([("k1", "v1"), (weft::DEFAULT_KEY, "dflt")]);

    let t = group.get_instance_of("a1").unwrap();
    t.set("attr", attr.clone());
    assert_eq!(t.render(), "v1");

    let t = group.get_instance_of("a2").unwrap();
    t.set("attr", attr);
    assert_eq!(t.render(), "dflt");
}

#[test]
fn map_pseudo_properties_and_key_sentinel() {
    let group = Group::new();
    for (name, key) in [("keys", "keys"), ("values", "values"), ("dict", "k")] {
        let mut b = CodeBuilder::new(name);
        b.arg("attr");
        b.emit_str(ops::LOAD_ATTR, "attr");
        b.emit_str(ops::LOAD_PROP, key);
        b.emit(ops::WRITE);
        group.define(b.build());
    }

    let attr = Value::from([("a", "1"), ("b", "2")]);
    let t = group.get_instance_of("keys").unwrap();
    t.set("attr", attr.clone());
    assert_eq!(t.render(), "ab");

    let t = group.get_instance_of("values").unwrap();
    t.set("attr", attr);
    assert_eq!(t.render(), "12");

    // A dictionary value equal to the key sentinel yields the key itself.
    let t = group.get_instance_of("dict").unwrap();
    t.set("attr", Value::from([("k", weft::DICT_KEY)]));
    assert_eq!(t.render(), "k");
}

#[test]
fn property_on_template_reads_own_attributes_only() {
    let group = Group::new();
    // outer sets x on an embedded instance, then reads inner.x and inner.y;
    // y exists only on outer, so the template property lookup yields nothing.
    let mut b = CodeBuilder::new("inner");
    b.arg("x");
    group.define(b.build());

    let mut b = CodeBuilder::new("outer");
    b.arg("y");
    b.emit_str(ops::NEW, "inner");
    b.emit_str(ops::LOAD_STR, "v");
    b.emit_str(ops::STORE_ATTR, "x");
    b.emit_str(ops::LOAD_PROP, "x");
    b.emit(ops::WRITE);
    b.emit_str(ops::NEW, "inner");
    b.emit_str(ops::LOAD_PROP, "y");
    b.emit(ops::WRITE);
    group.define(b.build());

    let template = group.get_instance_of("outer").unwrap();
    template.set("y", "hidden");
    assert_eq!(template.render(), "v");
}

#[test]
fn embedded_template_with_named_argument() {
    let group = Group::new();
    let mut b = CodeBuilder::new("inner");
    b.arg("x");
    b.emit_str(ops::LOAD_STR, "[");
    b.emit(ops::WRITE);
    b.emit_str(ops::LOAD_ATTR, "x");
    b.emit(ops::WRITE);
    b.emit_str(ops::LOAD_STR, "]");
    b.emit(ops::WRITE);
    group.define(b.build());

    let mut b = CodeBuilder::new("outer");
    b.arg("v");
    b.emit_str(ops::NEW, "inner");
    b.emit_str(ops::LOAD_ATTR, "v");
    b.emit_str(ops::STORE_ATTR, "x");
    b.emit(ops::WRITE);
    group.define(b.build());

    let template = group.get_instance_of("outer").unwrap();
    template.set("v", "hi");
    assert_eq!(template.render(), "[hi]");
}

#[test]
fn embedded_template_sees_enclosing_attributes() {
    let group = Group::new();
    let mut b = CodeBuilder::new("inner");
    b.emit_str(ops::LOAD_ATTR, "greeting");
    b.emit(ops::WRITE);
    group.define(b.build());

    let mut b = CodeBuilder::new("outer");
    b.arg("greeting");
    b.emit_str(ops::NEW, "inner");
    b.emit(ops::WRITE);
    group.define(b.build());

    let template = group.get_instance_of("outer").unwrap();
    template.set("greeting", "hi");
    assert_eq!(template.render(), "hi");
}

#[test]
fn conditional_branches_on_truthiness() {
    let group = Group::new();
    // <if(flag)>yes<else>no<endif>
    let mut b = CodeBuilder::new("t");
    b.arg("flag");
    b.emit_str(ops::LOAD_ATTR, "flag");
    let to_else = b.emit1(ops::BRF, 0);
    b.emit_str(ops::LOAD_STR, "yes");
    b.emit(ops::WRITE);
    let to_end = b.emit1(ops::BR, 0);
    let else_addr = b.here();
    b.patch(to_else, else_addr);
    b.emit_str(ops::LOAD_STR, "no");
    b.emit(ops::WRITE);
    let end = b.here();
    b.patch(to_end, end);
    group.define(b.build());

    let template = group.get_instance_of("t").unwrap();
    template.set("flag", true);
    assert_eq!(template.render(), "yes");

    let template = group.get_instance_of("t").unwrap();
    template.set("flag", Value::List(vec![]));
    assert_eq!(template.render(), "no");

    // Empty strings are present, hence true.
    let template = group.get_instance_of("t").unwrap();
    template.set("flag", "");
    assert_eq!(template.render(), "yes");
}

#[test]
fn boolean_ops_combine_truthiness() {
    let group = Group::new();
    let mut b = CodeBuilder::new("t");
    b.arg("a").arg("b");
    b.emit_str(ops::LOAD_ATTR, "a");
    b.emit_str(ops::LOAD_ATTR, "b");
    b.emit(ops::AND);
    b.emit(ops::WRITE);
    b.emit_str(ops::LOAD_STR, " ");
    b.emit(ops::WRITE);
    b.emit_str(ops::LOAD_ATTR, "a");
    b.emit_str(ops::LOAD_ATTR, "b");
    b.emit(ops::OR);
    b.emit(ops::WRITE);
    b.emit_str(ops::LOAD_STR, " ");
    b.emit(ops::WRITE);
    b.emit_str(ops::LOAD_ATTR, "b");
    b.emit(ops::NOT);
    b.emit(ops::WRITE);
    group.define(b.build());

    // a is set, b is not: a&&b is false, a||b is true, !b is true.
    let template = group.get_instance_of("t").unwrap();
    template.set("a", true);
    assert_eq!(template.render(), "false true true");
}

#[test]
fn list_construction_spreads_iterables_and_drops_nulls() {
    let group = Group::new();
    // <[x, y]> with x scalar and y a list
    let mut b = CodeBuilder::new("t");
    b.arg("x").arg("y");
    b.emit(ops::LIST);
    b.emit_str(ops::LOAD_ATTR, "x");
    b.emit(ops::ADD);
    b.emit_str(ops::LOAD_ATTR, "y");
    b.emit(ops::ADD);
    b.emit(ops::WRITE);
    group.define(b.build());

    let template = group.get_instance_of("t").unwrap();
    template.set("x", "a");
    template.set("y", vec!["b", "c"]);
    assert_eq!(template.render(), "abc");

    let template = group.get_instance_of("t").unwrap();
    template.set("y", "d");
    assert_eq!(template.render(), "d");
}

#[test]
fn sequence_functions_compose_through_bytecode() {
    let group = Group::new();
    for (name, op) in [
        ("first", ops::FIRST),
        ("last", ops::LAST),
        ("rest", ops::REST),
        ("trunc", ops::TRUNC),
        ("reverse", ops::REVERSE),
        ("length", ops::LENGTH),
    ] {
        let mut b = CodeBuilder::new(name);
        b.arg("names");
        b.emit_str(ops::LOAD_ATTR, "names");
        b.emit(op);
        b.emit(ops::WRITE);
        group.define(b.build());
    }

    let render = |name: &str| {
        let t = group.get_instance_of(name).unwrap();
        t.set("names", vec!["a", "b", "c"]);
        t.render()
    };
    assert_eq!(render("first"), "a");
    assert_eq!(render("last"), "c");
    assert_eq!(render("rest"), "bc");
    assert_eq!(render("trunc"), "ab");
    assert_eq!(render("reverse"), "cba");
    assert_eq!(render("length"), "3");
}

#[test]
fn strings_trim_and_measure() {
    let group = Group::new();
    let mut b = CodeBuilder::new("t");
    b.emit_str(ops::LOAD_STR, "  x ");
    b.emit(ops::TRIM);
    b.emit(ops::WRITE);
    b.emit_str(ops::LOAD_STR, "abc");
    b.emit(ops::STRLEN);
    b.emit(ops::WRITE);
    group.define(b.build());

    assert_eq!(group.get_instance_of("t").unwrap().render(), "x3");
}

#[test]
fn tostr_renders_early() {
    let group = Group::new();
    let mut b = CodeBuilder::new("t");
    b.arg("n");
    b.emit_str(ops::LOAD_ATTR, "n");
    b.emit(ops::TOSTR);
    b.emit(ops::STRLEN);
    b.emit(ops::WRITE);
    group.define(b.build());

    let template = group.get_instance_of("t").unwrap();
    template.set("n", 1234);
    assert_eq!(template.render(), "4");
}

#[test]
fn indirect_template_invocation() {
    let group = Group::new();
    let mut b = CodeBuilder::new("inner");
    b.emit_str(ops::LOAD_STR, "hi");
    b.emit(ops::WRITE);
    group.define(b.build());

    let mut b = CodeBuilder::new("t");
    b.arg("which");
    b.emit_str(ops::LOAD_ATTR, "which");
    b.emit(ops::TOSTR);
    b.emit(ops::NEW_IND);
    b.emit(ops::WRITE);
    group.define(b.build());

    let template = group.get_instance_of("t").unwrap();
    template.set("which", "inner");
    assert_eq!(template.render(), "hi");
}

#[test]
fn super_new_resolves_through_the_native_groups_imports() {
    let base = Group::new();
    let mut b = CodeBuilder::new("greeting");
    b.emit_str(ops::LOAD_STR, "base-hi");
    b.emit(ops::WRITE);
    base.define(b.build());

    let group = Group::new();
    group.import(Rc::clone(&base));
    let mut b = CodeBuilder::new("t");
    b.emit_str(ops::SUPER_NEW, "greeting");
    b.emit(ops::WRITE);
    group.define(b.build());

    assert_eq!(group.get_instance_of("t").unwrap().render(), "base-hi");
}

#[test]
fn super_new_miss_reports_and_renders_blank() {
    let group = Group::new();
    let errors = collect_errors(&group);
    let mut b = CodeBuilder::new("t");
    b.emit_str(ops::SUPER_NEW, "missing");
    b.emit(ops::WRITE);
    group.define(b.build());

    assert_eq!(group.get_instance_of("t").unwrap().render(), "");
    assert_eq!(
        errors.take()[0].kind,
        ErrorKind::NoImportedTemplate("missing".into())
    );
}

#[test]
fn newline_and_indentation() {
    let group = Group::new();
    let mut b = CodeBuilder::new("t");
    b.emit_str(ops::LOAD_STR, "a");
    b.emit(ops::WRITE);
    b.emit(ops::NEWLINE);
    b.emit_str(ops::INDENT, "  ");
    b.emit_str(ops::LOAD_STR, "b");
    b.emit(ops::WRITE);
    b.emit(ops::NEWLINE);
    b.emit(ops::DEDENT);
    group.define(b.build());

    assert_eq!(group.get_instance_of("t").unwrap().render(), "a\n  b\n");
}

#[test]
fn newline_is_suppressed_on_empty_lines() {
    let group = Group::new();
    // Two NEWLINEs with no output in between: the first is dropped because
    // nothing was written, the second emits because it follows a NEWLINE.
    let mut b = CodeBuilder::new("t");
    b.emit(ops::NEWLINE);
    b.emit(ops::NEWLINE);
    group.define(b.build());

    assert_eq!(group.get_instance_of("t").unwrap().render(), "\n");
}

#[test]
fn default_arguments_bind_lazily_and_see_the_call_scope() {
    let group = Group::new();
    let mut sub = CodeBuilder::new("sub");
    sub.emit_str(ops::LOAD_ATTR, "greeting");
    sub.emit(ops::WRITE);
    let sub = Rc::new(sub.build());

    let mut b = CodeBuilder::new("inner");
    b.arg_with_default("x", sub, "sub()");
    b.emit_str(ops::LOAD_ATTR, "x");
    b.emit(ops::WRITE);
    group.define(b.build());

    let mut b = CodeBuilder::new("outer");
    b.arg("greeting");
    b.emit_str(ops::NEW, "inner");
    b.emit(ops::WRITE);
    group.define(b.build());

    let template = group.get_instance_of("outer").unwrap();
    template.set("greeting", "hi");
    assert_eq!(template.render(), "hi");
}

#[test]
fn paren_shaped_default_arguments_bind_eagerly_as_strings() {
    let group = Group::new();
    let mut sub = CodeBuilder::new("sub");
    sub.emit_str(ops::LOAD_ATTR, "greeting");
    sub.emit(ops::WRITE);
    let sub = Rc::new(sub.build());

    let mut b = CodeBuilder::new("inner");
    b.arg_with_default("x", sub, "{<(greeting)>}");
    b.emit_str(ops::LOAD_ATTR, "x");
    b.emit(ops::STRLEN);
    b.emit(ops::WRITE);
    group.define(b.build());

    let mut b = CodeBuilder::new("outer");
    b.arg("greeting");
    b.emit_str(ops::NEW, "inner");
    b.emit(ops::WRITE);
    group.define(b.build());

    // STRLEN sees a string, so the default was rendered at injection time.
    let template = group.get_instance_of("outer").unwrap();
    template.set("greeting", "hi");
    assert_eq!(template.render(), "2");
}

#[test]
fn explicit_arguments_win_over_defaults() {
    let group = Group::new();
    let mut sub = CodeBuilder::new("sub");
    sub.emit_str(ops::LOAD_STR, "default");
    sub.emit(ops::WRITE);
    let sub = Rc::new(sub.build());

    let mut b = CodeBuilder::new("inner");
    b.arg_with_default("x", sub, "sub()");
    b.emit_str(ops::LOAD_ATTR, "x");
    b.emit(ops::WRITE);
    group.define(b.build());

    let mut b = CodeBuilder::new("outer");
    b.emit_str(ops::NEW, "inner");
    b.emit_str(ops::LOAD_STR, "explicit");
    b.emit_str(ops::STORE_ATTR, "x");
    b.emit(ops::WRITE);
    group.define(b.build());

    assert_eq!(group.get_instance_of("outer").unwrap().render(), "explicit");
}

#[test]
fn rendering_is_deterministic() {
    let group = Group::new();
    let mut b = CodeBuilder::new("t");
    b.arg("m");
    b.emit_str(ops::LOAD_ATTR, "m");
    b.emit(ops::WRITE);
    group.define(b.build());

    let render = || {
        let t = group.get_instance_of("t").unwrap();
        t.set("m", Value::from([("b", "2"), ("a", "1"), ("c", "3")]));
        t.render()
    };
    // Maps iterate their values in key order.
    assert_eq!(render(), "123");
    assert_eq!(render(), render());
}

#[test]
fn load_local_reads_own_attributes_only() {
    let group = Group::new();
    let mut b = CodeBuilder::new("inner");
    b.emit_str(ops::LOAD_LOCAL, "x");
    b.emit(ops::WRITE);
    b.emit_str(ops::LOAD_STR, "/");
    b.emit(ops::WRITE);
    b.emit_str(ops::LOAD_ATTR, "x");
    b.emit(ops::WRITE);
    group.define(b.build());

    let mut b = CodeBuilder::new("outer");
    b.arg("x");
    b.emit_str(ops::NEW, "inner");
    b.emit(ops::WRITE);
    group.define(b.build());

    // x lives on the enclosing instance: invisible locally, visible through
    // the scope walk.
    let template = group.get_instance_of("outer").unwrap();
    template.set("x", "v");
    assert_eq!(template.render(), "/v");
}

#[test]
fn indirect_property_lookup() {
    let group = Group::new();
    let mut b = CodeBuilder::new("t");
    b.arg("attr").arg("key");
    b.emit_str(ops::LOAD_ATTR, "attr");
    b.emit_str(ops::LOAD_ATTR, "key");
    b.emit(ops::LOAD_PROP_IND);
    b.emit(ops::WRITE);
    group.define(b.build());

    let template = group.get_instance_of("t").unwrap();
    template.set("attr", Value::from([("k1", "v1")]));
    template.set("key", "k1");
    assert_eq!(template.render(), "v1");
}

#[test]
fn pop_discards_the_top_of_stack() {
    let group = Group::new();
    let mut b = CodeBuilder::new("t");
    b.emit_str(ops::LOAD_STR, "dropped");
    b.emit(ops::POP);
    b.emit_str(ops::LOAD_STR, "kept");
    b.emit(ops::WRITE);
    group.define(b.build());

    assert_eq!(group.get_instance_of("t").unwrap().render(), "kept");
}

#[test]
fn strip_removes_null_elements() {
    let group = Group::new();
    let mut b = CodeBuilder::new("t");
    b.arg("names");
    b.emit_str(ops::LOAD_ATTR, "names");
    b.emit(ops::STRIP);
    b.emit(ops::LENGTH);
    b.emit(ops::WRITE);
    group.define(b.build());

    let template = group.get_instance_of("t").unwrap();
    template.set(
        "names",
        Value::List(vec![Value::from("a"), Value::Null, Value::from("b")]),
    );
    assert_eq!(template.render(), "2");
}

#[derive(Debug)]
struct Point {
    x: i64,
    y: i64,
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl weft::ObjectModel for Point {
    fn property(&self, name: &str) -> Option<Value> {
        match name {
            "x" => Some(Value::Int(self.x)),
            "y" => Some(Value::Int(self.y)),
            _ => None,
        }
    }
}

#[test]
fn object_properties_resolve_through_the_accessor_protocol() {
    let group = Group::new();
    let errors = collect_errors(&group);
    let mut b = CodeBuilder::new("t");
    b.arg("p");
    b.emit_str(ops::LOAD_ATTR, "p");
    b.emit_str(ops::LOAD_PROP, "x");
    b.emit(ops::WRITE);
    b.emit_str(ops::LOAD_STR, " ");
    b.emit(ops::WRITE);
    b.emit_str(ops::LOAD_ATTR, "p");
    b.emit(ops::WRITE);
    group.define(b.build());

    let template = group.get_instance_of("t").unwrap();
    template.set("p", Value::object(Point { x: 3, y: 4 }));
    assert_eq!(template.render(), "3 (3, 4)");
    assert!(errors.is_empty());
}

#[test]
fn unknown_object_property_reports() {
    let group = Group::new();
    let errors = collect_errors(&group);
    let mut b = CodeBuilder::new("t");
    b.arg("p");
    b.emit_str(ops::LOAD_ATTR, "p");
    b.emit_str(ops::LOAD_PROP, "z");
    b.emit(ops::WRITE);
    group.define(b.build());

    let template = group.get_instance_of("t").unwrap();
    template.set("p", Value::object(Point { x: 3, y: 4 }));
    assert_eq!(template.render(), "");
    assert_eq!(
        errors.take()[0].kind,
        ErrorKind::NoSuchProperty("object.z".into())
    );
}
