//! Iteration mapping: `<attr:t()>`, rotating `<attr:a(),b()>` and the
//! parallel zip `<x,y:{a,b | ...}>`.

use crate::error::ErrorKind;
use crate::interp::ops;
use crate::interp::Interpreter;
use crate::template::Template;
use crate::value::Value;

impl Interpreter {
    /// Apply one template across an attribute; pushes the result.
    pub(crate) fn map(&mut self, self_t: &Template, attr: Value, name: String) {
        self.rot_map(self_t, attr, vec![name]);
    }

    /// Apply templates round-robin across an attribute; pushes the result.
    /// The rotation index advances only on non-null elements.
    pub(crate) fn rot_map(&mut self, self_t: &Template, attr: Value, names: Vec<String>) {
        if attr.is_null() {
            self.operands.push(Value::Null);
            return;
        }
        match ops::normalize_to_iterator(attr) {
            Value::Iter(it) => {
                let mut mapped = Vec::new();
                let mut i0 = 0i64;
                let mut ti = 0usize;
                while let Some(value) = it.next() {
                    if value.is_null() {
                        continue;
                    }
                    let name = &names[ti % names.len()];
                    ti += 1;
                    let st = match self.group.get_embedded_instance_of(self_t, name) {
                        Some(st) => st,
                        None => {
                            self.report(self_t, ErrorKind::NoSuchTemplate(name.clone()));
                            self.group.blank()
                        }
                    };
                    self.set_sole_argument(self_t, &st, value);
                    st.raw_set("i0", Value::Int(i0));
                    st.raw_set("i", Value::Int(i0 + 1));
                    mapped.push(Value::Template(st));
                    i0 += 1;
                }
                self.operands.push(Value::List(mapped));
            }
            // A single scalar maps through the first template alone. This is
            // observably different from a singleton list.
            attr => match self.group.get_instance_of(&names[0]) {
                Some(st) => {
                    self.set_sole_argument(self_t, &st, attr);
                    st.raw_set("i0", Value::Int(0));
                    st.raw_set("i", Value::Int(1));
                    self.operands.push(Value::Template(st));
                }
                None => self.operands.push(Value::Template(self.group.blank())),
            },
        }
    }

    /// Zip several attribute expressions positionally into one template's
    /// formal arguments, round by round, until every stream is exhausted.
    pub(crate) fn par_map(
        &mut self,
        self_t: &Template,
        exprs: Vec<Value>,
        template: String,
    ) -> Value {
        if exprs.is_empty() {
            return Value::Null;
        }

        // Null streams stay null; everything else becomes an iterator,
        // scalars included.
        let iters: Vec<_> = exprs
            .into_iter()
            .map(|e| (!e.is_null()).then(|| ops::force_iterator(e)))
            .collect();

        let Some(compiled) = self.group.lookup_template(&template) else {
            self.report(self_t, ErrorKind::NoSuchTemplate(template));
            return Value::Null;
        };
        let formal_names: Vec<String> = compiled
            .args()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect();
        if formal_names.is_empty() {
            self.report(self_t, ErrorKind::MissingFormalArguments);
            return Value::Null;
        }

        let mut num_attrs = iters.len();
        if formal_names.len() != num_attrs {
            self.report(
                self_t,
                ErrorKind::MapArgumentCountMismatch {
                    values: num_attrs,
                    formals: formal_names.len(),
                },
            );
            num_attrs = num_attrs.min(formal_names.len());
        }

        let mut results = Vec::new();
        let mut round = 0i64;
        loop {
            let mut num_empty = 0;
            let embedded = match self.group.get_embedded_instance_of(self_t, &template) {
                Some(st) => st,
                None => self.group.blank(),
            };
            embedded.raw_set("i0", Value::Int(round));
            embedded.raw_set("i", Value::Int(round + 1));
            for (a, formal) in formal_names.iter().enumerate().take(num_attrs) {
                match iters[a].as_ref().and_then(|it| it.next()) {
                    Some(value) => {
                        embedded.check_attribute_exists(formal, Some(self.current_ip));
                        embedded.raw_set(formal, value);
                    }
                    // An exhausted stream leaves its formal unset, so
                    // references resolve through the enclosing scope.
                    None => num_empty += 1,
                }
            }
            if num_empty == num_attrs {
                break;
            }
            results.push(Value::Template(embedded));
            round += 1;
        }
        Value::List(results)
    }
}
