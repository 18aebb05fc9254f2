//! Magic method index.
//!
//! Operators and user-defined coercions dispatch through double-underscore
//! methods (`__add`, `__eq`, `__to`, ...) looked up by the receiver's
//! canonical type key rather than normal name resolution. The index is
//! bootstrapped with the operator table for every built-in primitive;
//! user intrinsics and extern methods are added as declarations are
//! processed.
//!
//! Lookup takes a *candidate list* of receiver keys (the type itself, its
//! alias target, structural variants); the first receiver with a matching
//! name and arity wins, and its entries compete by conversion cost in the
//! call resolver.

use once_cell::sync::Lazy;
use rill_binder::SymbolId;
use rustc_hash::FxHashMap;

/// A magic method signature in canonical type-key form. `params[0]` is the
/// receiver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MagicSignature {
    pub params: Vec<String>,
    pub result: String,
}

/// One entry in the index. Built-in entries have no backing symbol.
#[derive(Clone, Debug)]
pub struct MagicMethod {
    pub signature: MagicSignature,
    pub symbol: SymbolId,
}

impl MagicMethod {
    pub fn builtin(params: Vec<String>, result: String) -> Self {
        MagicMethod {
            signature: MagicSignature { params, result },
            symbol: SymbolId::NONE,
        }
    }
}

/// Receiver key -> method name -> signatures.
#[derive(Debug)]
pub struct MagicIndex {
    by_receiver: FxHashMap<String, FxHashMap<&'static str, Vec<MagicMethod>>>,
    /// Names added for user methods; `&'static str` keys above come from
    /// the fixed operator vocabulary, user names are leaked once.
    user_names: FxHashMap<String, &'static str>,
}

impl MagicIndex {
    /// An index pre-seeded with the built-in operator table.
    pub fn with_builtins() -> Self {
        let mut index = MagicIndex {
            by_receiver: FxHashMap::default(),
            user_names: FxHashMap::default(),
        };
        for spec in BUILTIN_OPERATORS.iter() {
            index.add(
                spec.receiver.clone(),
                spec.name,
                MagicMethod::builtin(spec.params.clone(), spec.result.clone()),
            );
        }
        index
    }

    pub fn add(&mut self, receiver: String, name: &'static str, method: MagicMethod) {
        self.by_receiver
            .entry(receiver)
            .or_default()
            .entry(name)
            .or_default()
            .push(method);
    }

    /// Add a user-defined method under a runtime name.
    pub fn add_user(&mut self, receiver: String, name: &str, method: MagicMethod) {
        let interned = self.intern_name(name);
        self.add(receiver, interned, method);
    }

    fn intern_name(&mut self, name: &str) -> &'static str {
        if let Some(&n) = self.user_names.get(name) {
            return n;
        }
        let leaked: &'static str = Box::leak(name.to_owned().into_boxed_str());
        self.user_names.insert(name.to_owned(), leaked);
        leaked
    }

    /// Find `name`/`arity` along the candidate receiver keys. Returns the
    /// index of the first key that had any match plus its entries.
    pub fn lookup<'a>(
        &'a self,
        candidate_keys: &[String],
        name: &str,
        arity: usize,
    ) -> Option<(usize, Vec<&'a MagicMethod>)> {
        for (i, key) in candidate_keys.iter().enumerate() {
            let Some(methods) = self.by_receiver.get(key) else {
                continue;
            };
            let Some(entries) = methods.get(name) else {
                continue;
            };
            let matching: Vec<&MagicMethod> = entries
                .iter()
                .filter(|m| m.signature.params.len() == arity)
                .collect();
            if !matching.is_empty() {
                return Some((i, matching));
            }
        }
        None
    }

    /// All methods with `name` on exactly `receiver`, any arity.
    pub fn methods_on<'a>(&'a self, receiver: &str, name: &str) -> &'a [MagicMethod] {
        self.by_receiver
            .get(receiver)
            .and_then(|m| m.get(name))
            .map_or(&[], |v| v.as_slice())
    }

    /// Whether any method with `name` exists on `receiver`.
    pub fn has_method(&self, receiver: &str, name: &str) -> bool {
        !self.methods_on(receiver, name).is_empty()
    }
}

// =============================================================================
// Builtin operator table
// =============================================================================

struct OperatorSpec {
    receiver: String,
    name: &'static str,
    params: Vec<String>,
    result: String,
}

const INT_KEYS: [&str; 5] = ["int", "int8", "int16", "int32", "int64"];
const UINT_KEYS: [&str; 5] = ["uint", "uint8", "uint16", "uint32", "uint64"];
const FLOAT_KEYS: [&str; 4] = ["float", "float16", "float32", "float64"];

const ARITH: [&str; 5] = ["__add", "__sub", "__mul", "__div", "__mod"];
const COMPARE: [&str; 6] = ["__eq", "__ne", "__lt", "__le", "__gt", "__ge"];
const BITWISE: [&str; 5] = ["__band", "__bor", "__bxor", "__shl", "__shr"];

static BUILTIN_OPERATORS: Lazy<Vec<OperatorSpec>> = Lazy::new(|| {
    let mut specs = Vec::new();

    let mut binary = |recv: &str, name: &'static str, result: &str| {
        specs.push(OperatorSpec {
            receiver: recv.to_string(),
            name,
            params: vec![recv.to_string(), recv.to_string()],
            result: result.to_string(),
        });
    };

    for key in INT_KEYS.iter().chain(UINT_KEYS.iter()).chain(FLOAT_KEYS.iter()) {
        for op in ARITH {
            binary(key, op, key);
        }
        for op in COMPARE {
            binary(key, op, "bool");
        }
    }
    for key in INT_KEYS.iter().chain(UINT_KEYS.iter()) {
        for op in BITWISE {
            binary(key, op, key);
        }
    }
    for op in ["__and", "__or"] {
        binary("bool", op, "bool");
    }
    for op in ["__eq", "__ne"] {
        binary("bool", op, "bool");
    }
    binary("string", "__add", "string");
    for op in COMPARE {
        binary("string", op, "bool");
    }

    let mut unary = |recv: &str, name: &'static str, result: &str| {
        specs.push(OperatorSpec {
            receiver: recv.to_string(),
            name,
            params: vec![recv.to_string()],
            result: result.to_string(),
        });
    };

    for key in INT_KEYS.iter().chain(FLOAT_KEYS.iter()) {
        unary(key, "__neg", key);
        unary(key, "__pos", key);
    }
    for key in UINT_KEYS {
        unary(key, "__pos", key);
    }
    unary("bool", "__not", "bool");

    specs
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_add_on_int() {
        let index = MagicIndex::with_builtins();
        let keys = vec!["int".to_string()];
        let (i, methods) = index.lookup(&keys, "__add", 2).unwrap();
        assert_eq!(i, 0);
        assert_eq!(methods[0].signature.result, "int");
    }

    #[test]
    fn candidate_order_decides_receiver() {
        let mut index = MagicIndex::with_builtins();
        index.add_user(
            "Meters".to_string(),
            "__add",
            MagicMethod::builtin(
                vec!["Meters".to_string(), "Meters".to_string()],
                "Meters".to_string(),
            ),
        );
        // The type itself precedes its alias target in the candidate list.
        let keys = vec!["Meters".to_string(), "int".to_string()];
        let (i, methods) = index.lookup(&keys, "__add", 2).unwrap();
        assert_eq!(i, 0);
        assert_eq!(methods[0].signature.result, "Meters");
    }

    #[test]
    fn uint_has_no_negation() {
        let index = MagicIndex::with_builtins();
        let keys = vec!["uint".to_string()];
        assert!(index.lookup(&keys, "__neg", 1).is_none());
        assert!(index.lookup(&keys, "__pos", 1).is_some());
    }

    #[test]
    fn arity_filters_candidates() {
        let index = MagicIndex::with_builtins();
        let keys = vec!["bool".to_string()];
        assert!(index.lookup(&keys, "__not", 1).is_some());
        assert!(index.lookup(&keys, "__not", 2).is_none());
    }
}
