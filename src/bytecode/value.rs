//! Runtime values for the bytecode VM.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::bytecode::instruction::Instructions;

/// A runtime value in Rune.
#[derive(Debug, Clone)]
pub enum Value {
    /// Integer value
    Int(i64),
    /// Boolean value
    Bool(bool),
    /// Null value
    Null,
    /// String value (immutable, shared)
    String(Rc<String>),
    /// Array value
    Array(Rc<Vec<Value>>),
    /// Hash value, keyed by the digest of hashable values. Pairs keep
    /// their original key so display and lookups stay faithful.
    Hash(Rc<IndexMap<HashKey, HashPair>>),
    /// Compiled function emitted into the constant pool
    Function(Rc<CompiledFunction>),
}

/// A key/value entry stored in a hash.
#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: Value,
    pub value: Value,
}

/// A function lowered to bytecode, with the stack slots it needs.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFunction {
    pub instructions: Instructions,
    pub num_locals: usize,
    pub num_parameters: usize,
}

/// Type tag of a hashable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashKeyKind {
    Int,
    Bool,
    Str,
}

/// The canonical key form used by hash containers: a type tag plus a
/// 64-bit digest. Two hashable values are equal exactly when their
/// HashKeys are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey {
    pub kind: HashKeyKind,
    pub digest: u64,
}

/// 64-bit FNV-1a over a byte sequence.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut digest = OFFSET_BASIS;
    for &b in bytes {
        digest ^= b as u64;
        digest = digest.wrapping_mul(PRIME);
    }
    digest
}

impl Value {
    /// The name of this value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Bool(_) => "Bool",
            Value::Null => "Null",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Hash(_) => "Hash",
            Value::Function(_) => "Function",
        }
    }

    /// Everything other than `false` and `null` is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Null => false,
            _ => true,
        }
    }

    /// The hash key for this value, if it is a hashable variant.
    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Value::Int(n) => Some(HashKey {
                kind: HashKeyKind::Int,
                digest: *n as u64,
            }),
            Value::Bool(b) => Some(HashKey {
                kind: HashKeyKind::Bool,
                digest: u64::from(*b),
            }),
            Value::String(s) => Some(HashKey {
                kind: HashKeyKind::Str,
                digest: fnv1a(s.as_bytes()),
            }),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Hash(a), Value::Hash(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, value) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
            Value::Hash(pairs) => {
                write!(f, "{{")?;
                for (i, pair) in pairs.values().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", pair.key, pair.value)?;
                }
                write!(f, "}}")
            }
            Value::Function(function) => write!(f, "<fn/{}>", function.num_parameters),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_hash_keys_agree() {
        let hello1 = Value::String(Rc::new("Hello World".to_string()));
        let hello2 = Value::String(Rc::new("Hello World".to_string()));
        let other = Value::String(Rc::new("My name is johnny".to_string()));

        assert_eq!(hello1.hash_key(), hello2.hash_key());
        assert_ne!(hello1.hash_key(), other.hash_key());
    }

    #[test]
    fn test_hash_keys_distinguish_types() {
        // Int 1 and Bool true share the digest 1 but differ in type tag
        let one = Value::Int(1).hash_key().unwrap();
        let yes = Value::Bool(true).hash_key().unwrap();
        assert_eq!(one.digest, yes.digest);
        assert_ne!(one, yes);
    }

    #[test]
    fn test_unhashable_values() {
        assert!(Value::Array(Rc::new(vec![])).hash_key().is_none());
        assert!(Value::Null.hash_key().is_none());
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Int(0).is_truthy());
        assert!(Value::Int(5).is_truthy());
        assert!(Value::String(Rc::new(String::new())).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Null.is_truthy());
    }

    #[test]
    fn test_display() {
        let array = Value::Array(Rc::new(vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(array.to_string(), "[1, 2]");

        let mut pairs = IndexMap::new();
        let key = Value::String(Rc::new("one".to_string()));
        pairs.insert(
            key.hash_key().unwrap(),
            HashPair {
                key,
                value: Value::Int(1),
            },
        );
        assert_eq!(Value::Hash(Rc::new(pairs)).to_string(), "{one: 1}");
    }
}
