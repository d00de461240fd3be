//! JVM-style type and member descriptors.
//!
//! Used to derive parameter and return type names when a decoder only
//! supplies the raw descriptor.

use phf::{phf_map, phf_set};

/// Primitive type names keyed by their descriptor character.
static PRIMITIVES_BY_DESCRIPTOR: phf::Map<char, &'static str> = phf_map! {
    'Z' => "boolean",
    'B' => "byte",
    'C' => "char",
    'S' => "short",
    'I' => "int",
    'J' => "long",
    'F' => "float",
    'D' => "double",
    'V' => "void",
};

static PRIMITIVE_NAMES: phf::Set<&'static str> = phf_set! {
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
};

/// Whether `name` is a primitive type name (including `void`).
pub fn is_primitive(name: &str) -> bool {
    PRIMITIVE_NAMES.contains(name)
}

/// Strip any array dimensions: `com.Foo[][]` -> `com.Foo`.
pub fn element_type_name(name: &str) -> &str {
    name.trim_end_matches("[]")
}

/// Parse a single field type descriptor into a type name.
///
/// `I` -> `int`, `Ljava/lang/String;` -> `java.lang.String`, `[[J` -> `long[][]`.
pub fn type_name(descriptor: &str) -> Option<String> {
    let (name, rest) = parse_type(descriptor)?;
    rest.is_empty().then_some(name)
}

/// Parse a method descriptor into parameter type names and the return type name.
pub fn method_types(descriptor: &str) -> Option<(Vec<String>, String)> {
    let mut rest = descriptor.strip_prefix('(')?;
    let mut parameters = Vec::new();
    while !rest.starts_with(')') {
        let (name, remaining) = parse_type(rest)?;
        parameters.push(name);
        rest = remaining;
    }
    let return_type = type_name(&rest[1..])?;
    Some((parameters, return_type))
}

fn parse_type(descriptor: &str) -> Option<(String, &str)> {
    let first = descriptor.chars().next()?;
    match first {
        '[' => {
            let (component, rest) = parse_type(&descriptor[1..])?;
            Some((format!("{}[]", component), rest))
        }
        'L' => {
            let end = descriptor.find(';')?;
            Some((descriptor[1..end].replace('/', "."), &descriptor[end + 1..]))
        }
        c => PRIMITIVES_BY_DESCRIPTOR
            .get(&c)
            .map(|name| (name.to_string(), &descriptor[1..])),
    }
}
