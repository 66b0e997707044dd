//! JVM type descriptors (`Ljava/lang/String;`, `([IJ)Ljava/util/List;`)

/// Binary names of all object types mentioned in a field or method descriptor.
///
/// Primitive and array markers are skipped; `[[Lfoo/Bar;` yields `foo/Bar`.
pub fn object_types(descriptor: &str) -> Vec<&str> {
    let mut types = Vec::new();
    let mut rest = descriptor;

    // Outside of an object type no descriptor character is 'L'
    while let Some(start) = rest.find('L') {
        let body = &rest[start + 1..];
        let Some(end) = body.find(';') else {
            break;
        };

        if end > 0 {
            types.push(&body[..end]);
        }
        rest = &body[end + 1..];
    }

    types
}

/// Class referenced by a `CONSTANT_Class` name, which may be an array type
pub fn class_entry_types(name: &str) -> Vec<&str> {
    if name.starts_with('[') {
        object_types(name)
    } else {
        vec![name]
    }
}

/// Convert an internal binary name (`java/util/Map$Entry`) to dotted form
pub fn to_dotted(binary_name: &str) -> String {
    binary_name.replace('/', ".")
}
