//! Helpers for reading loosely-typed BSON documents.
//!
//! Platform collections are written by other services, so numeric fields may
//! arrive as Int32, Int64 or Double and identifiers as ObjectId or String.

use bson::{Bson, Document};

/// Walk a dotted path (`metadata.number`) through nested documents.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }
    Some(current)
}

/// String form of an identifier. ObjectIds render as hex.
pub fn id_string(value: &Bson) -> Option<String> {
    match value {
        Bson::ObjectId(oid) => Some(oid.to_hex()),
        Bson::String(s) => Some(s.clone()),
        Bson::Int32(n) => Some(n.to_string()),
        Bson::Int64(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Integer value of a numeric field. Whole doubles and numeric strings are accepted.
pub fn as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(n) => Some(i64::from(*n)),
        Bson::Int64(n) => Some(*n),
        Bson::Double(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
        Bson::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Truthiness of a flag field.
pub fn as_bool(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(f) => *f != 0.0,
        Bson::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};

    #[test]
    fn test_get_path_nested() {
        let d = doc! { "metadata": { "number": 3 }, "flat": "x" };
        assert_eq!(get_path(&d, "metadata.number"), Some(&Bson::Int32(3)));
        assert_eq!(get_path(&d, "flat"), Some(&Bson::String("x".into())));
        assert_eq!(get_path(&d, "metadata.missing"), None);
        assert_eq!(get_path(&d, "flat.deeper"), None);
    }

    #[test]
    fn test_id_string() {
        let oid = ObjectId::new();
        assert_eq!(id_string(&Bson::ObjectId(oid)), Some(oid.to_hex()));
        assert_eq!(id_string(&Bson::String("abc".into())), Some("abc".into()));
        assert_eq!(id_string(&Bson::Null), None);
    }

    #[test]
    fn test_as_i64_variants() {
        assert_eq!(as_i64(&Bson::Int32(7)), Some(7));
        assert_eq!(as_i64(&Bson::Int64(3600)), Some(3600));
        assert_eq!(as_i64(&Bson::Double(2.0)), Some(2));
        assert_eq!(as_i64(&Bson::Double(2.5)), None);
        assert_eq!(as_i64(&Bson::String(" 42 ".into())), Some(42));
        assert_eq!(as_i64(&Bson::Null), None);
    }

    #[test]
    fn test_as_bool_variants() {
        assert!(as_bool(&Bson::Boolean(true)));
        assert!(!as_bool(&Bson::Boolean(false)));
        assert!(as_bool(&Bson::Int32(1)));
        assert!(!as_bool(&Bson::Int64(0)));
        assert!(as_bool(&Bson::String("True".into())));
        assert!(!as_bool(&Bson::String("false".into())));
        assert!(!as_bool(&Bson::Null));
    }
}
