//! Small helpers for walking the lopdf object graph

use lopdf::{Dictionary, Document, Object, ObjectId};

/// Follow references until a direct object is reached
pub(crate) fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> &'a Object {
    // reference chains longer than this are malformed
    for _ in 0..16 {
        match obj {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(target) => obj = target,
                Err(_) => return obj,
            },
            _ => return obj,
        }
    }
    obj
}

/// Look up `key` in `dict` and return it as a dictionary, resolving references
pub(crate) fn get_dict<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    match resolve(doc, dict.get(key).ok()?) {
        Object::Dictionary(d) => Some(d),
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

/// Look up `key` in `dict` and return it as an array, resolving references
pub(crate) fn get_array<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Vec<Object>> {
    resolve(doc, dict.get(key).ok()?).as_array().ok()
}

/// Look up a name entry
pub(crate) fn get_name<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a [u8]> {
    match resolve(doc, dict.get(key).ok()?) {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}

/// Look up a numeric entry
pub(crate) fn get_f64(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<f64> {
    number(resolve(doc, dict.get(key).ok()?))
}

/// Integer or real operand as f64
pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

/// Look up an inheritable page attribute (`Resources`, `MediaBox`, `CropBox`)
/// walking up the page tree through `Parent`
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..32 {
        if let Ok(value) = current.get(key) {
            return Some(resolve(doc, value));
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn test_number() {
        assert_eq!(number(&Object::Integer(3)), Some(3.0));
        assert_eq!(number(&Object::Real(1.5)), Some(1.5));
        assert_eq!(number(&Object::Null), None);
    }

    #[test]
    fn test_resolve_follows_reference() {
        let mut doc = Document::with_version("1.5");
        let id = doc.add_object(Object::Integer(42));
        let reference = Object::Reference(id);
        assert_eq!(resolve(&doc, &reference), &Object::Integer(42));
    }

    #[test]
    fn test_inherited_from_parent() {
        let mut doc = Document::with_version("1.5");
        let parent_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => parent_id,
        });
        doc.objects.insert(
            parent_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "MediaBox" => vec![0.into(), 0.into(), 200.into(), 100.into()],
            }),
        );

        let media_box = inherited(&doc, page_id, b"MediaBox").unwrap();
        assert_eq!(media_box.as_array().unwrap().len(), 4);
        assert!(inherited(&doc, page_id, b"CropBox").is_none());
    }
}
