use std::{collections::HashMap, convert::TryFrom};

use crate::{
    error::{ParseError, PdfResult},
    objects::{Dictionary, Object, ObjectType, Reference},
    stream::Stream,
};

fn mismatched(expected: ObjectType, found: &Object) -> anyhow::Error {
    anyhow::anyhow!(ParseError::MismatchedObjectType {
        expected,
        found: format!("{:?}", found),
    })
}

pub trait Resolve<'a> {
    fn lex_object_from_reference(&mut self, reference: Reference) -> PdfResult<Object<'a>>;

    /// Resolve all references
    fn resolve(&mut self, obj: Object<'a>) -> PdfResult<Object<'a>> {
        match obj {
            Object::Reference(r) => {
                let obj = self.lex_object_from_reference(r)?;
                self.resolve(obj)
            }
            obj => Ok(obj),
        }
    }

    fn assert_integer(&mut self, obj: Object<'a>) -> PdfResult<i32> {
        match self.resolve(obj)? {
            Object::Integer(i) => Ok(i),
            found => Err(mismatched(ObjectType::Integer, &found)),
        }
    }

    fn assert_unsigned_integer(&mut self, obj: Object<'a>) -> PdfResult<u32> {
        match self.resolve(obj)? {
            Object::Integer(i) => Ok(u32::try_from(i)?),
            found => Err(mismatched(ObjectType::Integer, &found)),
        }
    }

    /// Either an integer, or a real
    fn assert_number(&mut self, obj: Object<'a>) -> PdfResult<f32> {
        match self.resolve(obj)? {
            Object::Integer(i) => Ok(i as f32),
            Object::Real(r) => Ok(r),
            found => Err(mismatched(ObjectType::Real, &found)),
        }
    }

    fn assert_bool(&mut self, obj: Object<'a>) -> PdfResult<bool> {
        match self.resolve(obj)? {
            Object::True => Ok(true),
            Object::False => Ok(false),
            found => Err(mismatched(ObjectType::Boolean, &found)),
        }
    }

    fn assert_name(&mut self, obj: Object<'a>) -> PdfResult<String> {
        match self.resolve(obj)? {
            Object::Name(n) => Ok(n),
            found => Err(mismatched(ObjectType::Name, &found)),
        }
    }

    fn assert_arr(&mut self, obj: Object<'a>) -> PdfResult<Vec<Object<'a>>> {
        match self.resolve(obj)? {
            Object::Array(a) => Ok(a),
            found => Err(mismatched(ObjectType::Array, &found)),
        }
    }

    fn assert_dict(&mut self, obj: Object<'a>) -> PdfResult<Dictionary<'a>> {
        match self.resolve(obj)? {
            Object::Dictionary(d) => Ok(d),
            found => Err(mismatched(ObjectType::Dictionary, &found)),
        }
    }

    fn assert_stream(&mut self, obj: Object<'a>) -> PdfResult<Stream<'a>> {
        match self.resolve(obj)? {
            Object::Stream(s) => Ok(s),
            found => Err(mismatched(ObjectType::Stream, &found)),
        }
    }

    /// Does not resolve, since the whole point is to get at the reference itself
    fn assert_reference(&mut self, obj: Object<'a>) -> PdfResult<Reference> {
        match obj {
            Object::Reference(r) => Ok(r),
            found => Err(mismatched(ObjectType::Reference, &found)),
        }
    }
}

pub trait FromObj<'a>: Sized {
    fn from_obj(obj: Object<'a>, resolver: &mut dyn Resolve<'a>) -> PdfResult<Self>;
}

impl<'a> FromObj<'a> for Object<'a> {
    fn from_obj(obj: Object<'a>, resolver: &mut dyn Resolve<'a>) -> PdfResult<Self> {
        resolver.resolve(obj)
    }
}

impl<'a> FromObj<'a> for f32 {
    fn from_obj(obj: Object<'a>, resolver: &mut dyn Resolve<'a>) -> PdfResult<Self> {
        resolver.assert_number(obj)
    }
}

impl<'a> FromObj<'a> for i32 {
    fn from_obj(obj: Object<'a>, resolver: &mut dyn Resolve<'a>) -> PdfResult<Self> {
        resolver.assert_integer(obj)
    }
}

impl<'a> FromObj<'a> for u32 {
    fn from_obj(obj: Object<'a>, resolver: &mut dyn Resolve<'a>) -> PdfResult<Self> {
        resolver.assert_unsigned_integer(obj)
    }
}

impl<'a> FromObj<'a> for usize {
    fn from_obj(obj: Object<'a>, resolver: &mut dyn Resolve<'a>) -> PdfResult<Self> {
        Ok(resolver.assert_unsigned_integer(obj)? as usize)
    }
}

impl<'a> FromObj<'a> for bool {
    fn from_obj(obj: Object<'a>, resolver: &mut dyn Resolve<'a>) -> PdfResult<Self> {
        resolver.assert_bool(obj)
    }
}

impl<'a> FromObj<'a> for String {
    fn from_obj(obj: Object<'a>, resolver: &mut dyn Resolve<'a>) -> PdfResult<Self> {
        resolver.assert_name(obj)
    }
}

impl<'a> FromObj<'a> for Dictionary<'a> {
    fn from_obj(obj: Object<'a>, resolver: &mut dyn Resolve<'a>) -> PdfResult<Self> {
        resolver.assert_dict(obj)
    }
}

impl<'a> FromObj<'a> for Stream<'a> {
    fn from_obj(obj: Object<'a>, resolver: &mut dyn Resolve<'a>) -> PdfResult<Self> {
        resolver.assert_stream(obj)
    }
}

impl<'a, T: FromObj<'a>> FromObj<'a> for Vec<T> {
    fn from_obj(obj: Object<'a>, resolver: &mut dyn Resolve<'a>) -> PdfResult<Self> {
        resolver
            .assert_arr(obj)?
            .into_iter()
            .map(|obj| T::from_obj(obj, resolver))
            .collect()
    }
}

/// An in-memory object store, standing in for the cross-reference table of a loaded
/// document. Each lookup is counted, which makes it easy to observe whether a
/// consumer re-reads objects it has already seen.
#[derive(Debug, Default)]
pub struct ObjectTable<'a> {
    objects: HashMap<Reference, Object<'a>>,
    next_object_number: usize,
    lookups: usize,
}

impl<'a> ObjectTable<'a> {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            next_object_number: 1,
            lookups: 0,
        }
    }

    pub fn insert(&mut self, reference: Reference, obj: Object<'a>) {
        self.next_object_number = self.next_object_number.max(reference.object_number + 1);
        self.objects.insert(reference, obj);
    }

    /// Stores `obj` under a fresh object number and returns a reference to it
    pub fn add(&mut self, obj: Object<'a>) -> Reference {
        let reference = Reference::new(self.next_object_number.max(1), 0);
        self.insert(reference, obj);
        reference
    }

    /// Number of times a reference has been looked up
    pub fn lookups(&self) -> usize {
        self.lookups
    }
}

impl<'a> Resolve<'a> for ObjectTable<'a> {
    fn lex_object_from_reference(&mut self, reference: Reference) -> PdfResult<Object<'a>> {
        self.lookups += 1;

        Ok(self
            .objects
            .get(&reference)
            .cloned()
            .unwrap_or(Object::Null))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_reference_is_null() {
        let mut table = ObjectTable::new();

        let obj = table.resolve(Object::Reference(Reference::new(7, 0))).unwrap();

        assert!(matches!(obj, Object::Null));
        assert_eq!(table.lookups(), 1);
    }

    #[test]
    fn resolves_chained_references() {
        let mut table = ObjectTable::new();

        let inner = table.add(Object::Integer(5));
        let outer = table.add(Object::Reference(inner));

        assert_eq!(table.assert_integer(Object::Reference(outer)).unwrap(), 5);
        assert_eq!(table.lookups(), 2);
    }

    #[test]
    fn number_accepts_integers_and_reals() {
        let mut table = ObjectTable::new();

        assert_eq!(table.assert_number(Object::Integer(3)).unwrap(), 3.0);
        assert_eq!(table.assert_number(Object::Real(0.5)).unwrap(), 0.5);
        assert!(table.assert_number(Object::name("Foo")).is_err());
    }

    #[test]
    fn vec_from_array() {
        let mut table = ObjectTable::new();

        let v = Vec::<f32>::from_obj(Object::number_array(&[0.0, 1.0, 2.5]), &mut table).unwrap();

        assert_eq!(v, vec![0.0, 1.0, 2.5]);
    }
}
