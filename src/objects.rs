use std::{borrow::Cow, collections::HashMap};

use crate::{
    error::{ParseError, PdfResult},
    resolve::{FromObj, Resolve},
    stream::Stream,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Null,
    Boolean,
    Integer,
    Real,
    String,
    Name,
    Array,
    Stream,
    Dictionary,
    Reference,
}

#[derive(Debug, Clone)]
pub enum Object<'a> {
    Null,
    True,
    False,
    Integer(i32),
    Real(f32),
    String(Cow<'a, [u8]>),
    Name(String),
    Array(Vec<Self>),
    Stream(Stream<'a>),
    Dictionary(Dictionary<'a>),
    Reference(Reference),
}

impl<'a> Object<'a> {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Null => ObjectType::Null,
            Self::True | Self::False => ObjectType::Boolean,
            Self::Integer(..) => ObjectType::Integer,
            Self::Real(..) => ObjectType::Real,
            Self::String(..) => ObjectType::String,
            Self::Name(..) => ObjectType::Name,
            Self::Array(..) => ObjectType::Array,
            Self::Stream(..) => ObjectType::Stream,
            Self::Dictionary(..) => ObjectType::Dictionary,
            Self::Reference(..) => ObjectType::Reference,
        }
    }

    pub fn name_is(&self, name: &str) -> bool {
        matches!(self, Self::Name(n) if n == name)
    }

    pub fn name(name: &str) -> Self {
        Self::Name(name.to_owned())
    }

    /// Convenience for building numeric arrays, e.g. `Domain` and `Range`
    pub fn number_array(numbers: &[f32]) -> Self {
        Self::Array(numbers.iter().map(|&n| Self::Real(n)).collect())
    }

    pub fn integer_array(numbers: &[i32]) -> Self {
        Self::Array(numbers.iter().map(|&n| Self::Integer(n)).collect())
    }
}

/// A reference to a non-existing object is considered a `null`
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub struct Reference {
    pub object_number: usize,
    pub generation: usize,
}

impl Reference {
    pub const fn new(object_number: usize, generation: usize) -> Self {
        Self {
            object_number,
            generation,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TypeOrArray<T> {
    Type(T),
    Array(Vec<T>),
}

impl<T> TypeOrArray<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Type(t) => vec![t],
            Self::Array(arr) => arr,
        }
    }
}

impl<'a, T: FromObj<'a>> FromObj<'a> for TypeOrArray<T> {
    fn from_obj(obj: Object<'a>, resolver: &mut dyn Resolve<'a>) -> PdfResult<Self> {
        Ok(match resolver.resolve(obj)? {
            Object::Array(arr) => TypeOrArray::Array(
                arr.into_iter()
                    .map(|obj| T::from_obj(obj, resolver))
                    .collect::<PdfResult<Vec<T>>>()?,
            ),
            obj => TypeOrArray::Type(T::from_obj(obj, resolver)?),
        })
    }
}

/// Keys are consumed as they are read, so every getter takes `&mut self`
#[derive(Debug, Clone, Default)]
pub struct Dictionary<'a> {
    dict: HashMap<String, Object<'a>>,
}

impl<'a> Dictionary<'a> {
    pub fn new(dict: HashMap<String, Object<'a>>) -> Self {
        Self { dict }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, obj: Object<'a>) {
        self.dict.insert(key.into(), obj);
    }

    /// Builder-style insert, mostly useful when constructing dictionaries by hand
    pub fn with(mut self, key: impl Into<String>, obj: Object<'a>) -> Self {
        self.insert(key, obj);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.dict.contains_key(key)
    }

    /// Returns the raw, unresolved value for `key`
    pub fn get_object(&mut self, key: &str) -> Option<Object<'a>> {
        self.dict.remove(key)
    }

    /// A key whose value is (or resolves to) `null` is treated as absent
    pub fn get<T: FromObj<'a>>(
        &mut self,
        key: &str,
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<Option<T>> {
        let obj = match self.dict.remove(key) {
            Some(obj) => resolver.resolve(obj)?,
            None => return Ok(None),
        };

        match obj {
            Object::Null => Ok(None),
            obj => T::from_obj(obj, resolver).map(Some),
        }
    }

    pub fn expect<T: FromObj<'a>>(
        &mut self,
        key: &'static str,
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<T> {
        match self.get(key, resolver)? {
            Some(v) => Ok(v),
            None => anyhow::bail!(ParseError::MissingRequiredKey { key }),
        }
    }

    pub fn get_integer(
        &mut self,
        key: &str,
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<Option<i32>> {
        self.get(key, resolver)
    }

    pub fn expect_integer(
        &mut self,
        key: &'static str,
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<i32> {
        self.expect(key, resolver)
    }

    pub fn get_number(
        &mut self,
        key: &str,
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<Option<f32>> {
        self.get(key, resolver)
    }

    pub fn expect_number(
        &mut self,
        key: &'static str,
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<f32> {
        self.expect(key, resolver)
    }

    pub fn get_name(
        &mut self,
        key: &str,
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<Option<String>> {
        self.dict
            .remove(key)
            .map(|obj| resolver.assert_name(obj))
            .transpose()
    }

    /// The array itself is resolved, but its elements are left as-is
    pub fn get_arr(
        &mut self,
        key: &str,
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<Option<Vec<Object<'a>>>> {
        self.dict
            .remove(key)
            .map(|obj| resolver.assert_arr(obj))
            .transpose()
    }

    pub fn expect_arr(
        &mut self,
        key: &'static str,
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<Vec<Object<'a>>> {
        match self.get_arr(key, resolver)? {
            Some(arr) => Ok(arr),
            None => anyhow::bail!(ParseError::MissingRequiredKey { key }),
        }
    }
}
