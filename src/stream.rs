use std::{borrow::Cow, fmt};

use crate::{
    error::PdfResult,
    filter::FilterKind,
    objects::{Dictionary, Object, TypeOrArray},
    Resolve,
};

#[derive(Clone)]
pub struct Stream<'a> {
    pub(crate) dict: StreamDict<'a>,
    pub(crate) stream: Cow<'a, [u8]>,
}

impl fmt::Debug for Stream<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("dict", &self.dict)
            .field("stream", &format!("[ {} bytes ]", self.stream.len()))
            .finish()
    }
}

impl<'a> Stream<'a> {
    /// Splits the stream-specific keys off of `dict`, leaving the rest in `dict.other`
    pub fn new(
        dict: Dictionary<'a>,
        stream: impl Into<Cow<'a, [u8]>>,
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<Self> {
        let stream = stream.into();
        let dict = StreamDict::from_dict(dict, stream.len(), resolver)?;

        Ok(Self { dict, stream })
    }

    pub fn dict(&self) -> &StreamDict<'a> {
        &self.dict
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.stream
    }
}

#[derive(Debug, Clone)]
pub struct StreamDict<'a> {
    pub len: usize,
    pub filter: Option<Vec<FilterKind>>,
    pub decode_parms: Option<Vec<Dictionary<'a>>>,

    /// Keys belonging to whatever the stream represents, e.g. a function dictionary
    pub other: Dictionary<'a>,
}

impl<'a> StreamDict<'a> {
    pub fn from_dict(
        mut dict: Dictionary<'a>,
        data_len: usize,
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<Self> {
        let len = dict.get::<usize>("Length", resolver)?.unwrap_or(data_len);

        let filter = dict
            .get::<TypeOrArray<FilterKind>>("Filter", resolver)?
            .map(TypeOrArray::into_vec);

        let decode_parms = match dict.get_object("DecodeParms") {
            Some(obj) => match resolver.resolve(obj)? {
                Object::Null => None,
                Object::Array(arr) => Some(
                    arr.into_iter()
                        .map(|obj| match resolver.resolve(obj)? {
                            Object::Null => Ok(Dictionary::empty()),
                            obj => resolver.assert_dict(obj),
                        })
                        .collect::<PdfResult<Vec<Dictionary>>>()?,
                ),
                obj => Some(vec![resolver.assert_dict(obj)?]),
            },
            None => None,
        };

        Ok(StreamDict {
            len,
            filter,
            decode_parms,
            other: dict,
        })
    }
}
