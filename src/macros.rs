/// Declares an enum whose variants correspond to PDF names, or with the leading `int`
/// marker, to PDF integers. Generates `from_str`/`from_integer` and a `FromObj` impl.
#[macro_export]
macro_rules! pdf_enum {
    (
        int
        $(#[$attr:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$doc:meta])*
                $variant:ident = $val:literal
            ),*$(,)?
        }
    ) => {
        $(#[$attr])*
        $vis enum $name {
            $(
                $(#[$doc])*
                $variant = $val
            ),*
        }

        impl $name {
            pub fn from_integer(i: i32) -> $crate::PdfResult<Self> {
                Ok(match i {
                    $($val => Self::$variant,)*
                    _ => anyhow::bail!($crate::ParseError::UnrecognizedVariant {
                        ty: stringify!($name),
                        found: i.to_string(),
                    }),
                })
            }
        }

        impl<'a> $crate::FromObj<'a> for $name {
            fn from_obj(
                obj: $crate::Object<'a>,
                resolver: &mut dyn $crate::Resolve<'a>,
            ) -> $crate::PdfResult<Self> {
                Self::from_integer(resolver.assert_integer(obj)?)
            }
        }
    };
    (
        $(#[$attr:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$doc:meta])*
                $variant:ident = $val:literal
            ),*$(,)?
        }
    ) => {
        $(#[$attr])*
        $vis enum $name {
            $(
                $(#[$doc])*
                $variant
            ),*
        }

        impl $name {
            pub fn from_str(s: &str) -> $crate::PdfResult<Self> {
                Ok(match s {
                    $($val => Self::$variant,)*
                    _ => anyhow::bail!($crate::ParseError::UnrecognizedVariant {
                        ty: stringify!($name),
                        found: s.to_owned(),
                    }),
                })
            }
        }

        impl<'a> $crate::FromObj<'a> for $name {
            fn from_obj(
                obj: $crate::Object<'a>,
                resolver: &mut dyn $crate::Resolve<'a>,
            ) -> $crate::PdfResult<Self> {
                Self::from_str(&resolver.assert_name(obj)?)
            }
        }
    };
}
