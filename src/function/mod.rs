use std::{collections::HashMap, rc::Rc};

use anyhow::Context;

use crate::{
    error::{ParseError, PdfResult},
    objects::{Dictionary, Object, ObjectType, Reference},
    stream::Stream,
    Resolve,
};

pub use self::{
    exponential_interpolation::ExponentialInterpolationFunction,
    interval::Interval,
    postscript_calculator::{PostScriptCalculatorFunction, PostScriptFunctionError},
    sampled::SampledFunction,
    stitching::StitchingFunction,
};

mod exponential_interpolation;
mod interval;
mod postscript_calculator;
mod sampled;
mod stitching;

/// A pure numeric transform from m inputs to n outputs
#[derive(Debug)]
pub struct Function {
    /// An array of 2 * m numbers, where m shall be the number of input values.
    /// For each i from 0 to m - 1, Domain2i shall be less than or equal to Domain2i+1,
    /// and the ith input value, xi, shall lie in the interval Domain2i <= xi <= Domain2i+1.
    /// Input values outside the declared domain shall be clipped to the nearest boundary
    /// value.
    domain: Vec<Interval>,

    /// An array of 2 * n numbers, where n shall be the number of output values. For
    /// each j from 0 to n - 1, Range2j shall be less than or equal to Range2j+1,
    /// and the jth output value, yj , shall lie in the interval Range2j <= yj <= Range2j+1.
    /// Output values outside the declared range shall be clipped to the nearest
    /// boundary value. If this entry is absent, no clipping shall be done.
    ///
    /// Required for type 0 and type 4 functions
    range: Option<Vec<Interval>>,

    output_size: usize,

    subtype: FunctionSubtype,
}

impl Function {
    pub fn input_size(&self) -> usize {
        self.domain.len()
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn domain(&self) -> &[Interval] {
        &self.domain
    }

    pub fn range(&self) -> Option<&[Interval]> {
        self.range.as_deref()
    }

    /// Reads `input_size()` values from `src` and writes `output_size()` values to `dest`.
    ///
    /// Longer slices are fine, and the values past the ends are left untouched.
    pub fn eval(&self, src: &[f32], dest: &mut [f32]) -> PdfResult<()> {
        let inputs = self.input_size();
        let outputs = self.output_size();

        if src.len() < inputs {
            anyhow::bail!(
                "function takes {} inputs, but only {} were given",
                inputs,
                src.len()
            );
        }

        if dest.len() < outputs {
            anyhow::bail!(
                "function produces {} outputs, but there is only space for {}",
                outputs,
                dest.len()
            );
        }

        let src = &src[..inputs];
        let dest = &mut dest[..outputs];

        match &self.subtype {
            FunctionSubtype::Sampled(f) => {
                f.eval(&self.domain, self.range.as_deref().unwrap_or(&[]), src, dest)
            }
            FunctionSubtype::ExponentialInterpolation(f) => f.eval(self.domain[0], src[0], dest),
            FunctionSubtype::Stitching(f) => f.eval(self.domain[0], src[0], dest)?,
            FunctionSubtype::PostScriptCalculator(f) => return f.eval(src, dest),
        }

        if let Some(range) = &self.range {
            for (out, range) in dest.iter_mut().zip(range) {
                *out = range.clamp(*out);
            }
        }

        Ok(())
    }

    /// Whether a type 4 function runs as native code rather than through the interpreter
    pub fn is_compiled(&self) -> bool {
        match &self.subtype {
            FunctionSubtype::PostScriptCalculator(f) => f.is_compiled(),
            _ => false,
        }
    }
}

#[derive(Debug)]
enum FunctionSubtype {
    Sampled(SampledFunction),
    ExponentialInterpolation(ExponentialInterpolationFunction),
    Stitching(StitchingFunction),
    PostScriptCalculator(PostScriptCalculatorFunction),
}

#[derive(Debug)]
pub(crate) enum StreamOrDict<'a> {
    Stream(Stream<'a>),
    Dict(Dictionary<'a>),
}

impl<'a> StreamOrDict<'a> {
    pub fn dict(&mut self) -> &mut Dictionary<'a> {
        match self {
            Self::Dict(dict) => dict,
            Self::Stream(stream) => &mut stream.dict.other,
        }
    }

    pub fn expect_stream(self) -> PdfResult<Stream<'a>> {
        match self {
            Self::Dict(..) => anyhow::bail!(ParseError::MismatchedObjectType {
                expected: ObjectType::Stream,
                found: "Dictionary".to_owned(),
            }),
            Self::Stream(stream) => Ok(stream),
        }
    }
}

pdf_enum!(
    int
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum FunctionType {
        Sampled = 0,
        ExponentialInterpolation = 2,
        Stitching = 3,
        PostScriptCalculator = 4,
    }
);

/// Builds functions from their objects, remembering every function that was reached
/// through an indirect reference so that it is parsed only once.
///
/// A factory is not thread safe; each worker should own its own.
#[derive(Debug, Default)]
pub struct FunctionFactory {
    cache: HashMap<Reference, Rc<Function>>,
    array_cache: HashMap<Reference, ParsedFunction>,

    /// References currently being parsed, used to reject functions that contain themselves
    parsing: Vec<Reference>,

    parsed: usize,
}

impl FunctionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of function objects parsed so far, including sub-functions
    pub fn parsed_count(&self) -> usize {
        self.parsed
    }

    pub fn create<'a>(
        &mut self,
        obj: Object<'a>,
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<Rc<Function>> {
        let reference = match obj {
            Object::Reference(reference) => Some(reference),
            _ => None,
        };

        if let Some(reference) = reference {
            if let Some(function) = self.cache.get(&reference) {
                log::debug!("function cache hit for {:?}", reference);
                return Ok(Rc::clone(function));
            }

            if self.parsing.contains(&reference) {
                anyhow::bail!(ParseError::InvalidFunction(format!(
                    "function {} {} R contains itself",
                    reference.object_number, reference.generation
                )));
            }

            log::debug!("function cache miss for {:?}", reference);
            self.parsing.push(reference);
        }

        let function = self.parse(obj, resolver);

        if reference.is_some() {
            self.parsing.pop();
        }

        let function = Rc::new(function?);

        if let Some(reference) = reference {
            self.cache.insert(reference, Rc::clone(&function));
        }

        Ok(function)
    }

    /// Like [`FunctionFactory::create`], but also accepts an array of 1-output functions
    /// which together act as one function whose outputs are theirs, in order
    pub fn create_from_array<'a>(
        &mut self,
        obj: Object<'a>,
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<ParsedFunction> {
        let reference = match obj {
            Object::Reference(reference) => Some(reference),
            _ => None,
        };

        if let Some(function) = reference.and_then(|r| self.array_cache.get(&r)) {
            return Ok(function.clone());
        }

        let parsed = match resolver.resolve(obj.clone())? {
            Object::Array(arr) => {
                let functions = arr
                    .into_iter()
                    .map(|obj| self.create(obj, resolver))
                    .collect::<PdfResult<Vec<Rc<Function>>>>()?;

                let input_size = match functions.first() {
                    Some(f) => f.input_size(),
                    None => anyhow::bail!(ParseError::InvalidFunction(
                        "an array of functions must not be empty".to_owned()
                    )),
                };

                if let Some(f) = functions
                    .iter()
                    .find(|f| f.output_size() != 1 || f.input_size() != input_size)
                {
                    anyhow::bail!(ParseError::InvalidFunction(format!(
                        "functions in an array must be {}-in, 1-out; found {}-in, {}-out",
                        input_size,
                        f.input_size(),
                        f.output_size()
                    )));
                }

                ParsedFunction::Array(functions)
            }
            _ => ParsedFunction::Single(self.create(obj, resolver)?),
        };

        if let Some(reference) = reference {
            self.array_cache.insert(reference, parsed.clone());
        }

        Ok(parsed)
    }

    fn parse<'a>(
        &mut self,
        obj: Object<'a>,
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<Function> {
        self.parsed += 1;

        let mut stream_or_dict = match resolver.resolve(obj)? {
            Object::Stream(stream) => StreamOrDict::Stream(stream),
            Object::Dictionary(dict) => StreamOrDict::Dict(dict),
            obj => anyhow::bail!(ParseError::MismatchedObjectTypeAny {
                expected: &[ObjectType::Stream, ObjectType::Dictionary],
                found: format!("{:?}", obj.object_type()),
            }),
        };

        let dict = stream_or_dict.dict();

        let function_type = dict.expect::<FunctionType>("FunctionType", resolver)?;
        let domain = dict.expect::<Vec<f32>>("Domain", resolver)?;
        let domain = Interval::ordered_pairs(&domain, "Domain")?;
        let range = dict
            .get::<Vec<f32>>("Range", resolver)?
            .map(|range| Interval::ordered_pairs(&range, "Range"))
            .transpose()?;

        if domain.is_empty() {
            anyhow::bail!(ParseError::InvalidFunction(
                "/Domain must not be empty".to_owned()
            ));
        }

        let subtype = self
            .parse_subtype(
                function_type,
                stream_or_dict,
                &domain,
                range.as_deref(),
                resolver,
            )
            .with_context(|| format!("invalid FunctionType {} function", function_type as i32))?;

        let output_size = match &subtype {
            FunctionSubtype::ExponentialInterpolation(f) => f.output_size(),
            FunctionSubtype::Stitching(f) => f.output_size(),
            FunctionSubtype::Sampled(..) | FunctionSubtype::PostScriptCalculator(..) => {
                range.as_ref().map_or(0, Vec::len)
            }
        };

        if let Some(range) = &range {
            if range.len() != output_size {
                anyhow::bail!(ParseError::ArrayOfInvalidLength {
                    expected: output_size * 2,
                    found: range.len() * 2,
                });
            }
        }

        Ok(Function {
            domain,
            range,
            output_size,
            subtype,
        })
    }

    fn parse_subtype<'a>(
        &mut self,
        function_type: FunctionType,
        mut stream_or_dict: StreamOrDict<'a>,
        domain: &[Interval],
        range: Option<&[Interval]>,
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<FunctionSubtype> {
        let require_range = || range.ok_or(ParseError::MissingRequiredKey { key: "Range" });

        Ok(match function_type {
            FunctionType::Sampled => FunctionSubtype::Sampled(SampledFunction::from_stream(
                stream_or_dict.expect_stream()?,
                domain,
                require_range()?,
                resolver,
            )?),
            FunctionType::ExponentialInterpolation => {
                if domain.len() != 1 {
                    anyhow::bail!(ParseError::InvalidFunction(format!(
                        "exponential functions take exactly 1 input, found a /Domain of {}",
                        domain.len()
                    )));
                }

                FunctionSubtype::ExponentialInterpolation(
                    ExponentialInterpolationFunction::from_dict(stream_or_dict.dict(), resolver)?,
                )
            }
            FunctionType::Stitching => FunctionSubtype::Stitching(StitchingFunction::from_dict(
                stream_or_dict.dict(),
                domain,
                self,
                resolver,
            )?),
            FunctionType::PostScriptCalculator => {
                FunctionSubtype::PostScriptCalculator(PostScriptCalculatorFunction::from_stream(
                    stream_or_dict.expect_stream()?,
                    domain,
                    require_range()?,
                    resolver,
                )?)
            }
        })
    }
}

/// The result of [`FunctionFactory::create_from_array`]
#[derive(Debug, Clone)]
pub enum ParsedFunction {
    Single(Rc<Function>),

    /// Every function receives the same input, and function `i` writes output `i`
    Array(Vec<Rc<Function>>),
}

impl ParsedFunction {
    pub fn input_size(&self) -> usize {
        match self {
            Self::Single(f) => f.input_size(),
            Self::Array(functions) => functions.first().map_or(0, |f| f.input_size()),
        }
    }

    pub fn output_size(&self) -> usize {
        match self {
            Self::Single(f) => f.output_size(),
            Self::Array(functions) => functions.len(),
        }
    }

    pub fn eval(&self, src: &[f32], dest: &mut [f32]) -> PdfResult<()> {
        match self {
            Self::Single(f) => f.eval(src, dest),
            Self::Array(functions) => {
                if dest.len() < functions.len() {
                    anyhow::bail!(
                        "function produces {} outputs, but there is only space for {}",
                        functions.len(),
                        dest.len()
                    );
                }

                for (i, f) in functions.iter().enumerate() {
                    f.eval(src, &mut dest[i..=i])?;
                }

                Ok(())
            }
        }
    }
}

/// Halftone spot function, mapping a position within a halftone cell to a priority
#[derive(Debug, Clone)]
pub enum SpotFunction {
    Predefined(PredefinedSpotFunction),
    Function(Rc<Function>),
}

impl SpotFunction {
    /// An array of names lists spot functions in order of preference; the first one that
    /// is recognized is used
    pub fn from_obj<'a>(
        obj: Object<'a>,
        factory: &mut FunctionFactory,
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<Self> {
        let resolved = resolver.resolve(obj.clone())?;

        match resolved {
            Object::Name(ref name) => {
                return Ok(SpotFunction::Predefined(PredefinedSpotFunction::from_str(name)?))
            }
            Object::Array(names) => {
                for name in names {
                    let name = resolver.assert_name(name)?;

                    if let Ok(spot) = PredefinedSpotFunction::from_str(&name) {
                        return Ok(SpotFunction::Predefined(spot));
                    }

                    log::debug!("skipping unknown spot function {}", name);
                }

                anyhow::bail!(ParseError::InvalidFunction(
                    "no recognized spot function in array".to_owned()
                ));
            }
            _ => {}
        }

        let function = factory.create(obj, resolver)?;

        if function.input_size() != 2 || function.output_size() != 1 {
            anyhow::bail!(ParseError::InvalidFunction(format!(
                "spot functions must be 2-in, 1-out; found {}-in, {}-out",
                function.input_size(),
                function.output_size()
            )));
        }

        Ok(SpotFunction::Function(function))
    }

    pub fn eval(&self, x: f32, y: f32) -> PdfResult<f32> {
        match self {
            Self::Predefined(spot) => Ok(spot.eval(x, y)),
            Self::Function(f) => {
                let mut out = [0.0];
                f.eval(&[x, y], &mut out)?;
                Ok(out[0])
            }
        }
    }
}

pdf_enum!(
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum PredefinedSpotFunction {
        SimpleDot = "SimpleDot",
        InvertedSimpleDot = "InvertedSimpleDot",
        DoubleDot = "DoubleDot",
        InvertedDoubleDot = "InvertedDoubleDot",
        CosineDot = "CosineDot",
        Double = "Double",
        InvertedDouble = "InvertedDouble",
        Line = "Line",
        LineX = "LineX",
        LineY = "LineY",
        Round = "Round",
        Ellipse = "Ellipse",
        EllipseA = "EllipseA",
        InvertedEllipseA = "InvertedEllipseA",
        EllipseB = "EllipseB",
        EllipseC = "EllipseC",
        InvertedEllipseC = "InvertedEllipseC",
        Square = "Square",
        Cross = "Cross",
        Rhomboid = "Rhomboid",
        Diamond = "Diamond",
    }
);

impl PredefinedSpotFunction {
    /// `x` and `y` are in `[-1, 1]`. Angles are in degrees
    pub fn eval(self, x: f32, y: f32) -> f32 {
        let sin = |degrees: f32| degrees.to_radians().sin();
        let cos = |degrees: f32| degrees.to_radians().cos();

        let (ax, ay) = (x.abs(), y.abs());

        match self {
            Self::SimpleDot => 1.0 - (x * x + y * y),
            Self::InvertedSimpleDot => x * x + y * y - 1.0,
            Self::DoubleDot => (sin(x * 360.0) + sin(y * 360.0)) / 2.0,
            Self::InvertedDoubleDot => -(sin(x * 360.0) + sin(y * 360.0)) / 2.0,
            Self::CosineDot => (cos(x * 180.0) + cos(y * 180.0)) / 2.0,
            Self::Double => (sin(x * 180.0) + sin(y * 360.0)) / 2.0,
            Self::InvertedDouble => -(sin(x * 180.0) + sin(y * 360.0)) / 2.0,
            Self::Line => -ay,
            Self::LineX => x,
            Self::LineY => y,
            Self::Round => {
                if ax + ay <= 1.0 {
                    1.0 - (x * x + y * y)
                } else {
                    (ax - 1.0).powi(2) + (ay - 1.0).powi(2) - 1.0
                }
            }
            Self::Ellipse => {
                let w = 3.0 * ax + 4.0 * ay - 3.0;

                if w < 0.0 {
                    1.0 - (x * x + (ay / 0.75).powi(2)) / 4.0
                } else if w > 1.0 {
                    ((1.0 - ax).powi(2) + ((1.0 - ay) / 0.75).powi(2)) / 4.0 - 1.0
                } else {
                    0.5 - w
                }
            }
            Self::EllipseA => 1.0 - (x * x + 0.9 * y * y),
            Self::InvertedEllipseA => x * x + 0.9 * y * y - 1.0,
            Self::EllipseB => 1.0 - (x * x + 0.625 * y * y).sqrt(),
            Self::EllipseC => 1.0 - (0.9 * x * x + y * y),
            Self::InvertedEllipseC => 0.9 * x * x + y * y - 1.0,
            Self::Square => -ax.max(ay),
            Self::Cross => -ax.min(ay),
            Self::Rhomboid => (0.9 * ax + ay) / 2.0,
            Self::Diamond => {
                let t = ax + ay;

                if t <= 0.75 {
                    1.0 - (x * x + y * y)
                } else if t <= 1.23 {
                    1.0 - (0.85 * ax + ay)
                } else {
                    (ax - 1.0).powi(2) + (ay - 1.0).powi(2) - 1.0
                }
            }
        }
    }
}

/// Maps a color component to an adjusted value for the output device
#[derive(Debug, Clone)]
pub enum TransferFunction {
    Identity,

    /// The device's default transfer function
    Default,

    Single(Rc<Function>),

    /// One curve per colorant, in the order cyan, magenta, yellow, black (or red, green,
    /// blue, gray). `None` is the identity
    Colorants([Option<Rc<Function>>; 4]),
}

impl TransferFunction {
    pub fn from_obj<'a>(
        obj: Object<'a>,
        factory: &mut FunctionFactory,
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<Self> {
        match resolver.resolve(obj.clone())? {
            Object::Name(name) => match name.as_str() {
                "Identity" => Ok(TransferFunction::Identity),
                "Default" => Ok(TransferFunction::Default),
                _ => anyhow::bail!(ParseError::UnrecognizedVariant {
                    found: name,
                    ty: "TransferFunction",
                }),
            },
            Object::Array(arr) => {
                let colorants = arr
                    .into_iter()
                    .map(|obj| Self::colorant(obj, factory, resolver))
                    .collect::<PdfResult<Vec<Option<Rc<Function>>>>>()?;

                let found = colorants.len();

                let colorants = <[Option<Rc<Function>>; 4]>::try_from(colorants)
                    .map_err(|_| ParseError::ArrayOfInvalidLength { expected: 4, found })?;

                Ok(TransferFunction::Colorants(colorants))
            }
            _ => Ok(TransferFunction::Single(Self::curve(obj, factory, resolver)?)),
        }
    }

    fn colorant<'a>(
        obj: Object<'a>,
        factory: &mut FunctionFactory,
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<Option<Rc<Function>>> {
        if resolver.resolve(obj.clone())?.name_is("Identity") {
            return Ok(None);
        }

        Self::curve(obj, factory, resolver).map(Some)
    }

    fn curve<'a>(
        obj: Object<'a>,
        factory: &mut FunctionFactory,
        resolver: &mut dyn Resolve<'a>,
    ) -> PdfResult<Rc<Function>> {
        let function = factory.create(obj, resolver)?;

        if function.input_size() != 1 || function.output_size() != 1 {
            anyhow::bail!(ParseError::InvalidFunction(format!(
                "transfer functions must be 1-in, 1-out; found {}-in, {}-out",
                function.input_size(),
                function.output_size()
            )));
        }

        Ok(function)
    }

    /// Maps `value` through the curve for `colorant`, which is only consulted when there
    /// is one curve per colorant
    pub fn apply(&self, colorant: usize, value: f32) -> PdfResult<f32> {
        let function = match self {
            Self::Identity | Self::Default => return Ok(value),
            Self::Single(f) => f,
            Self::Colorants(colorants) => match colorants.get(colorant) {
                Some(Some(f)) => f,
                Some(None) => return Ok(value),
                None => anyhow::bail!("transfer functions have 4 colorants, not {}", colorant + 1),
            },
        };

        let mut out = [0.0];
        function.eval(&[value], &mut out)?;

        Ok(out[0])
    }
}
