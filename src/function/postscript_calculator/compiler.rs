//! Compiles the branch-free subset of calculator programs into native closures.
//!
//! The program is simulated on a stack of expression trees rather than numbers. Every
//! tree carries the interval its value is known to lie in, which lets the final clamp
//! to `/Range` be dropped for outputs that can never leave it.

use std::{fmt, rc::Rc};

use crate::function::interval::Interval;

use super::{evaluator::MAX_STACK_SIZE, lexer::PostScriptFunctionOperator, parser::Instruction};

/// Scratch slots available to hoisted subexpressions
pub(crate) const MAX_REGISTERS: usize = 64;

type Registers = [f32; MAX_REGISTERS];

type Expr = Box<dyn Fn(&[f32], &Registers) -> f32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOperator {
    Add,
    Sub,
    Mul,
}

#[derive(Debug)]
enum AstNode {
    Argument {
        index: usize,
        interval: Interval,
    },
    Literal(f32),
    Variable {
        register: usize,
        interval: Interval,
    },
    Binary {
        op: BinaryOperator,
        lhs: Rc<AstNode>,
        rhs: Rc<AstNode>,
        interval: Interval,
    },
    Min {
        arg: Rc<AstNode>,
        max: f32,
    },
}

impl AstNode {
    fn interval(&self) -> Interval {
        match self {
            Self::Argument { interval, .. }
            | Self::Variable { interval, .. }
            | Self::Binary { interval, .. } => *interval,
            Self::Literal(n) => Interval::point(*n),
            Self::Min { arg, max } => arg.interval().min_with(*max),
        }
    }

    fn literal(&self) -> Option<f32> {
        match self {
            Self::Literal(n) => Some(*n),
            _ => None,
        }
    }

    fn is_literal(&self, value: f32) -> bool {
        self.literal() == Some(value)
    }

    /// Whether duplicating this node costs nothing at runtime
    fn is_trivial(&self) -> bool {
        matches!(
            self,
            Self::Argument { .. } | Self::Literal(..) | Self::Variable { .. }
        )
    }
}

fn binary(
    op: BinaryOperator,
    lhs: Rc<AstNode>,
    rhs: Rc<AstNode>,
    interval: Interval,
) -> Rc<AstNode> {
    Rc::new(AstNode::Binary {
        op,
        lhs,
        rhs,
        interval,
    })
}

fn build_add(lhs: Rc<AstNode>, rhs: Rc<AstNode>) -> Rc<AstNode> {
    if rhs.is_literal(0.0) {
        return lhs;
    }

    if lhs.is_literal(0.0) {
        return rhs;
    }

    if let (Some(a), Some(b)) = (lhs.literal(), rhs.literal()) {
        return Rc::new(AstNode::Literal(a + b));
    }

    let interval = lhs.interval() + rhs.interval();

    binary(BinaryOperator::Add, lhs, rhs, interval)
}

fn build_mul(lhs: Rc<AstNode>, rhs: Rc<AstNode>) -> Rc<AstNode> {
    if let Some(b) = rhs.literal() {
        if b == 0.0 {
            return rhs;
        }

        if b == 1.0 {
            return lhs;
        }

        if let Some(a) = lhs.literal() {
            return Rc::new(AstNode::Literal(a * b));
        }
    }

    if let Some(a) = lhs.literal() {
        if a == 0.0 {
            return lhs;
        }

        if a == 1.0 {
            return rhs;
        }
    }

    let interval = lhs.interval() * rhs.interval();

    binary(BinaryOperator::Mul, lhs, rhs, interval)
}

fn build_sub(lhs: Rc<AstNode>, rhs: Rc<AstNode>) -> Rc<AstNode> {
    if let Some(b) = rhs.literal() {
        if b == 0.0 {
            return lhs;
        }

        if let Some(a) = lhs.literal() {
            return Rc::new(AstNode::Literal(a - b));
        }
    }

    // 1 - (1 - x) = x, which shows up when inverting a component twice
    if lhs.is_literal(1.0) {
        if let AstNode::Binary {
            op: BinaryOperator::Sub,
            lhs: inner_lhs,
            rhs: inner_rhs,
            ..
        } = &*rhs
        {
            if inner_lhs.is_literal(1.0) {
                return Rc::clone(inner_rhs);
            }
        }
    }

    let interval = lhs.interval() - rhs.interval();

    binary(BinaryOperator::Sub, lhs, rhs, interval)
}

fn build_min(arg: Rc<AstNode>, max: f32) -> Rc<AstNode> {
    let interval = arg.interval();

    if interval.min >= max {
        Rc::new(AstNode::Literal(max))
    } else if interval.max <= max {
        arg
    } else {
        Rc::new(AstNode::Min { arg, max })
    }
}

#[derive(Debug)]
struct VariableDefinition {
    register: usize,
    expr: Rc<AstNode>,
}

struct AstBuilder<'p> {
    program: &'p [Instruction],
    stack: Vec<Rc<AstNode>>,
    definitions: Vec<VariableDefinition>,
}

impl<'p> AstBuilder<'p> {
    fn new(program: &'p [Instruction], domain: &[Interval]) -> Self {
        let stack = domain
            .iter()
            .enumerate()
            .map(|(index, &interval)| Rc::new(AstNode::Argument { index, interval }))
            .collect();

        Self {
            program,
            stack,
            definitions: Vec::new(),
        }
    }

    fn pop(&mut self) -> Option<Rc<AstNode>> {
        self.stack.pop()
    }

    fn push(&mut self, node: Rc<AstNode>) -> Option<()> {
        if self.stack.len() >= MAX_STACK_SIZE {
            return None;
        }

        self.stack.push(node);

        Some(())
    }

    fn pop_literal(&mut self) -> Option<f32> {
        self.pop()?.literal()
    }

    /// Moves a nontrivial expression into a register so it can be duplicated without
    /// being evaluated twice
    fn hoist(&mut self, node: Rc<AstNode>) -> Option<Rc<AstNode>> {
        if node.is_trivial() {
            return Some(node);
        }

        let register = self.definitions.len();

        if register >= MAX_REGISTERS {
            return None;
        }

        let variable = Rc::new(AstNode::Variable {
            register,
            interval: node.interval(),
        });

        self.definitions.push(VariableDefinition {
            register,
            expr: node,
        });

        Some(variable)
    }

    /// `dup N gt { pop N } if`, a clamp to a maximum value
    fn is_min_pattern(&self, dup_location: usize) -> Option<f32> {
        use PostScriptFunctionOperator as Op;

        let i = dup_location;

        match *self.program.get(i + 1..i + 6)? {
            [
                Instruction::Number(n),
                Instruction::Operator(Op::Gt),
                Instruction::JumpIfFalse(target),
                Instruction::Operator(Op::Pop),
                Instruction::Number(m),
            ] if target == i + 6 && n == m => Some(n),
            _ => None,
        }
    }

    fn build(mut self) -> Option<(Vec<VariableDefinition>, Vec<Rc<AstNode>>)> {
        use PostScriptFunctionOperator as Op;

        let mut i = 0;

        while let Some(&instruction) = self.program.get(i) {
            let op = match instruction {
                Instruction::Number(n) => {
                    self.push(Rc::new(AstNode::Literal(n)))?;
                    i += 1;
                    continue;
                }
                Instruction::Operator(op) => op,
                Instruction::Jump(..) | Instruction::JumpIfFalse(..) => return None,
            };

            match op {
                Op::Add => {
                    let rhs = self.pop()?;
                    let lhs = self.pop()?;
                    self.push(build_add(lhs, rhs))?;
                }
                Op::Sub => {
                    let rhs = self.pop()?;
                    let lhs = self.pop()?;
                    self.push(build_sub(lhs, rhs))?;
                }
                Op::Mul => {
                    let rhs = self.pop()?;
                    let lhs = self.pop()?;
                    self.push(build_mul(lhs, rhs))?;
                }
                Op::Cvr => {
                    self.stack.last()?;
                }
                Op::Exch => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.push(b)?;
                    self.push(a)?;
                }
                Op::Pop => {
                    self.pop()?;
                }
                Op::Dup => {
                    if let Some(max) = self.is_min_pattern(i) {
                        let arg = self.pop()?;
                        self.push(build_min(arg, max))?;
                        i += 6;
                        continue;
                    }

                    let top = self.pop()?;
                    let top = self.hoist(top)?;
                    self.push(Rc::clone(&top))?;
                    self.push(top)?;
                }
                Op::Index => {
                    let n = self.pop_literal()?;

                    if n < 0.0 || n.fract() != 0.0 || n as usize >= self.stack.len() {
                        return None;
                    }

                    let location = self.stack.len() - n as usize - 1;
                    let node = Rc::clone(&self.stack[location]);
                    let node = self.hoist(node)?;

                    self.stack[location] = Rc::clone(&node);
                    self.push(node)?;
                }
                Op::Roll => {
                    let j = self.pop_literal()?;
                    let n = self.pop_literal()?;

                    if n <= 0.0
                        || n.fract() != 0.0
                        || j.fract() != 0.0
                        || n as usize > self.stack.len()
                    {
                        return None;
                    }

                    let n = n as usize;
                    let shift = (j as i64).rem_euclid(n as i64) as usize;

                    let start = self.stack.len() - n;
                    self.stack[start..].rotate_right(shift);
                }
                _ => return None,
            }

            i += 1;
        }

        Some((self.definitions, self.stack))
    }
}

fn codegen(node: &AstNode, domain: &[Interval]) -> Expr {
    match *node {
        AstNode::Argument { index, .. } => {
            let domain = domain[index];
            Box::new(move |src: &[f32], _: &Registers| domain.clamp(src[index]))
        }
        AstNode::Literal(n) => Box::new(move |_: &[f32], _: &Registers| n),
        AstNode::Variable { register, .. } => {
            Box::new(move |_: &[f32], registers: &Registers| registers[register])
        }
        AstNode::Binary {
            op, ref lhs, ref rhs, ..
        } => {
            let lhs = codegen(lhs, domain);
            let rhs = codegen(rhs, domain);

            match op {
                BinaryOperator::Add => {
                    Box::new(move |src: &[f32], r: &Registers| lhs(src, r) + rhs(src, r))
                }
                BinaryOperator::Sub => {
                    Box::new(move |src: &[f32], r: &Registers| lhs(src, r) - rhs(src, r))
                }
                BinaryOperator::Mul => {
                    Box::new(move |src: &[f32], r: &Registers| lhs(src, r) * rhs(src, r))
                }
            }
        }
        AstNode::Min { ref arg, max } => {
            let arg = codegen(arg, domain);

            Box::new(move |src: &[f32], r: &Registers| {
                let value = arg(src, r);

                if value > max {
                    max
                } else {
                    value
                }
            })
        }
    }
}

struct CompiledDefinition {
    register: usize,
    expr: Expr,
}

struct CompiledOutput {
    expr: Expr,

    /// Only present when the inferred interval can fall below `/Range`
    lower: Option<f32>,

    /// Only present when the inferred interval can rise above `/Range`
    upper: Option<f32>,
}

/// A calculator program lowered to straight-line native code
pub(crate) struct CompiledProgram {
    definitions: Vec<CompiledDefinition>,
    outputs: Vec<CompiledOutput>,
}

impl fmt::Debug for CompiledProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledProgram")
            .field("definitions", &self.definitions.len())
            .field(
                "clamps",
                &self
                    .outputs
                    .iter()
                    .map(|out| (out.lower, out.upper))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl CompiledProgram {
    /// Returns `None` if the program uses anything outside the compilable subset
    pub fn compile(
        program: &[Instruction],
        domain: &[Interval],
        range: &[Interval],
    ) -> Option<Self> {
        let (definitions, outputs) = AstBuilder::new(program, domain).build()?;

        if outputs.len() != range.len() {
            return None;
        }

        let definitions = definitions
            .iter()
            .map(|def| CompiledDefinition {
                register: def.register,
                expr: codegen(&def.expr, domain),
            })
            .collect();

        let outputs = outputs
            .iter()
            .zip(range)
            .map(|(node, range)| {
                let interval = node.interval();

                CompiledOutput {
                    expr: codegen(node, domain),
                    lower: (range.min > interval.min).then_some(range.min),
                    upper: (range.max < interval.max).then_some(range.max),
                }
            })
            .collect();

        Some(Self {
            definitions,
            outputs,
        })
    }

    pub fn execute(&self, src: &[f32], dest: &mut [f32]) {
        let mut registers = [0.0; MAX_REGISTERS];

        for def in &self.definitions {
            let value = (def.expr)(src, &registers);
            registers[def.register] = value;
        }

        for (out, output) in dest.iter_mut().zip(&self.outputs) {
            let mut value = (output.expr)(src, &registers);

            if let Some(lower) = output.lower {
                if value < lower {
                    value = lower;
                }
            }

            if let Some(upper) = output.upper {
                if value > upper {
                    value = upper;
                }
            }

            *out = value;
        }
    }

    #[cfg(test)]
    fn clamps(&self) -> Vec<(Option<f32>, Option<f32>)> {
        self.outputs.iter().map(|out| (out.lower, out.upper)).collect()
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;
    use crate::function::postscript_calculator::{
        evaluator::PostScriptEvaluator, parser::PostScriptFunctionParser,
    };

    fn parse(program: &str) -> Vec<Instruction> {
        PostScriptFunctionParser::new(program.as_bytes())
            .parse()
            .unwrap()
    }

    fn compile(program: &str, domain: &[Interval], range: &[Interval]) -> Option<CompiledProgram> {
        CompiledProgram::compile(&parse(program), domain, range)
    }

    fn run(compiled: &CompiledProgram, src: &[f32], outputs: usize) -> Vec<f32> {
        let mut dest = vec![0.0; outputs];
        compiled.execute(src, &mut dest);
        dest
    }

    #[test]
    fn clamps_are_omitted_when_range_is_satisfied() {
        let unit = [Interval::UNIT];

        let compiled = compile("{ 2 mul 0.5 add }", &unit, &[Interval::new(0.0, 3.0)]).unwrap();
        assert_eq!(compiled.clamps(), [(None, None)]);
        assert_eq!(run(&compiled, &[0.5], 1), [1.5]);

        let compiled = compile("{ 2 mul 0.5 add }", &unit, &unit).unwrap();
        assert_eq!(compiled.clamps(), [(None, Some(1.0))]);
        assert_eq!(run(&compiled, &[0.5], 1), [1.0]);

        let compiled = compile("{ 0.5 sub }", &unit, &unit).unwrap();
        assert_eq!(compiled.clamps(), [(Some(0.0), None)]);
        assert_eq!(run(&compiled, &[0.25], 1), [0.0]);
    }

    #[test]
    fn inputs_are_clamped_to_domain() {
        let compiled = compile("{ }", &[Interval::UNIT], &[Interval::new(-10.0, 10.0)]).unwrap();

        assert_eq!(run(&compiled, &[5.0], 1), [1.0]);
        assert_eq!(run(&compiled, &[-5.0], 1), [0.0]);
    }

    #[test]
    fn min_pattern_is_folded() {
        let unit = [Interval::UNIT];
        let compiled = compile("{ dup 0.5 gt { pop 0.5 } if }", &unit, &unit).unwrap();

        assert_eq!(compiled.clamps(), [(None, None)]);
        assert_eq!(run(&compiled, &[0.75], 1), [0.5]);
        assert_eq!(run(&compiled, &[0.25], 1), [0.25]);

        // a bound above the whole domain folds away entirely
        let compiled = compile("{ dup 2 gt { pop 2 } if }", &unit, &unit).unwrap();
        assert!(compiled.definitions.is_empty());
        assert_eq!(run(&compiled, &[0.75], 1), [0.75]);

        // a different bound in the branch is not the clamp pattern
        assert!(compile("{ dup 0.5 gt { pop 0.25 } if }", &unit, &unit).is_none());
    }

    #[test]
    fn dup_hoists_nontrivial_expressions() {
        let unit = [Interval::UNIT];
        let compiled = compile("{ 0.5 add dup mul }", &unit, &[Interval::new(0.0, 4.0)]).unwrap();

        assert_eq!(compiled.definitions.len(), 1);
        assert_eq!(run(&compiled, &[0.5], 1), [1.0]);

        let compiled = compile("{ dup mul }", &unit, &unit).unwrap();
        assert!(compiled.definitions.is_empty());
    }

    #[test]
    fn index_and_roll() {
        let domain = [Interval::UNIT; 3];
        let range = [Interval::UNIT; 3];

        let compiled = compile("{ 3 1 roll }", &domain, &range).unwrap();
        assert_eq!(run(&compiled, &[0.1, 0.2, 0.3], 3), [0.3, 0.1, 0.2]);

        let compiled = compile("{ 3 -1 roll }", &domain, &range).unwrap();
        assert_eq!(run(&compiled, &[0.1, 0.2, 0.3], 3), [0.2, 0.3, 0.1]);

        let compiled = compile("{ 2 index exch pop exch pop }", &domain, &[Interval::UNIT; 2]);
        let compiled = compiled.unwrap();
        assert_eq!(run(&compiled, &[0.1, 0.2, 0.3], 2), [0.1, 0.1]);

        // roll operands must be known when compiling
        assert!(compile("{ 1 roll }", &[Interval::UNIT; 2], &[]).is_none());
    }

    #[test]
    fn double_inversion_cancels() {
        let unit = [Interval::UNIT];
        let compiled = compile("{ 1 exch sub 1 exch sub }", &unit, &unit).unwrap();

        assert_eq!(run(&compiled, &[0.3], 1), [0.3]);
    }

    #[test]
    fn identities() {
        let unit = [Interval::UNIT];
        let compiled = compile("{ 0 add 1 mul 0 sub 2 3 mul 6 sub add }", &unit, &unit).unwrap();

        assert!(compiled.definitions.is_empty());
        assert_eq!(compiled.clamps(), [(None, None)]);
        assert_eq!(run(&compiled, &[0.25], 1), [0.25]);

        let compiled = compile("{ 0 mul }", &unit, &unit).unwrap();
        assert_eq!(compiled.clamps(), [(None, None)]);
        assert_eq!(run(&compiled, &[0.25], 1), [0.0]);
    }

    #[test]
    fn not_compilable() {
        let unit = [Interval::UNIT];

        assert!(compile("{ sin }", &unit, &unit).is_none());
        assert!(compile("{ 0.5 gt { 1 } { 0 } ifelse }", &unit, &unit).is_none());
        assert!(compile("{ dup }", &unit, &unit).is_none());
        assert!(compile("{ pop pop }", &unit, &unit).is_none());
        assert!(compile("{ 1.5 index }", &unit, &unit).is_none());
    }

    #[test]
    fn register_exhaustion() {
        let unit = [Interval::UNIT];
        let program = format!("{{ {} }}", "0.5 add dup mul ".repeat(MAX_REGISTERS + 1));

        assert!(compile(&program, &unit, &[Interval::new(0.0, 1e30)]).is_none());

        let program = format!("{{ {} }}", "0.5 add dup mul ".repeat(MAX_REGISTERS));
        assert!(compile(&program, &unit, &[Interval::new(0.0, 1e30)]).is_some());
    }

    const EQUIVALENCE_PROGRAMS: &[(&str, usize, usize)] = &[
        ("{ 2 mul 0.5 add }", 1, 1),
        ("{ dup 0.5 gt { pop 0.5 } if }", 1, 1),
        ("{ 1 exch sub dup 0.3 gt { pop 0.3 } if 1 exch sub }", 1, 1),
        ("{ exch 1 exch sub mul 0.25 add dup 3 mul }", 2, 2),
        ("{ 3 1 roll sub mul }", 3, 1),
        ("{ 0.5 sub dup mul exch 0.5 sub dup mul add dup 2 mul }", 2, 2),
        ("{ 2 index 2 index add exch pop exch pop exch cvr 0.5 mul }", 3, 2),
        ("{ dup 0.9 mul exch 0.1 mul 0.4 add }", 1, 2),
    ];

    fn interpret(
        instructions: Vec<Instruction>,
        src: &[f32],
        domain: Interval,
        range: Interval,
    ) -> Vec<f32> {
        let clamped = src.iter().map(|&x| domain.clamp(x)).collect::<Vec<f32>>();

        PostScriptEvaluator::new(instructions)
            .execute(&clamped)
            .unwrap()
            .into_iter()
            .map(|value| range.clamp(value.to_output()))
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Compiled and interpreted programs agree for inputs in and around the domain
        #[test]
        fn compiled_matches_interpreted(src in proptest::collection::vec(-0.25f32..1.25, 3)) {
            let range = Interval::new(0.0, 1.0);

            for &(program, inputs, outputs) in EQUIVALENCE_PROGRAMS {
                let instructions = parse(program);

                let compiled = CompiledProgram::compile(
                    &instructions,
                    &vec![Interval::UNIT; inputs],
                    &vec![range; outputs],
                );
                prop_assert!(compiled.is_some(), "{} did not compile", program);

                let actual = run(&compiled.unwrap(), &src[..inputs], outputs);
                let expected = interpret(instructions, &src[..inputs], Interval::UNIT, range);

                prop_assert_eq!(actual.len(), expected.len());

                for (a, e) in actual.iter().zip(&expected) {
                    prop_assert!(
                        (a - e).abs() < 1e-6,
                        "{}: {:?} vs {:?}", program, actual, expected
                    );
                }
            }
        }
    }
}
