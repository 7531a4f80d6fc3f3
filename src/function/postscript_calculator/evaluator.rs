use super::{
    error::{PostScriptFunctionError, PostScriptFunctionResult},
    lexer::PostScriptFunctionOperator,
    parser::Instruction,
};

pub(crate) const MAX_STACK_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Value {
    Number(f32),
    Bool(bool),
}

impl Value {
    fn as_number(self) -> PostScriptFunctionResult<f32> {
        match self {
            Self::Number(n) => Ok(n),
            Self::Bool(..) => Err(PostScriptFunctionError::TypeCheck),
        }
    }

    /// Booleans left on the stack at the end of a program become 1 or 0
    pub fn to_output(self) -> f32 {
        match self {
            Self::Number(n) => n,
            Self::Bool(b) => b as u8 as f32,
        }
    }
}

/// Converts a number to an integer operand, truncating toward zero.
///
/// Non-finite values have no integer representation and become 0.
fn to_i32(n: f32) -> i32 {
    if n.is_finite() {
        n as i32
    } else {
        0
    }
}

/// Booleans mixed with numbers take part in bitwise operators as 0 or 1
fn to_bits(value: Value) -> i32 {
    match value {
        Value::Number(n) => to_i32(n),
        Value::Bool(b) => b as i32,
    }
}

#[derive(Debug)]
pub(crate) struct OperandStack {
    stack: Vec<Value>,
}

impl OperandStack {
    pub fn new(initial: &[f32]) -> PostScriptFunctionResult<Self> {
        let mut stack = Self {
            stack: Vec::with_capacity(MAX_STACK_SIZE),
        };

        for &n in initial {
            stack.push(Value::Number(n))?;
        }

        Ok(stack)
    }

    pub fn push(&mut self, value: Value) -> PostScriptFunctionResult<()> {
        if self.stack.len() >= MAX_STACK_SIZE {
            return Err(PostScriptFunctionError::StackOverflow);
        }

        self.stack.push(value);

        Ok(())
    }

    fn push_number(&mut self, n: f32) -> PostScriptFunctionResult<()> {
        self.push(Value::Number(n))
    }

    pub fn pop(&mut self) -> PostScriptFunctionResult<Value> {
        self.stack.pop().ok_or(PostScriptFunctionError::StackUnderflow)
    }

    fn pop_number(&mut self) -> PostScriptFunctionResult<f32> {
        self.pop()?.as_number()
    }

    fn pop_integer(&mut self) -> PostScriptFunctionResult<i32> {
        self.pop_number().map(to_i32)
    }

    /// Duplicates the top `n` values
    pub fn copy(&mut self, n: usize) -> PostScriptFunctionResult<()> {
        if n > self.stack.len() {
            return Err(PostScriptFunctionError::StackUnderflow);
        }

        if self.stack.len() + n > MAX_STACK_SIZE {
            return Err(PostScriptFunctionError::StackOverflow);
        }

        let start = self.stack.len() - n;
        self.stack.extend_from_within(start..);

        Ok(())
    }

    /// Pushes a copy of the value `n` places below the top, so `0 index` is `dup`
    pub fn index(&mut self, n: usize) -> PostScriptFunctionResult<()> {
        if n >= self.stack.len() {
            return Err(PostScriptFunctionError::StackUnderflow);
        }

        let value = self.stack[self.stack.len() - n - 1];

        self.push(value)
    }

    /// Rotates the top `n` values by `p` positions toward the top of the stack
    pub fn roll(&mut self, n: usize, p: i32) -> PostScriptFunctionResult<()> {
        if n > self.stack.len() {
            return Err(PostScriptFunctionError::StackUnderflow);
        }

        if n == 0 {
            return Ok(());
        }

        let start = self.stack.len() - n;
        let window = &mut self.stack[start..];

        let shift = (p as i64).rem_euclid(n as i64) as usize;

        window.reverse();

        let (left, right) = window.split_at_mut(shift);
        left.reverse();
        right.reverse();

        Ok(())
    }

    pub fn into_values(self) -> Vec<Value> {
        self.stack
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PostScriptEvaluator {
    instructions: Vec<Instruction>,
}

impl PostScriptEvaluator {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Runs the program against `input` and returns the final operand stack, bottom first
    pub fn execute(&self, input: &[f32]) -> PostScriptFunctionResult<Vec<Value>> {
        let mut stack = OperandStack::new(input)?;
        let mut pc = 0;

        while let Some(&instruction) = self.instructions.get(pc) {
            pc += 1;

            match instruction {
                Instruction::Number(n) => stack.push_number(n)?,
                Instruction::Operator(op) => Self::execute_operator(op, &mut stack)?,
                Instruction::Jump(target) => pc = target,
                Instruction::JumpIfFalse(target) => {
                    let condition = match stack.pop()? {
                        Value::Bool(b) => b,
                        Value::Number(n) => n != 0.0,
                    };

                    if !condition {
                        pc = target;
                    }
                }
            }
        }

        Ok(stack.into_values())
    }

    fn execute_operator(
        op: PostScriptFunctionOperator,
        stack: &mut OperandStack,
    ) -> PostScriptFunctionResult<()> {
        use PostScriptFunctionOperator as Op;

        match op {
            Op::Abs => {
                let a = stack.pop_number()?;
                stack.push_number(a.abs())?;
            }
            Op::Add => {
                let b = stack.pop_number()?;
                let a = stack.pop_number()?;
                stack.push_number(a + b)?;
            }
            Op::Atan => {
                let den = stack.pop_number()?;
                let num = stack.pop_number()?;

                let mut angle = num.atan2(den).to_degrees();
                if angle < 0.0 {
                    angle += 360.0;
                }

                stack.push_number(angle)?;
            }
            Op::Ceiling => {
                let a = stack.pop_number()?;
                stack.push_number(a.ceil())?;
            }
            Op::Cos => {
                let a = stack.pop_number()?;
                stack.push_number((a % 360.0).to_radians().cos())?;
            }
            Op::Cvi => {
                let a = stack.pop_number()?;
                stack.push_number(to_i32(a) as f32)?;
            }
            Op::Cvr => {
                let a = stack.pop_number()?;
                stack.push_number(a)?;
            }
            Op::Div => {
                let b = stack.pop_number()?;
                let a = stack.pop_number()?;
                stack.push_number(a / b)?;
            }
            Op::Exp => {
                let exponent = stack.pop_number()?;
                let base = stack.pop_number()?;
                stack.push_number(base.powf(exponent))?;
            }
            Op::Floor => {
                let a = stack.pop_number()?;
                stack.push_number(a.floor())?;
            }
            Op::Idiv => {
                let b = stack.pop_number()?;
                let a = stack.pop_number()?;
                stack.push_number(to_i32(a / b) as f32)?;
            }
            Op::Ln => {
                let a = stack.pop_number()?;
                stack.push_number(a.ln())?;
            }
            Op::Log => {
                let a = stack.pop_number()?;
                stack.push_number(a.log10())?;
            }
            Op::Mod => {
                let b = stack.pop_number()?;
                let a = stack.pop_number()?;
                stack.push_number(a % b)?;
            }
            Op::Mul => {
                let b = stack.pop_number()?;
                let a = stack.pop_number()?;
                stack.push_number(a * b)?;
            }
            Op::Neg => {
                let a = stack.pop_number()?;
                stack.push_number(-a)?;
            }
            Op::Round => {
                let a = stack.pop_number()?;
                stack.push_number((a + 0.5).floor())?;
            }
            Op::Sin => {
                let a = stack.pop_number()?;
                stack.push_number((a % 360.0).to_radians().sin())?;
            }
            Op::Sqrt => {
                let a = stack.pop_number()?;
                stack.push_number(a.sqrt())?;
            }
            Op::Sub => {
                let b = stack.pop_number()?;
                let a = stack.pop_number()?;
                stack.push_number(a - b)?;
            }
            Op::Truncate => {
                let a = stack.pop_number()?;
                stack.push_number(a.trunc())?;
            }

            Op::And | Op::Or | Op::Xor => {
                let b = stack.pop()?;
                let a = stack.pop()?;

                let result = match (a, b) {
                    (Value::Bool(a), Value::Bool(b)) => Value::Bool(match op {
                        Op::And => a && b,
                        Op::Or => a || b,
                        _ => a ^ b,
                    }),
                    (a, b) => {
                        let a = to_bits(a);
                        let b = to_bits(b);

                        let result = match op {
                            Op::And => a & b,
                            Op::Or => a | b,
                            _ => a ^ b,
                        };

                        Value::Number(result as f32)
                    }
                };

                stack.push(result)?;
            }
            Op::Not => {
                let result = match stack.pop()? {
                    Value::Bool(b) => Value::Bool(!b),
                    Value::Number(n) => Value::Number(!to_i32(n) as f32),
                };

                stack.push(result)?;
            }
            Op::Bitshift => {
                let shift = stack.pop_integer()?;
                let int = stack.pop_integer()?;

                // shift counts wrap modulo 32
                let result = if shift >= 0 {
                    int.wrapping_shl(shift as u32)
                } else {
                    int.wrapping_shr(shift.unsigned_abs())
                };

                stack.push_number(result as f32)?;
            }
            Op::Eq => {
                let b = stack.pop()?;
                let a = stack.pop()?;
                stack.push(Value::Bool(a == b))?;
            }
            Op::Ne => {
                let b = stack.pop()?;
                let a = stack.pop()?;
                stack.push(Value::Bool(a != b))?;
            }
            Op::Ge | Op::Gt | Op::Le | Op::Lt => {
                let b = stack.pop_number()?;
                let a = stack.pop_number()?;

                stack.push(Value::Bool(match op {
                    Op::Ge => a >= b,
                    Op::Gt => a > b,
                    Op::Le => a <= b,
                    _ => a < b,
                }))?;
            }
            Op::True => stack.push(Value::Bool(true))?,
            Op::False => stack.push(Value::Bool(false))?,

            Op::Copy => {
                let n = stack.pop_integer()?;
                let n = usize::try_from(n).map_err(|_| PostScriptFunctionError::RangeCheck)?;
                stack.copy(n)?;
            }
            Op::Dup => stack.index(0)?,
            Op::Exch => {
                let b = stack.pop()?;
                let a = stack.pop()?;
                stack.push(b)?;
                stack.push(a)?;
            }
            Op::Index => {
                let n = stack.pop_integer()?;
                let n = usize::try_from(n).map_err(|_| PostScriptFunctionError::RangeCheck)?;
                stack.index(n)?;
            }
            Op::Pop => {
                stack.pop()?;
            }
            Op::Roll => {
                let p = stack.pop_integer()?;
                let n = stack.pop_integer()?;
                let n = usize::try_from(n).map_err(|_| PostScriptFunctionError::RangeCheck)?;
                stack.roll(n, p)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::function::postscript_calculator::parser::PostScriptFunctionParser;

    use PostScriptFunctionOperator as Op;

    fn run(program: &[u8], input: &[f32]) -> PostScriptFunctionResult<Vec<Value>> {
        let instructions = PostScriptFunctionParser::new(program).parse()?;

        PostScriptEvaluator::new(instructions).execute(input)
    }

    fn numbers(values: &[f32]) -> Vec<Value> {
        values.iter().copied().map(Value::Number).collect()
    }

    #[test]
    fn add() {
        let evaluator = PostScriptEvaluator::new(vec![
            Instruction::Number(2.0),
            Instruction::Number(2.0),
            Instruction::Operator(Op::Add),
        ]);

        assert_eq!(evaluator.execute(&[]).unwrap(), numbers(&[4.0]));
    }

    #[test]
    fn dup_mul() {
        let evaluator = PostScriptEvaluator::new(vec![
            Instruction::Number(3.0),
            Instruction::Operator(Op::Dup),
            Instruction::Operator(Op::Mul),
        ]);

        assert_eq!(evaluator.execute(&[]).unwrap(), numbers(&[9.0]));
    }

    #[test]
    fn overflow() {
        let evaluator = PostScriptEvaluator::new(vec![Instruction::Number(1.0); 101]);

        assert_eq!(
            evaluator.execute(&[]),
            Err(PostScriptFunctionError::StackOverflow)
        );

        let evaluator = PostScriptEvaluator::new(vec![Instruction::Number(1.0); 100]);
        assert_eq!(evaluator.execute(&[]).unwrap().len(), 100);
    }

    #[test]
    fn underflow() {
        assert_eq!(run(b"{ add }", &[1.0]), Err(PostScriptFunctionError::StackUnderflow));
        assert_eq!(run(b"{ pop pop }", &[1.0]), Err(PostScriptFunctionError::StackUnderflow));
        assert_eq!(run(b"{ 1 index }", &[1.0]), Err(PostScriptFunctionError::StackUnderflow));
    }

    #[test]
    fn roll() {
        let mut stack = OperandStack::new(&[1.0, 2.0, 3.0]).unwrap();
        stack.roll(3, 1).unwrap();
        assert_eq!(stack.into_values(), numbers(&[3.0, 1.0, 2.0]));

        let mut stack = OperandStack::new(&[1.0, 2.0, 3.0]).unwrap();
        stack.roll(3, -1).unwrap();
        assert_eq!(stack.into_values(), numbers(&[2.0, 3.0, 1.0]));

        let mut stack = OperandStack::new(&[0.0, 1.0, 2.0, 3.0]).unwrap();
        stack.roll(3, 4).unwrap();
        assert_eq!(stack.into_values(), numbers(&[0.0, 3.0, 1.0, 2.0]));

        assert_eq!(
            run(b"{ 1 2 3 3 1 roll }", &[]).unwrap(),
            numbers(&[3.0, 1.0, 2.0])
        );
    }

    #[test]
    fn stack_operators() {
        assert_eq!(
            run(b"{ exch }", &[1.0, 2.0]).unwrap(),
            numbers(&[2.0, 1.0])
        );
        assert_eq!(
            run(b"{ 2 copy }", &[1.0, 2.0]).unwrap(),
            numbers(&[1.0, 2.0, 1.0, 2.0])
        );
        assert_eq!(
            run(b"{ 1 index }", &[1.0, 2.0]).unwrap(),
            numbers(&[1.0, 2.0, 1.0])
        );
        assert_eq!(run(b"{ -1 copy }", &[1.0]), Err(PostScriptFunctionError::RangeCheck));
        assert_eq!(
            run(b"{ 60 copy }", &[0.5; 60]),
            Err(PostScriptFunctionError::StackOverflow)
        );
        assert_eq!(run(b"{ 50 copy }", &[0.5; 50]).unwrap().len(), 100);
    }

    #[test]
    fn conditionals() {
        let clamp = b"{ dup 0.5 gt { pop 0.5 } if }";

        assert_eq!(run(clamp, &[0.25]).unwrap(), numbers(&[0.25]));
        assert_eq!(run(clamp, &[0.75]).unwrap(), numbers(&[0.5]));

        let select = b"{ 0.5 lt { 10 } { 20 } ifelse }";

        assert_eq!(run(select, &[0.25]).unwrap(), numbers(&[10.0]));
        assert_eq!(run(select, &[0.75]).unwrap(), numbers(&[20.0]));
    }

    #[test]
    fn boolean_and_bitwise() {
        assert_eq!(
            run(b"{ true false or true xor not }", &[]).unwrap(),
            [Value::Bool(true)]
        );
        assert_eq!(run(b"{ 12 10 and }", &[]).unwrap(), numbers(&[8.0]));
        assert_eq!(run(b"{ 12 10 or }", &[]).unwrap(), numbers(&[14.0]));
        assert_eq!(run(b"{ 12 10 xor }", &[]).unwrap(), numbers(&[6.0]));
        assert_eq!(run(b"{ 0 not }", &[]).unwrap(), numbers(&[-1.0]));
        assert_eq!(run(b"{ 1 3 bitshift 16 -2 bitshift }", &[]).unwrap(), numbers(&[8.0, 4.0]));
        assert_eq!(
            run(b"{ 1 1 eq 1 true eq }", &[]).unwrap(),
            [Value::Bool(true), Value::Bool(false)]
        );
        assert_eq!(run(b"{ true 3 and }", &[]).unwrap(), numbers(&[1.0]));
        assert_eq!(run(b"{ 1 false or }", &[]).unwrap(), numbers(&[1.0]));
        assert_eq!(run(b"{ 2 true xor }", &[]).unwrap(), numbers(&[3.0]));
        assert_eq!(run(b"{ 1 40 bitshift }", &[]).unwrap(), numbers(&[256.0]));
        assert_eq!(run(b"{ 256 -40 bitshift }", &[]).unwrap(), numbers(&[1.0]));
        assert_eq!(run(b"{ true 1 add }", &[]), Err(PostScriptFunctionError::TypeCheck));
    }

    #[test]
    fn arithmetic() {
        assert_eq!(run(b"{ 7 2 idiv }", &[]).unwrap(), numbers(&[3.0]));
        assert_eq!(run(b"{ -7 2 idiv }", &[]).unwrap(), numbers(&[-3.0]));
        assert_eq!(run(b"{ 7 3 mod }", &[]).unwrap(), numbers(&[1.0]));
        assert_eq!(run(b"{ 2.5 round -2.5 round }", &[]).unwrap(), numbers(&[3.0, -2.0]));
        assert_eq!(run(b"{ -2.7 truncate 2.2 ceiling }", &[]).unwrap(), numbers(&[-2.0, 3.0]));
        assert_eq!(run(b"{ 2 10 exp }", &[]).unwrap(), numbers(&[1024.0]));
        assert_eq!(run(b"{ -3.9 cvi }", &[]).unwrap(), numbers(&[-3.0]));

        let approx = |program: &[u8], expected: &[f32]| {
            let values = run(program, &[]).unwrap();
            assert_eq!(values.len(), expected.len());

            for (value, expected) in values.iter().zip(expected) {
                assert!((value.to_output() - expected).abs() < 1e-4, "{:?}", program);
            }
        };

        approx(b"{ 1000 log 1 ln }", &[3.0, 0.0]);
        approx(b"{ 0 -1 atan -1 0 atan }", &[180.0, 270.0]);
        approx(b"{ 90 sin 360 cos 450 sin }", &[1.0, 1.0, 1.0]);
    }
}
