use super::{
    error::{PostScriptFunctionError, PostScriptFunctionResult},
    lexer::{PostScriptFunctionLexer, PostScriptFunctionOperator, PostScriptFunctionToken},
};

/// A single step of a flattened calculator program.
///
/// Conditionals are lowered into jumps with absolute targets, so a program is executed
/// by walking it once with a program counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Instruction {
    Number(f32),
    Operator(PostScriptFunctionOperator),

    /// Pops the condition and jumps to the target if it is false
    JumpIfFalse(usize),

    Jump(usize),
}

pub(crate) struct PostScriptFunctionParser<'b> {
    lexer: std::iter::Peekable<PostScriptFunctionLexer<'b>>,
    instructions: Vec<Instruction>,
}

impl<'b> PostScriptFunctionParser<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self {
            lexer: PostScriptFunctionLexer::new(buffer).peekable(),
            instructions: Vec::new(),
        }
    }

    pub fn parse(mut self) -> PostScriptFunctionResult<Vec<Instruction>> {
        self.expect(PostScriptFunctionToken::OpenCurlyBrace, "{")?;
        self.parse_block()?;
        self.expect(PostScriptFunctionToken::CloseCurlyBrace, "}")?;

        if let Some(token) = self.next_token()? {
            return Err(PostScriptFunctionError::UnexpectedToken {
                expected: "end of program",
                found: format!("{:?}", token),
            });
        }

        Ok(self.instructions)
    }

    fn next_token(&mut self) -> PostScriptFunctionResult<Option<PostScriptFunctionToken>> {
        self.lexer.next().transpose()
    }

    fn peek_token(&mut self) -> PostScriptFunctionResult<Option<PostScriptFunctionToken>> {
        match self.lexer.peek() {
            Some(Ok(token)) => Ok(Some(*token)),
            Some(Err(e)) => Err(e.clone()),
            None => Ok(None),
        }
    }

    fn expect(
        &mut self,
        expected: PostScriptFunctionToken,
        name: &'static str,
    ) -> PostScriptFunctionResult<()> {
        match self.next_token()? {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(PostScriptFunctionError::UnexpectedToken {
                expected: name,
                found: format!("{:?}", token),
            }),
            None => Err(PostScriptFunctionError::UnexpectedEof),
        }
    }

    /// Parses instructions up to, but not including, the closing `}`
    fn parse_block(&mut self) -> PostScriptFunctionResult<()> {
        loop {
            match self.peek_token()? {
                Some(PostScriptFunctionToken::Number(n)) => {
                    self.next_token()?;
                    self.instructions.push(Instruction::Number(n));
                }
                Some(PostScriptFunctionToken::Operator(op)) => {
                    self.next_token()?;
                    self.instructions.push(Instruction::Operator(op));
                }
                Some(PostScriptFunctionToken::OpenCurlyBrace) => {
                    self.next_token()?;
                    self.parse_condition()?;
                }
                Some(PostScriptFunctionToken::CloseCurlyBrace) => return Ok(()),
                Some(token) => {
                    return Err(PostScriptFunctionError::UnexpectedToken {
                        expected: "number, operator, or {",
                        found: format!("{:?}", token),
                    })
                }
                None => return Err(PostScriptFunctionError::UnexpectedEof),
            }
        }
    }

    /// Called after the opening `{` of the first branch has been consumed.
    ///
    /// `{ then } if` lowers to `jz(end) then`, and `{ then } { else } ifelse` lowers to
    /// `jz(else) then j(end) else`.
    fn parse_condition(&mut self) -> PostScriptFunctionResult<()> {
        let condition_location = self.instructions.len();
        self.instructions.push(Instruction::JumpIfFalse(0));

        self.parse_block()?;
        self.expect(PostScriptFunctionToken::CloseCurlyBrace, "}")?;

        match self.next_token()? {
            Some(PostScriptFunctionToken::If) => {
                self.instructions[condition_location] =
                    Instruction::JumpIfFalse(self.instructions.len());
            }
            Some(PostScriptFunctionToken::OpenCurlyBrace) => {
                let jump_location = self.instructions.len();
                self.instructions.push(Instruction::Jump(0));

                let else_location = self.instructions.len();
                self.parse_block()?;
                self.expect(PostScriptFunctionToken::CloseCurlyBrace, "}")?;
                self.expect(PostScriptFunctionToken::IfElse, "ifelse")?;

                self.instructions[condition_location] = Instruction::JumpIfFalse(else_location);
                self.instructions[jump_location] = Instruction::Jump(self.instructions.len());
            }
            Some(token) => {
                return Err(PostScriptFunctionError::UnexpectedToken {
                    expected: "if or {",
                    found: format!("{:?}", token),
                })
            }
            None => return Err(PostScriptFunctionError::UnexpectedEof),
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use PostScriptFunctionOperator as Op;

    fn parse(program: &[u8]) -> PostScriptFunctionResult<Vec<Instruction>> {
        PostScriptFunctionParser::new(program).parse()
    }

    #[test]
    fn straight_line() {
        assert_eq!(
            parse(b"{ 2 2 add }").unwrap(),
            [
                Instruction::Number(2.0),
                Instruction::Number(2.0),
                Instruction::Operator(Op::Add),
            ]
        );
    }

    #[test]
    fn if_lowers_to_conditional_jump() {
        assert_eq!(
            parse(b"{ dup 0.5 gt { pop 0.5 } if }").unwrap(),
            [
                Instruction::Operator(Op::Dup),
                Instruction::Number(0.5),
                Instruction::Operator(Op::Gt),
                Instruction::JumpIfFalse(6),
                Instruction::Operator(Op::Pop),
                Instruction::Number(0.5),
            ]
        );
    }

    #[test]
    fn ifelse_lowers_to_both_jumps() {
        assert_eq!(
            parse(b"{ 0 gt { 1 } { 2 } ifelse 3 }").unwrap(),
            [
                Instruction::Number(0.0),
                Instruction::Operator(Op::Gt),
                Instruction::JumpIfFalse(5),
                Instruction::Number(1.0),
                Instruction::Jump(6),
                Instruction::Number(2.0),
                Instruction::Number(3.0),
            ]
        );
    }

    #[test]
    fn nested_conditionals() {
        let instructions = parse(b"{ { { 1 } if } if }").unwrap();

        assert_eq!(
            instructions,
            [
                Instruction::JumpIfFalse(3),
                Instruction::JumpIfFalse(3),
                Instruction::Number(1.0),
            ]
        );
    }

    #[test]
    fn malformed_programs() {
        assert_eq!(parse(b"{ 1 2 add"), Err(PostScriptFunctionError::UnexpectedEof));
        assert!(matches!(
            parse(b"1 2 add"),
            Err(PostScriptFunctionError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse(b"{ 1 } 2"),
            Err(PostScriptFunctionError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse(b"{ { 1 } { 2 } if }"),
            Err(PostScriptFunctionError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse(b"{ { 1 } }"),
            Err(PostScriptFunctionError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse(b"{ if }"),
            Err(PostScriptFunctionError::UnexpectedToken { .. })
        ));
    }
}
