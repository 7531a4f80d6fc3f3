use super::error::{PostScriptFunctionError, PostScriptFunctionResult};

#[derive(Debug, Clone)]
pub(crate) struct PostScriptFunctionLexer<'b> {
    buffer: &'b [u8],
    cursor: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PostScriptFunctionToken {
    OpenCurlyBrace,
    CloseCurlyBrace,
    Number(f32),
    Operator(PostScriptFunctionOperator),
    If,
    IfElse,
}

pdf_enum!(
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) enum PostScriptFunctionOperator {
        // Arithmetic
        Abs = "abs",
        Add = "add",
        Atan = "atan",
        Ceiling = "ceiling",
        Cos = "cos",
        Cvi = "cvi",
        Cvr = "cvr",
        Div = "div",
        Exp = "exp",
        Floor = "floor",
        Idiv = "idiv",
        Ln = "ln",
        Log = "log",
        Mod = "mod",
        Mul = "mul",
        Neg = "neg",
        Round = "round",
        Sin = "sin",
        Sqrt = "sqrt",
        Sub = "sub",
        Truncate = "truncate",

        // Relational, boolean, and bitwise
        And = "and",
        Bitshift = "bitshift",
        Eq = "eq",
        False = "false",
        Ge = "ge",
        Gt = "gt",
        Le = "le",
        Lt = "lt",
        Ne = "ne",
        Not = "not",
        Or = "or",
        True = "true",
        Xor = "xor",

        // Stack
        Copy = "copy",
        Dup = "dup",
        Exch = "exch",
        Index = "index",
        Pop = "pop",
        Roll = "roll",
    }
);

fn ident_token_from_bytes(bytes: &[u8]) -> PostScriptFunctionResult<PostScriptFunctionToken> {
    // identifiers are only ever made up of ascii letters
    let ident = std::str::from_utf8(bytes).unwrap_or_default();

    Ok(match ident {
        "if" => PostScriptFunctionToken::If,
        "ifelse" => PostScriptFunctionToken::IfElse,
        _ => PostScriptFunctionToken::Operator(
            PostScriptFunctionOperator::from_str(ident)
                .map_err(|_| PostScriptFunctionError::UnknownOperator(ident.to_owned()))?,
        ),
    })
}

impl<'b> PostScriptFunctionLexer<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek_byte() {
            if b.is_ascii_whitespace() || b == b'\0' {
                self.next_byte();
            } else if b == b'%' {
                self.skip_comment();
            } else {
                break;
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(b) = self.next_byte() {
            if b == b'\n' || b == b'\r' {
                break;
            }
        }
    }

    fn next_byte(&mut self) -> Option<u8> {
        let b = self.buffer.get(self.cursor)?;

        self.cursor += 1;

        Some(*b)
    }

    fn peek_byte(&self) -> Option<u8> {
        self.buffer.get(self.cursor).copied()
    }

    fn consume_while(&mut self, pred: impl Fn(u8) -> bool) -> &'b [u8] {
        let start = self.cursor;

        while let Some(b) = self.peek_byte() {
            if !pred(b) {
                break;
            }

            self.next_byte();
        }

        &self.buffer[start..self.cursor]
    }

    fn lex_ident(&mut self) -> PostScriptFunctionResult<PostScriptFunctionToken> {
        let ident = self.consume_while(|b| b.is_ascii_alphabetic());

        ident_token_from_bytes(ident)
    }

    fn lex_number(&mut self) -> PostScriptFunctionResult<PostScriptFunctionToken> {
        let bytes = self.consume_while(|b| {
            matches!(b, b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E')
        });

        let number = std::str::from_utf8(bytes).unwrap_or_default();

        number
            .parse::<f32>()
            .map(PostScriptFunctionToken::Number)
            .map_err(|_| PostScriptFunctionError::InvalidNumber(number.to_owned()))
    }

    fn next_token(&mut self) -> Option<PostScriptFunctionResult<PostScriptFunctionToken>> {
        self.skip_whitespace();

        Some(match self.peek_byte()? {
            b'0'..=b'9' | b'-' | b'+' | b'.' => self.lex_number(),
            b'a'..=b'z' | b'A'..=b'Z' => self.lex_ident(),
            b'{' => {
                self.next_byte();
                Ok(PostScriptFunctionToken::OpenCurlyBrace)
            }
            b'}' => {
                self.next_byte();
                Ok(PostScriptFunctionToken::CloseCurlyBrace)
            }
            b => {
                self.next_byte();
                Err(PostScriptFunctionError::UnexpectedByte(b))
            }
        })
    }
}

impl Iterator for PostScriptFunctionLexer<'_> {
    type Item = PostScriptFunctionResult<PostScriptFunctionToken>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn lex(program: &[u8]) -> PostScriptFunctionResult<Vec<PostScriptFunctionToken>> {
        PostScriptFunctionLexer::new(program).collect()
    }

    #[test]
    fn numbers_and_operators() {
        assert_eq!(
            lex(b"{ 2 -0.5 .25 1e2 add }").unwrap(),
            [
                PostScriptFunctionToken::OpenCurlyBrace,
                PostScriptFunctionToken::Number(2.0),
                PostScriptFunctionToken::Number(-0.5),
                PostScriptFunctionToken::Number(0.25),
                PostScriptFunctionToken::Number(100.0),
                PostScriptFunctionToken::Operator(PostScriptFunctionOperator::Add),
                PostScriptFunctionToken::CloseCurlyBrace,
            ]
        );
    }

    #[test]
    fn conditionals_are_keywords() {
        assert_eq!(
            lex(b"{true}{false}ifelse {1} if").unwrap(),
            [
                PostScriptFunctionToken::OpenCurlyBrace,
                PostScriptFunctionToken::Operator(PostScriptFunctionOperator::True),
                PostScriptFunctionToken::CloseCurlyBrace,
                PostScriptFunctionToken::OpenCurlyBrace,
                PostScriptFunctionToken::Operator(PostScriptFunctionOperator::False),
                PostScriptFunctionToken::CloseCurlyBrace,
                PostScriptFunctionToken::IfElse,
                PostScriptFunctionToken::OpenCurlyBrace,
                PostScriptFunctionToken::Number(1.0),
                PostScriptFunctionToken::CloseCurlyBrace,
                PostScriptFunctionToken::If,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            lex(b"% leading comment\n{ dup % trailing\n}").unwrap(),
            [
                PostScriptFunctionToken::OpenCurlyBrace,
                PostScriptFunctionToken::Operator(PostScriptFunctionOperator::Dup),
                PostScriptFunctionToken::CloseCurlyBrace,
            ]
        );
    }

    #[test]
    fn unknown_operator() {
        assert_eq!(
            lex(b"{ 1 frobnicate }"),
            Err(PostScriptFunctionError::UnknownOperator("frobnicate".to_owned()))
        );
    }

    #[test]
    fn malformed_number() {
        assert!(matches!(
            lex(b"{ 1.2.3 }"),
            Err(PostScriptFunctionError::InvalidNumber(..))
        ));
    }
}
