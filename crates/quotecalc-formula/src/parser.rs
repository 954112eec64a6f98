//! Formula parser
//!
//! The input is tokenized up front and then parsed by recursive descent
//! with spreadsheet operator precedence (lowest to highest):
//!
//! 1. Comparison: `=`, `<>`, `<`, `<=`, `>`, `>=`
//! 2. Concatenation: `&`
//! 3. Addition / subtraction
//! 4. Multiplication / division
//! 5. Exponentiation `^` (right associative)
//! 6. Prefix `-` / `+`, postfix `%`
//! 7. Range `:`
//! 8. Literals, references, calls, parentheses

use crate::ast::{BinaryOperator, CellReference, FormulaExpr, RangeReference, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use quotecalc_core::{CellAddress, CellError, CellRange, MAX_ROWS};

/// Parse formula text (with its leading `=`) into an expression tree
///
/// ```rust
/// use quotecalc_formula::parse_formula;
///
/// parse_formula("=B13-B15-B16-B18").unwrap();
/// parse_formula("=NPV(0.01,'FC'!C20:E20)").unwrap();
/// parse_formula("=IF(B13=0,0,B19/B13)").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    let body = formula
        .trim()
        .strip_prefix('=')
        .ok_or_else(|| FormulaError::Parse("Formula must start with '='".into()))?;

    let tokens = tokenize(body)?;
    let mut parser = FormulaParser { tokens, pos: 0 };
    let expr = parser.parse_expression()?;

    match parser.peek() {
        Token::Eof => Ok(expr),
        other => Err(FormulaError::Parse(format!(
            "Unexpected {:?} after expression in '{}'",
            other, formula
        ))),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),

    /// Function name or defined name
    Identifier(String),
    /// `A1`, `$B$13`
    CellRef(String),
    /// `FC!` or `'Fluxo de Caixa'!`
    Sheet(String),

    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Ampersand,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Colon,
    Comma,
    Semicolon,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,

    Eof,
}

fn tokenize(input: &str) -> FormulaResult<Vec<Token>> {
    let mut scanner = Scanner { input, pos: 0 };
    let mut tokens = Vec::new();
    loop {
        let token = scanner.next_token()?;
        let done = token == Token::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek_char().map_or(false, &pred) {
            self.bump();
        }
        &self.input[start..self.pos]
    }

    fn next_token(&mut self) -> FormulaResult<Token> {
        self.eat_while(char::is_whitespace);

        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '^' => Some(Token::Caret),
            '%' => Some(Token::Percent),
            '&' => Some(Token::Ampersand),
            '=' => Some(Token::Equal),
            ':' => Some(Token::Colon),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            '{' => Some(Token::LeftBrace),
            '}' => Some(Token::RightBrace),
            _ => None,
        };
        if let Some(token) = single {
            self.bump();
            return Ok(token);
        }

        match c {
            '<' => {
                self.bump();
                Ok(match self.peek_char() {
                    Some('=') => {
                        self.bump();
                        Token::LessEqual
                    }
                    Some('>') => {
                        self.bump();
                        Token::NotEqual
                    }
                    _ => Token::LessThan,
                })
            }
            '>' => {
                self.bump();
                if self.peek_char() == Some('=') {
                    self.bump();
                    Ok(Token::GreaterEqual)
                } else {
                    Ok(Token::GreaterThan)
                }
            }
            '"' => self.scan_string(),
            '\'' => self.scan_quoted_sheet(),
            '#' => self.scan_error(),
            c if c.is_ascii_digit()
                || (c == '.' && self.peek_char_at(1).map_or(false, |d| d.is_ascii_digit())) =>
            {
                self.scan_number()
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => Ok(self.scan_word()),
            other => Err(FormulaError::Parse(format!(
                "Unexpected character '{}' at offset {}",
                other, self.pos
            ))),
        }
    }

    fn scan_string(&mut self) -> FormulaResult<Token> {
        self.bump();
        let mut s = String::new();
        loop {
            match self.bump() {
                Some('"') if self.peek_char() == Some('"') => {
                    self.bump();
                    s.push('"');
                }
                Some('"') => return Ok(Token::String(s)),
                Some(c) => s.push(c),
                None => return Err(FormulaError::Parse("Unterminated string literal".into())),
            }
        }
    }

    fn scan_quoted_sheet(&mut self) -> FormulaResult<Token> {
        self.bump();
        let mut name = String::new();
        loop {
            match self.bump() {
                Some('\'') if self.peek_char() == Some('\'') => {
                    self.bump();
                    name.push('\'');
                }
                Some('\'') => break,
                Some(c) => name.push(c),
                None => return Err(FormulaError::Parse("Unterminated sheet name".into())),
            }
        }
        if self.bump() != Some('!') {
            return Err(FormulaError::Parse(format!(
                "Expected '!' after sheet name '{}'",
                name
            )));
        }
        Ok(Token::Sheet(name))
    }

    fn scan_error(&mut self) -> FormulaResult<Token> {
        let start = self.pos;
        self.bump();
        self.eat_while(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_'));
        if matches!(self.peek_char(), Some('!') | Some('?')) {
            self.bump();
        }
        let text = &self.input[start..self.pos];
        CellError::parse(text)
            .map(Token::Error)
            .ok_or_else(|| FormulaError::Parse(format!("Unknown error literal '{}'", text)))
    }

    fn scan_number(&mut self) -> FormulaResult<Token> {
        let start = self.pos;
        self.eat_while(|c| c.is_ascii_digit());
        if self.peek_char() == Some('.') {
            self.bump();
            self.eat_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek_char(), Some('e') | Some('E'))
            && self
                .peek_char_at(1)
                .map_or(false, |c| c.is_ascii_digit() || c == '+' || c == '-')
        {
            self.bump();
            if matches!(self.peek_char(), Some('+') | Some('-')) {
                self.bump();
            }
            self.eat_while(|c| c.is_ascii_digit());
        }

        let text = &self.input[start..self.pos];
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| FormulaError::Parse(format!("Invalid number '{}'", text)))
    }

    fn scan_word(&mut self) -> Token {
        let text = self.eat_while(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '$'));

        if self.peek_char() == Some('!') {
            self.bump();
            return Token::Sheet(text.to_string());
        }

        let calls = self.peek_after_spaces() == Some('(');
        if !calls {
            if text.eq_ignore_ascii_case("TRUE") {
                return Token::Boolean(true);
            }
            if text.eq_ignore_ascii_case("FALSE") {
                return Token::Boolean(false);
            }
            if looks_like_cell(text) {
                return Token::CellRef(text.to_string());
            }
        }

        Token::Identifier(text.to_string())
    }

    fn peek_after_spaces(&self) -> Option<char> {
        self.input[self.pos..].chars().find(|c| !c.is_whitespace())
    }
}

/// `[$]letters[$]digits` with nothing else
fn looks_like_cell(text: &str) -> bool {
    let rest = text.strip_prefix('$').unwrap_or(text);
    let letters = rest.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    if letters == 0 || letters > 3 {
        return false;
    }
    let rest = &rest[letters..];
    let digits = rest.strip_prefix('$').unwrap_or(rest);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

struct FormulaParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl FormulaParser {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn next(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> FormulaResult<()> {
        let got = self.next();
        if got == expected {
            Ok(())
        } else {
            Err(FormulaError::Parse(format!(
                "Expected {:?}, got {:?}",
                expected, got
            )))
        }
    }

    fn binary(op: BinaryOperator, left: FormulaExpr, right: FormulaExpr) -> FormulaExpr {
        FormulaExpr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn parse_expression(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_concatenation()?;
        loop {
            let op = match self.peek() {
                Token::Equal => BinaryOperator::Equal,
                Token::NotEqual => BinaryOperator::NotEqual,
                Token::LessThan => BinaryOperator::LessThan,
                Token::LessEqual => BinaryOperator::LessEqual,
                Token::GreaterThan => BinaryOperator::GreaterThan,
                Token::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => return Ok(left),
            };
            self.next();
            let right = self.parse_concatenation()?;
            left = Self::binary(op, left, right);
        }
    }

    fn parse_concatenation(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_additive()?;
        while *self.peek() == Token::Ampersand {
            self.next();
            let right = self.parse_additive()?;
            left = Self::binary(BinaryOperator::Concat, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => return Ok(left),
            };
            self.next();
            let right = self.parse_multiplicative()?;
            left = Self::binary(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_exponent()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => return Ok(left),
            };
            self.next();
            let right = self.parse_exponent()?;
            left = Self::binary(op, left, right);
        }
    }

    fn parse_exponent(&mut self) -> FormulaResult<FormulaExpr> {
        let base = self.parse_unary()?;
        if *self.peek() == Token::Caret {
            self.next();
            let exponent = self.parse_exponent()?;
            return Ok(Self::binary(BinaryOperator::Power, base, exponent));
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.peek() {
            Token::Minus => {
                self.next();
                let operand = self.parse_unary()?;
                return Ok(FormulaExpr::UnaryOp {
                    op: UnaryOperator::Negate,
                    operand: Box::new(operand),
                });
            }
            Token::Plus => {
                self.next();
                return self.parse_unary();
            }
            _ => {}
        }

        let mut expr = self.parse_range()?;
        while *self.peek() == Token::Percent {
            self.next();
            expr = FormulaExpr::UnaryOp {
                op: UnaryOperator::Percent,
                operand: Box::new(expr),
            };
        }
        Ok(expr)
    }

    fn parse_range(&mut self) -> FormulaResult<FormulaExpr> {
        if let Some(whole) = self.parse_whole_lines() {
            return Ok(whole);
        }
        let left = self.parse_primary()?;
        if *self.peek() != Token::Colon {
            return Ok(left);
        }
        self.next();
        let right = self.parse_primary()?;

        match (left, right) {
            (FormulaExpr::CellRef(start), FormulaExpr::CellRef(end)) => {
                let same_sheet = match (&start.sheet, &end.sheet) {
                    (_, None) => true,
                    (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                    (None, Some(_)) => false,
                };
                if !same_sheet {
                    return Err(FormulaError::Parse(
                        "Range references must be on the same sheet".into(),
                    ));
                }
                Ok(FormulaExpr::RangeRef(RangeReference {
                    sheet: start.sheet,
                    range: CellRange::new(start.address, end.address),
                }))
            }
            (left, right) => Ok(Self::binary(BinaryOperator::Range, left, right)),
        }
    }

    /// `K:K`, `$A:$C`, `2:3` or `produtos!K:K`; leaves the cursor alone
    /// when the next tokens are anything else
    fn parse_whole_lines(&mut self) -> Option<FormulaExpr> {
        let (sheet, skip) = match self.peek() {
            Token::Sheet(name) => (Some(name.clone()), 1),
            _ => (None, 0),
        };
        let at = |offset: usize| self.tokens.get(self.pos + skip + offset);
        if at(1) != Some(&Token::Colon) {
            return None;
        }
        let (first, last) = (at(0)?, at(2)?);

        let range = match (column_bound(first), column_bound(last)) {
            (Some(a), Some(b)) => CellRange::full_columns(a.min(b), a.max(b)),
            _ => {
                let (a, b) = (row_bound(first)?, row_bound(last)?);
                CellRange::full_rows(a.min(b), a.max(b))
            }
        };
        self.pos += skip + 3;
        Some(FormulaExpr::RangeRef(RangeReference { sheet, range }))
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.next() {
            Token::Number(n) => Ok(FormulaExpr::Number(n)),
            Token::String(s) => Ok(FormulaExpr::String(s)),
            Token::Boolean(b) => Ok(FormulaExpr::Boolean(b)),
            Token::Error(e) => Ok(FormulaExpr::Error(e)),
            Token::LeftParen => {
                let expr = self.parse_expression()?;
                self.expect(Token::RightParen)?;
                Ok(expr)
            }
            Token::LeftBrace => self.parse_array(),
            Token::Sheet(sheet) => match self.next() {
                Token::CellRef(text) => cell_reference(Some(sheet), &text),
                other => Err(FormulaError::Parse(format!(
                    "Expected cell reference after '{}!', got {:?}",
                    sheet, other
                ))),
            },
            Token::CellRef(text) => cell_reference(None, &text),
            Token::Identifier(name) => {
                if *self.peek() == Token::LeftParen {
                    self.parse_call(name)
                } else {
                    Ok(FormulaExpr::NameRef(name))
                }
            }
            other => Err(FormulaError::Parse(format!("Unexpected {:?}", other))),
        }
    }

    fn parse_array(&mut self) -> FormulaResult<FormulaExpr> {
        let mut rows = vec![Vec::new()];
        if *self.peek() == Token::RightBrace {
            self.next();
            return Ok(FormulaExpr::Array(Vec::new()));
        }

        loop {
            let item = self.parse_unary()?;
            if let Some(row) = rows.last_mut() {
                row.push(item);
            }
            match self.next() {
                Token::Comma => {}
                Token::Semicolon => rows.push(Vec::new()),
                Token::RightBrace => {
                    let width = rows[0].len();
                    if rows.iter().any(|row| row.len() != width) {
                        return Err(FormulaError::Parse(
                            "Array constant rows must have the same length".into(),
                        ));
                    }
                    return Ok(FormulaExpr::Array(rows));
                }
                other => {
                    return Err(FormulaError::Parse(format!(
                        "Expected ',' ';' or '}}' in array, got {:?}",
                        other
                    )))
                }
            }
        }
    }

    fn parse_call(&mut self, name: String) -> FormulaResult<FormulaExpr> {
        self.expect(Token::LeftParen)?;

        let mut args = Vec::new();
        if *self.peek() != Token::RightParen {
            loop {
                args.push(self.parse_expression()?);
                if *self.peek() == Token::Comma {
                    self.next();
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RightParen)?;

        let upper = name.to_uppercase();
        let name = upper
            .strip_prefix("_XLFN.")
            .map(str::to_string)
            .unwrap_or(upper);
        Ok(FormulaExpr::Function { name, args })
    }
}

/// Column index of a bare `K` / `$K` word
fn column_bound(token: &Token) -> Option<u16> {
    let Token::Identifier(text) = token else {
        return None;
    };
    let letters = text.strip_prefix('$').unwrap_or(text);
    if letters.is_empty() || letters.len() > 3 || !letters.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    CellAddress::letters_to_column(letters).ok()
}

/// 0-based row of a bare `5` / `$5`
fn row_bound(token: &Token) -> Option<u32> {
    let row = match token {
        Token::Number(n) if n.fract() == 0.0 && *n >= 1.0 && *n <= f64::from(MAX_ROWS) => *n as u32,
        Token::Identifier(text) => text.strip_prefix('$')?.parse().ok()?,
        _ => return None,
    };
    (1..=MAX_ROWS).contains(&row).then(|| row - 1)
}

fn cell_reference(sheet: Option<String>, text: &str) -> FormulaResult<FormulaExpr> {
    let address = CellAddress::parse(text).map_err(|e| {
        FormulaError::Parse(format!("Invalid cell reference '{}': {}", text, e))
    })?;
    Ok(FormulaExpr::CellRef(CellReference { sheet, address }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cell(sheet: Option<&str>, a1: &str) -> FormulaExpr {
        FormulaExpr::CellRef(CellReference {
            sheet: sheet.map(str::to_string),
            address: CellAddress::parse(a1).unwrap(),
        })
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse_formula("=42").unwrap(), FormulaExpr::Number(42.0));
        assert_eq!(parse_formula("=.5").unwrap(), FormulaExpr::Number(0.5));
        assert_eq!(parse_formula("=1e3").unwrap(), FormulaExpr::Number(1000.0));
        assert_eq!(
            parse_formula("=\"Sim \"\"ok\"\"\"").unwrap(),
            FormulaExpr::String("Sim \"ok\"".into())
        );
        assert_eq!(parse_formula("=true").unwrap(), FormulaExpr::Boolean(true));
        assert_eq!(
            parse_formula("=#DIV/0!").unwrap(),
            FormulaExpr::Error(CellError::Div0)
        );
        assert_eq!(parse_formula("=#N/A").unwrap(), FormulaExpr::Error(CellError::Na));
    }

    #[test]
    fn test_margin_formula_shape() {
        let ast = parse_formula("=B13-B15-B16-B18").unwrap();
        let expected = FormulaParser::binary(
            BinaryOperator::Subtract,
            FormulaParser::binary(
                BinaryOperator::Subtract,
                FormulaParser::binary(
                    BinaryOperator::Subtract,
                    cell(None, "B13"),
                    cell(None, "B15"),
                ),
                cell(None, "B16"),
            ),
            cell(None, "B18"),
        );
        assert_eq!(ast, expected);
    }

    #[test]
    fn test_precedence() {
        let ast = parse_formula("=1+2*3^2").unwrap();
        let expected = FormulaParser::binary(
            BinaryOperator::Add,
            FormulaExpr::Number(1.0),
            FormulaParser::binary(
                BinaryOperator::Multiply,
                FormulaExpr::Number(2.0),
                FormulaParser::binary(
                    BinaryOperator::Power,
                    FormulaExpr::Number(3.0),
                    FormulaExpr::Number(2.0),
                ),
            ),
        );
        assert_eq!(ast, expected);

        let ast = parse_formula("=18%").unwrap();
        assert!(matches!(
            ast,
            FormulaExpr::UnaryOp {
                op: UnaryOperator::Percent,
                ..
            }
        ));
    }

    #[test]
    fn test_sheet_references() {
        assert_eq!(parse_formula("=FC!B13").unwrap(), cell(Some("FC"), "B13"));
        assert_eq!(
            parse_formula("='Fluxo de Caixa'!$B$7").unwrap(),
            cell(Some("Fluxo de Caixa"), "$B$7")
        );
        assert_eq!(
            parse_formula("='O''Brien'!A1").unwrap(),
            cell(Some("O'Brien"), "A1")
        );
    }

    #[test]
    fn test_sheet_qualified_range() {
        let ast = parse_formula("=SUM(produtos!K2:K100)").unwrap();
        let FormulaExpr::Function { name, args } = ast else {
            panic!("expected function");
        };
        assert_eq!(name, "SUM");
        assert_eq!(
            args,
            vec![FormulaExpr::RangeRef(RangeReference {
                sheet: Some("produtos".into()),
                range: CellRange::parse("K2:K100").unwrap(),
            })]
        );

        let ast = parse_formula("=SUM(rateio!H2:rateio!H9)").unwrap();
        assert!(matches!(
            ast,
            FormulaExpr::Function { ref args, .. } if matches!(args[0], FormulaExpr::RangeRef(_))
        ));

        assert!(parse_formula("=SUM(FC!A1:rateio!A2)").is_err());
    }

    #[test]
    fn test_whole_column_and_row_ranges() {
        let whole = |formula: &str| match parse_formula(formula).unwrap() {
            FormulaExpr::Function { mut args, .. } => args.remove(0),
            other => other,
        };

        assert_eq!(
            whole("=SUM(K:K)"),
            FormulaExpr::RangeRef(RangeReference {
                sheet: None,
                range: CellRange::full_columns(10, 10),
            })
        );
        assert_eq!(
            whole("=SUM(produtos!K:K)"),
            FormulaExpr::RangeRef(RangeReference {
                sheet: Some("produtos".into()),
                range: CellRange::full_columns(10, 10),
            })
        );
        assert_eq!(
            whole("=SUM('Fluxo de Caixa'!$C:$A)"),
            FormulaExpr::RangeRef(RangeReference {
                sheet: Some("Fluxo de Caixa".into()),
                range: CellRange::full_columns(0, 2),
            })
        );
        assert_eq!(
            whole("=SUM(2:$3)"),
            FormulaExpr::RangeRef(RangeReference {
                sheet: None,
                range: CellRange::full_rows(1, 2),
            })
        );

        assert!(matches!(whole("=SUM(K:1)"), FormulaExpr::BinaryOp { .. }));
        assert!(matches!(whole("=1+K:K"), FormulaExpr::BinaryOp { .. }));
        assert!(matches!(whole("=SUM(A1:B2)"), FormulaExpr::RangeRef(_)));
    }

    #[test]
    fn test_function_names() {
        let ast = parse_formula("=_xlfn.iferror(1/0, 0)").unwrap();
        assert!(matches!(ast, FormulaExpr::Function { ref name, .. } if name == "IFERROR"));

        let ast = parse_formula("=LOG10 (100)").unwrap();
        assert!(matches!(ast, FormulaExpr::Function { ref name, .. } if name == "LOG10"));

        let ast = parse_formula("=TRUE()").unwrap();
        assert!(matches!(ast, FormulaExpr::Function { ref args, .. } if args.is_empty()));

        assert_eq!(
            parse_formula("=TaxaDesconto").unwrap(),
            FormulaExpr::NameRef("TaxaDesconto".into())
        );
    }

    #[test]
    fn test_arrays() {
        let ast = parse_formula("={1,2;3,-4}").unwrap();
        let FormulaExpr::Array(rows) = ast else {
            panic!("expected array");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].len(), 2);
    }

    #[test]
    fn test_references_walk() {
        let ast = parse_formula("=IF(B13=0,0,B19/B13)+SUM(produtos!K2:K4)").unwrap();
        assert_eq!(ast.references().len(), 4);
        assert_eq!(ast.function_calls(), vec![("IF", 3), ("SUM", 1)]);
    }

    #[test]
    fn test_parse_errors() {
        for bad in [
            "B13",
            "=",
            "=1+",
            "=SUM(1,2",
            "=\"open",
            "=(1+2",
            "=1 2",
            "=B13 @ 2",
            "='FC B13",
            "=#BOGUS!",
            "=FC!SUM(1)",
            "={1,2;3}",
        ] {
            assert!(parse_formula(bad).is_err(), "{bad} should not parse");
        }
    }
}
