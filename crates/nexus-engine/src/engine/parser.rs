// Formula parser - converts a formula body into an expression tree.
// Supports: numbers, string literals, cell refs (A1), ranges (A1:B5),
// function calls with comma-separated arguments, unary +/- and + - * / with
// parentheses. There are no variables: every name is a reference or a function.

use super::cell::CellSource;
use super::cell_ref::{CellRef, RangeRef, parse_cell_reference};
use super::error::FormulaError;
use super::range::cells_in_bounds;

/// Parenthesis/function/unary nesting allowed before parsing gives up.
pub const MAX_DEPTH: usize = 128;

/// Binary operators allowed in one formula. Operator chains fold into a
/// left-deep tree, so this bounds how deep evaluation recurses.
pub const MAX_OPERATORS: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Text(String),
    Cell(CellRef),
    Range(RangeRef),
    Function { name: String, args: Vec<Expr> },
    Neg(Box<Expr>),
    BinaryOp {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

/// Parse a formula body (the text after `=`).
pub fn parse(body: &str) -> Result<Expr, FormulaError> {
    let tokens = tokenize(body)?;
    if tokens.is_empty() {
        return Err(FormulaError::Empty);
    }
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
        operators: 0,
    };
    let expr = parser.parse_add_sub()?;
    if parser.pos < tokens.len() {
        return Err(FormulaError::UnexpectedToken(parser.pos));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    StringLit(String),
    CellRef(CellRef),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Colon,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>, FormulaError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' => {
                tokens.push(Token::Plus);
                chars.next();
            }
            '-' => {
                tokens.push(Token::Minus);
                chars.next();
            }
            '*' => {
                tokens.push(Token::Star);
                chars.next();
            }
            '/' => {
                tokens.push(Token::Slash);
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            ':' => {
                tokens.push(Token::Colon);
                chars.next();
            }
            ',' => {
                tokens.push(Token::Comma);
                chars.next();
            }
            '"' => {
                chars.next(); // consume opening quote
                let mut s = String::new();
                loop {
                    match chars.next() {
                        // "" inside a literal is an escaped quote
                        Some('"') if chars.peek() == Some(&'"') => {
                            chars.next();
                            s.push('"');
                        }
                        Some('"') => break,
                        Some(ch) => s.push(ch),
                        None => return Err(FormulaError::UnterminatedString),
                    }
                }
                tokens.push(Token::StringLit(s));
            }
            'A'..='Z' | 'a'..='z' | '_' => {
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if let Some(cell) = parse_cell_reference(&ident) {
                    tokens.push(Token::CellRef(cell));
                } else if ident.chars().any(|ch| ch.is_ascii_digit()) {
                    return Err(FormulaError::UnknownName(ident));
                } else {
                    tokens.push(Token::Ident(ident.to_ascii_uppercase()));
                }
            }
            '0'..='9' | '.' => {
                let mut num_str = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num_str.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let num: f64 = num_str
                    .parse()
                    .map_err(|_| FormulaError::InvalidNumber(num_str.clone()))?;
                tokens.push(Token::Number(num));
            }
            other => return Err(FormulaError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
    operators: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn descend(&mut self) -> Result<(), FormulaError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(FormulaError::TooDeep);
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    fn fold(&mut self, op: Op, left: Expr, right: Expr) -> Result<Expr, FormulaError> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(FormulaError::TooManyOperators);
        }
        Ok(Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_add_sub(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.parse_mul_div()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => Op::Add,
                Some(Token::Minus) => Op::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_mul_div()?;
            left = self.fold(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_mul_div(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => Op::Mul,
                Some(Token::Slash) => Op::Div,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = self.fold(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, FormulaError> {
        match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.descend()?;
                let expr = self.parse_unary();
                self.ascend();
                expr
            }
            Some(Token::Minus) => {
                self.pos += 1;
                self.descend()?;
                let expr = self.parse_unary().map(|e| Expr::Neg(Box::new(e)));
                self.ascend();
                expr
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, FormulaError> {
        let Some(token) = self.peek().cloned() else {
            return Err(FormulaError::UnexpectedEnd);
        };

        match token {
            Token::Number(n) => {
                self.pos += 1;
                Ok(Expr::Number(n))
            }
            Token::StringLit(s) => {
                self.pos += 1;
                Ok(Expr::Text(s))
            }
            Token::CellRef(start) => {
                self.pos += 1;
                if self.peek() == Some(&Token::Colon) {
                    match self.tokens.get(self.pos + 1) {
                        Some(Token::CellRef(end)) => {
                            self.pos += 2;
                            Ok(Expr::Range(RangeRef::new(start, *end)))
                        }
                        Some(_) => Err(FormulaError::UnexpectedToken(self.pos + 1)),
                        None => Err(FormulaError::UnexpectedEnd),
                    }
                } else {
                    Ok(Expr::Cell(start))
                }
            }
            Token::Ident(name) => {
                if self.tokens.get(self.pos + 1) != Some(&Token::LParen) {
                    return Err(FormulaError::UnknownName(name));
                }
                self.pos += 2;
                self.descend()?;
                let args = self.parse_function_args();
                self.ascend();
                Ok(Expr::Function { name, args: args? })
            }
            Token::LParen => {
                self.pos += 1;
                self.descend()?;
                let expr = self.parse_add_sub();
                self.ascend();
                let expr = expr?;
                match self.peek() {
                    Some(Token::RParen) => {
                        self.pos += 1;
                        Ok(expr)
                    }
                    Some(_) => Err(FormulaError::UnexpectedToken(self.pos)),
                    None => Err(FormulaError::UnexpectedEnd),
                }
            }
            _ => Err(FormulaError::UnexpectedToken(self.pos)),
        }
    }

    // Called after the opening parenthesis has been consumed.
    fn parse_function_args(&mut self) -> Result<Vec<Expr>, FormulaError> {
        let mut args = Vec::new();

        // Handle empty function call SUM()
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }

        loop {
            args.push(self.parse_add_sub()?);
            match self.peek() {
                Some(Token::RParen) => {
                    self.pos += 1;
                    return Ok(args);
                }
                Some(Token::Comma) => self.pos += 1,
                Some(_) => return Err(FormulaError::UnexpectedToken(self.pos)),
                None => return Err(FormulaError::UnexpectedEnd),
            }
        }
    }
}

/// Collect every cell a parsed expression reads. Ranges are clipped to the
/// grid of `source`; single references are kept even when off-grid.
pub fn referenced_cells<S: CellSource + ?Sized>(expr: &Expr, source: &S) -> Vec<CellRef> {
    let mut refs = Vec::new();
    collect_refs(expr, source, &mut refs);
    refs
}

fn collect_refs<S: CellSource + ?Sized>(expr: &Expr, source: &S, refs: &mut Vec<CellRef>) {
    match expr {
        Expr::Cell(cell) => refs.push(*cell),
        Expr::Range(range) => refs.extend(cells_in_bounds(range, source)),
        Expr::Function { args, .. } => args.iter().for_each(|arg| collect_refs(arg, source, refs)),
        Expr::Neg(inner) => collect_refs(inner, source, refs),
        Expr::BinaryOp { left, right, .. } => {
            collect_refs(left, source, refs);
            collect_refs(right, source, refs);
        }
        Expr::Number(_) | Expr::Text(_) => {}
    }
}

/// True if the expression reads `at`, directly or inside a range.
pub fn references_cell(expr: &Expr, at: CellRef) -> bool {
    match expr {
        Expr::Cell(cell) => *cell == at,
        Expr::Range(range) => range.contains(at),
        Expr::Function { args, .. } => args.iter().any(|arg| references_cell(arg, at)),
        Expr::Neg(inner) => references_cell(inner, at),
        Expr::BinaryOp { left, right, .. } => {
            references_cell(left, at) || references_cell(right, at)
        }
        Expr::Number(_) | Expr::Text(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cell::{Row, SheetView};

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Number(n))
    }

    #[test]
    fn test_precedence() {
        let expr = parse("1+2*3").unwrap();
        assert_eq!(
            expr,
            Expr::BinaryOp {
                op: Op::Add,
                left: num(1.0),
                right: Box::new(Expr::BinaryOp {
                    op: Op::Mul,
                    left: num(2.0),
                    right: num(3.0),
                }),
            }
        );
    }

    #[test]
    fn test_left_associative_subtraction() {
        let expr = parse("8-4-2").unwrap();
        assert_eq!(
            expr,
            Expr::BinaryOp {
                op: Op::Sub,
                left: Box::new(Expr::BinaryOp {
                    op: Op::Sub,
                    left: num(8.0),
                    right: num(4.0),
                }),
                right: num(2.0),
            }
        );
    }

    #[test]
    fn test_cell_and_range() {
        assert_eq!(parse("B12").unwrap(), Expr::Cell(CellRef::new(1, 11)));
        assert_eq!(
            parse("SUM(A1:C10)").unwrap(),
            Expr::Function {
                name: "SUM".into(),
                args: vec![Expr::Range(RangeRef::new(
                    CellRef::new(0, 0),
                    CellRef::new(2, 9)
                ))],
            }
        );
    }

    #[test]
    fn test_function_args_and_strings() {
        let expr = parse(r#"SUMIF(A1:A3, ">5", B1:B3)"#).unwrap();
        let Expr::Function { name, args } = expr else {
            panic!("expected function");
        };
        assert_eq!(name, "SUMIF");
        assert_eq!(args.len(), 3);
        assert_eq!(args[1], Expr::Text(">5".into()));
    }

    #[test]
    fn test_nested_functions_parse() {
        assert!(parse("MAX(A1:A3)+SUM(MIN(B1:B2), 2)").is_ok());
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(parse("-A1").unwrap(), Expr::Neg(Box::new(Expr::Cell(CellRef::new(0, 0)))));
        assert!(parse("2*-3").is_ok());
    }

    #[test]
    fn test_malformed() {
        assert_eq!(parse("A1+"), Err(FormulaError::UnexpectedEnd));
        assert_eq!(parse(""), Err(FormulaError::Empty));
        assert_eq!(parse("(1+2"), Err(FormulaError::UnexpectedEnd));
        assert_eq!(parse("1 2"), Err(FormulaError::UnexpectedToken(1)));
        assert_eq!(parse("1..2"), Err(FormulaError::InvalidNumber("1..2".into())));
        assert_eq!(parse("FOO"), Err(FormulaError::UnknownName("FOO".into())));
        assert_eq!(parse("A1B"), Err(FormulaError::UnknownName("A1B".into())));
        assert_eq!(parse("1;2"), Err(FormulaError::UnexpectedChar(';')));
        assert_eq!(parse("\"abc"), Err(FormulaError::UnterminatedString));
        assert_eq!(parse("A1:"), Err(FormulaError::UnexpectedEnd));
    }

    #[test]
    fn test_depth_limit() {
        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert_eq!(parse(&deep), Err(FormulaError::TooDeep));
        let ok = format!("{}1{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert_eq!(parse(&ok), Ok(Expr::Number(1.0)));
        assert_eq!(parse(&"-".repeat(MAX_DEPTH + 1)), Err(FormulaError::TooDeep));
    }

    #[test]
    fn test_operator_limit() {
        let at_limit = format!("1{}", "+1".repeat(MAX_OPERATORS));
        assert!(parse(&at_limit).is_ok());
        let mixed = format!("1{}", "*2-1".repeat(MAX_OPERATORS / 2 + 1));
        assert_eq!(parse(&mixed), Err(FormulaError::TooManyOperators));
        let long = format!("1{}", "+1".repeat(20_000));
        assert_eq!(parse(&long), Err(FormulaError::TooManyOperators));
    }

    #[test]
    fn test_referenced_cells() {
        let columns = vec!["A".to_string(), "B".to_string()];
        let rows = vec![Row::new(), Row::new()];
        let view = SheetView::new(&rows, &columns);
        let refs = referenced_cells(&parse("A1+SUM(B1:B2)").unwrap(), &view);
        assert_eq!(
            refs,
            vec![CellRef::new(0, 0), CellRef::new(1, 0), CellRef::new(1, 1)]
        );

        let huge = parse("SUM(A1:XFD1048576)+Z9").unwrap();
        assert_eq!(referenced_cells(&huge, &view).len(), 5);
    }

    #[test]
    fn test_references_cell() {
        let expr = parse("SUM(A1:XFD1048576)*0+C3").unwrap();
        assert!(references_cell(&expr, CellRef::new(700, 90_000)));
        assert!(references_cell(&expr, CellRef::new(2, 2)));
        assert!(!references_cell(&parse("B2-1").unwrap(), CellRef::new(0, 0)));
    }
}
