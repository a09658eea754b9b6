//! A recursive-descent parser for the selector language.
//!
//! Works on the token stream from [`crate::lexer::scan`]; one method per
//! precedence level, lowest first.

use super::ast::*;
use crate::error::ParseError;
use crate::lexer::{Token, TokenKind, scan};

// --- Main Public Parser ---

pub fn parse_selector(input: &str) -> Result<Expression, ParseError> {
    let tokens = scan(input);
    parse(&tokens)
}

pub fn parse(tokens: &[Token]) -> Result<Expression, ParseError> {
    if let Some(bad) = tokens
        .iter()
        .find(|t| matches!(t.kind, TokenKind::Invalid(_)))
        && let TokenKind::Invalid(fault) = bad.kind
    {
        return Err(ParseError::Scan {
            position: bad.offset,
            fault,
            text: bad.text.clone(),
        });
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expression()?;
    if !parser.at(TokenKind::Eof) {
        return Err(parser.unexpected("end of expression"));
    }
    Ok(expr)
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

type ParseResult = Result<Expression, ParseError>;

impl<'t> Parser<'t> {
    // --- Token helpers ---

    fn kind_at(&self, ahead: usize) -> TokenKind {
        self.tokens
            .get(self.pos + ahead)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind_at(0) == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn text(&self) -> String {
        self.tokens
            .get(self.pos)
            .map(|t| t.text.clone())
            .unwrap_or_default()
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.tokens.get(self.pos).or(self.tokens.last());
        ParseError::Syntax {
            position: token.map_or(0, |t| t.offset),
            expected: expected.to_string(),
            found: token.map_or("end of input".to_string(), |t| t.describe()),
        }
    }

    // --- Expression Parsers (in order of precedence) ---

    fn expression(&mut self) -> ParseResult {
        self.binary_level(Self::or_expr, &[(TokenKind::Stream, BinaryOperator::Stream)])
    }

    fn binary_level(
        &mut self,
        operand: fn(&mut Self) -> ParseResult,
        operators: &[(TokenKind, BinaryOperator)],
    ) -> ParseResult {
        let mut left = operand(self)?;
        while let Some(op) = operators
            .iter()
            .find(|(kind, _)| self.at(*kind))
            .map(|(_, op)| *op)
        {
            self.pos += 1;
            let right = operand(self)?;
            left = Expression::binary(left, op, right);
        }
        Ok(left)
    }

    fn or_expr(&mut self) -> ParseResult {
        self.binary_level(Self::and_expr, &[(TokenKind::Or, BinaryOperator::Or)])
    }

    fn and_expr(&mut self) -> ParseResult {
        self.binary_level(Self::equality_expr, &[(TokenKind::And, BinaryOperator::And)])
    }

    fn equality_expr(&mut self) -> ParseResult {
        self.binary_level(
            Self::relational_expr,
            &[
                (TokenKind::Equals, BinaryOperator::Equals),
                (TokenKind::NotEquals, BinaryOperator::NotEquals),
            ],
        )
    }

    fn relational_expr(&mut self) -> ParseResult {
        self.binary_level(
            Self::additive_expr,
            &[
                (TokenKind::Less, BinaryOperator::LessThan),
                (TokenKind::LessEq, BinaryOperator::LessThanOrEqual),
                (TokenKind::Greater, BinaryOperator::GreaterThan),
                (TokenKind::GreaterEq, BinaryOperator::GreaterThanOrEqual),
            ],
        )
    }

    fn additive_expr(&mut self) -> ParseResult {
        self.binary_level(
            Self::multiplicative_expr,
            &[
                (TokenKind::Plus, BinaryOperator::Plus),
                (TokenKind::Minus, BinaryOperator::Minus),
            ],
        )
    }

    fn multiplicative_expr(&mut self) -> ParseResult {
        self.binary_level(
            Self::unary_expr,
            &[
                (TokenKind::Multiply, BinaryOperator::Multiply),
                (TokenKind::Div, BinaryOperator::Divide),
                (TokenKind::Mod, BinaryOperator::Modulo),
            ],
        )
    }

    fn unary_expr(&mut self) -> ParseResult {
        if self.eat(TokenKind::Minus) {
            return Ok(Expression::Negate(Box::new(self.unary_expr()?)));
        }
        self.union_expr()
    }

    fn at_root_union(&self) -> bool {
        self.at(TokenKind::Slash) && self.kind_at(1) == TokenKind::Pipe
    }

    fn root_union(&mut self) -> ParseResult {
        self.pos += 2;
        Ok(Expression::RootUnion(Box::new(self.union_expr()?)))
    }

    fn union_expr(&mut self) -> ParseResult {
        if self.at_root_union() {
            return self.root_union();
        }
        let mut left = self.intersect_expr()?;
        while self.eat(TokenKind::Pipe) {
            let right = if self.at_root_union() {
                self.root_union()?
            } else {
                self.intersect_expr()?
            };
            left = Expression::binary(left, BinaryOperator::Union, right);
        }
        Ok(left)
    }

    fn intersect_expr(&mut self) -> ParseResult {
        self.binary_level(
            Self::path_expr,
            &[(TokenKind::Intersect, BinaryOperator::Intersect)],
        )
    }

    // --- Paths ---

    fn path_expr(&mut self) -> ParseResult {
        match self.kind_at(0) {
            TokenKind::Slash => {
                self.pos += 1;
                if !starts_step(self.kind_at(0)) {
                    return Ok(Expression::Root);
                }
                let mut steps = Vec::new();
                self.relative_path(&mut steps)?;
                Ok(path(None, true, steps))
            }
            TokenKind::DoubleSlash => {
                self.pos += 1;
                let mut steps = vec![LocationStep::descendant_or_self()];
                self.relative_path(&mut steps)?;
                Ok(path(None, true, steps))
            }
            _ if self.starts_primary() => {
                let filter = self.filter_expr()?;
                let mut steps = Vec::new();
                if self.eat(TokenKind::Slash) {
                    self.relative_path(&mut steps)?;
                } else if self.eat(TokenKind::DoubleSlash) {
                    steps.push(LocationStep::descendant_or_self());
                    self.relative_path(&mut steps)?;
                } else {
                    return Ok(filter);
                }
                Ok(path(Some(filter), false, steps))
            }
            kind if starts_step(kind) => {
                let mut steps = Vec::new();
                self.relative_path(&mut steps)?;
                Ok(path(None, false, steps))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn starts_primary(&self) -> bool {
        match self.kind_at(0) {
            TokenKind::Dollar | TokenKind::LParen | TokenKind::Literal | TokenKind::Number => true,
            // Function call vs. name test: look through an optional `prefix:`.
            TokenKind::Name => match self.kind_at(1) {
                TokenKind::LParen => true,
                TokenKind::Colon => {
                    self.kind_at(2) == TokenKind::Name && self.kind_at(3) == TokenKind::LParen
                }
                _ => false,
            },
            _ => false,
        }
    }

    fn relative_path(&mut self, steps: &mut Vec<LocationStep>) -> Result<(), ParseError> {
        steps.push(self.step()?);
        loop {
            if self.eat(TokenKind::Slash) {
                steps.push(self.step()?);
            } else if self.eat(TokenKind::DoubleSlash) {
                steps.push(LocationStep::descendant_or_self());
                steps.push(self.step()?);
            } else {
                return Ok(());
            }
        }
    }

    fn step(&mut self) -> Result<LocationStep, ParseError> {
        if self.eat(TokenKind::Dot) {
            return Ok(LocationStep::Abbreviated(AbbreviatedStep::SelfNode));
        }
        if self.eat(TokenKind::DotDot) {
            return Ok(LocationStep::Abbreviated(AbbreviatedStep::Parent));
        }
        let axis = if self.at(TokenKind::AxisName) {
            let name = self.text();
            self.pos += 1;
            self.expect(TokenKind::DoubleColon, "'::'")?;
            Axis::from_name(&name)
        } else if self.eat(TokenKind::At) {
            Axis::Attribute
        } else {
            Axis::Child
        };
        let node_test = self.node_test()?;
        let predicates = self.predicates()?;
        Ok(LocationStep::Step(Step {
            axis,
            node_test,
            predicates,
        }))
    }

    fn node_test(&mut self) -> Result<NodeTest, ParseError> {
        match self.kind_at(0) {
            TokenKind::Star => {
                self.pos += 1;
                Ok(NodeTest::Wildcard)
            }
            TokenKind::NodeType => {
                let keyword = self.text();
                self.pos += 1;
                self.expect(TokenKind::LParen, "'('")?;
                let test = match keyword.as_str() {
                    "node" => NodeTypeTest::Node,
                    "text" => NodeTypeTest::Text,
                    "comment" => NodeTypeTest::Comment,
                    _ => {
                        let target = if self.at(TokenKind::Literal) {
                            self.advance().map(|t| t.text.clone())
                        } else {
                            None
                        };
                        NodeTypeTest::ProcessingInstruction(target)
                    }
                };
                self.expect(TokenKind::RParen, "')'")?;
                Ok(NodeTest::NodeType(test))
            }
            TokenKind::Name => {
                let first = self.text();
                self.pos += 1;
                if self.at(TokenKind::Colon) {
                    match self.kind_at(1) {
                        TokenKind::Star => {
                            self.pos += 2;
                            return Ok(NodeTest::PrefixWildcard(first));
                        }
                        TokenKind::Name => {
                            self.pos += 1;
                            let local = self.text();
                            self.pos += 1;
                            return Ok(NodeTest::Name(QualifiedName::prefixed(first, local)));
                        }
                        _ => {
                            self.pos += 1;
                            return Err(self.unexpected("local name or '*'"));
                        }
                    }
                }
                Ok(NodeTest::Name(QualifiedName::local(first)))
            }
            _ => Err(self.unexpected("node test")),
        }
    }

    fn predicates(&mut self) -> Result<Vec<Expression>, ParseError> {
        let mut predicates = Vec::new();
        while self.eat(TokenKind::LBracket) {
            if self.at(TokenKind::Eof) {
                return Err(self.unexpected("']'"));
            }
            predicates.push(self.expression()?);
            self.expect(TokenKind::RBracket, "']'")?;
        }
        Ok(predicates)
    }

    // --- Primary expressions ---

    fn filter_expr(&mut self) -> ParseResult {
        let primary = self.primary_expr()?;
        let predicates = self.predicates()?;
        if predicates.is_empty() {
            Ok(primary)
        } else {
            Ok(Expression::Filter {
                primary: Box::new(primary),
                predicates,
            })
        }
    }

    fn primary_expr(&mut self) -> ParseResult {
        match self.kind_at(0) {
            TokenKind::Dollar => {
                self.pos += 1;
                Ok(Expression::Variable(self.qualified_name()?))
            }
            TokenKind::LParen => {
                self.pos += 1;
                let inner = self.expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Literal => {
                let text = self.text();
                self.pos += 1;
                Ok(Expression::Literal(text))
            }
            TokenKind::Number => {
                let value = self
                    .text()
                    .parse::<f64>()
                    .map_err(|_| self.unexpected("number"))?;
                self.pos += 1;
                Ok(Expression::Number(value))
            }
            TokenKind::Name => {
                let name = self.qualified_name()?;
                self.expect(TokenKind::LParen, "'('")?;
                let mut args = Vec::new();
                if !self.at(TokenKind::RParen) {
                    loop {
                        args.push(self.expression()?);
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen, "')' or ','")?;
                Ok(Expression::FunctionCall { name, args })
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn qualified_name(&mut self) -> Result<QualifiedName, ParseError> {
        if !self.at(TokenKind::Name) {
            return Err(self.unexpected("name"));
        }
        let first = self.text();
        self.pos += 1;
        if self.at(TokenKind::Colon) && self.kind_at(1) == TokenKind::Name {
            self.pos += 1;
            let local = self.text();
            self.pos += 1;
            return Ok(QualifiedName::prefixed(first, local));
        }
        Ok(QualifiedName::local(first))
    }
}

fn starts_step(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::AxisName
            | TokenKind::NodeType
            | TokenKind::Name
            | TokenKind::Star
            | TokenKind::At
            | TokenKind::Dot
            | TokenKind::DotDot
    )
}

fn path(start_point: Option<Expression>, is_absolute: bool, steps: Vec<LocationStep>) -> Expression {
    Expression::Path(LocationPath {
        start_point: start_point.map(Box::new),
        is_absolute,
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanFault;

    fn child(name: &str) -> LocationStep {
        LocationStep::Step(Step {
            axis: Axis::Child,
            node_test: NodeTest::Name(QualifiedName::local(name)),
            predicates: vec![],
        })
    }

    #[test]
    fn test_parse_simple_path() {
        let expr = parse_selector("/document/page").unwrap();
        assert_eq!(
            expr,
            Expression::Path(LocationPath {
                start_point: None,
                is_absolute: true,
                steps: vec![child("document"), child("page")],
            })
        );
    }

    #[test]
    fn test_double_slash_inserts_descendant_or_self() {
        let expr = parse_selector("//line").unwrap();
        assert_eq!(
            expr,
            Expression::Path(LocationPath {
                start_point: None,
                is_absolute: true,
                steps: vec![LocationStep::descendant_or_self(), child("line")],
            })
        );
    }

    #[test]
    fn test_explicit_and_abbreviated_axes_are_equal() {
        assert_eq!(
            parse_selector("child::line/attribute::id").unwrap(),
            parse_selector("line/@id").unwrap()
        );
        assert_eq!(
            parse_selector("self::node()").unwrap(),
            Expression::Path(LocationPath {
                start_point: None,
                is_absolute: false,
                steps: vec![LocationStep::Step(Step {
                    axis: Axis::SelfAxis,
                    node_test: NodeTest::NodeType(NodeTypeTest::Node),
                    predicates: vec![],
                })],
            })
        );
    }

    #[test]
    fn test_named_axis_and_prefixed_test() {
        let expr = parse_selector("feature::tag:ORG").unwrap();
        let Expression::Path(path) = expr else {
            panic!("Expected a path");
        };
        assert_eq!(
            path.steps,
            vec![LocationStep::Step(Step {
                axis: Axis::Named("feature".to_string()),
                node_test: NodeTest::Name(QualifiedName::prefixed("tag", "ORG")),
                predicates: vec![],
            })]
        );
    }

    #[test]
    fn test_operator_precedence() {
        let expr = parse_selector("1 + 2 * 3 = 7 and true()").unwrap();
        let Expression::Binary { op, left, .. } = expr else {
            panic!("Expected a binary expression");
        };
        assert_eq!(op, BinaryOperator::And);
        let Expression::Binary { op, left, .. } = *left else {
            panic!("Expected equality");
        };
        assert_eq!(op, BinaryOperator::Equals);
        let Expression::Binary { op, right, .. } = *left else {
            panic!("Expected addition");
        };
        assert_eq!(op, BinaryOperator::Plus);
        assert!(matches!(
            *right,
            Expression::Binary {
                op: BinaryOperator::Multiply,
                ..
            }
        ));
    }

    #[test]
    fn test_left_associativity() {
        let expr = parse_selector("8 - 4 - 2").unwrap();
        assert_eq!(
            expr,
            Expression::binary(
                Expression::binary(
                    Expression::Number(8.0),
                    BinaryOperator::Minus,
                    Expression::Number(4.0)
                ),
                BinaryOperator::Minus,
                Expression::Number(2.0)
            )
        );
    }

    #[test]
    fn test_unary_binds_looser_than_union() {
        let expr = parse_selector("-a | b").unwrap();
        let Expression::Negate(inner) = expr else {
            panic!("Expected negation");
        };
        assert!(matches!(
            *inner,
            Expression::Binary {
                op: BinaryOperator::Union,
                ..
            }
        ));
    }

    #[test]
    fn test_function_call_vs_name_test() {
        let call = parse_selector("hasTag('ORG')").unwrap();
        assert_eq!(
            call,
            Expression::FunctionCall {
                name: QualifiedName::local("hasTag"),
                args: vec![Expression::Literal("ORG".to_string())],
            }
        );
        let prefixed = parse_selector("fn:count(line)").unwrap();
        assert!(matches!(prefixed, Expression::FunctionCall { ref name, .. } if name.prefix.as_deref() == Some("fn")));
        assert!(parse_selector("hasTag").unwrap().is_path());
    }

    #[test]
    fn test_filter_and_path_from_filter() {
        let expr = parse_selector("(//p)[1]/word").unwrap();
        let Expression::Path(path) = expr else {
            panic!("Expected a path");
        };
        assert!(matches!(
            path.start_point.as_deref(),
            Some(Expression::Filter { .. })
        ));
        assert_eq!(path.steps, vec![child("word")]);
    }

    #[test]
    fn test_root_union_shape() {
        let expr = parse_selector("/ | //p").unwrap();
        assert!(matches!(expr, Expression::RootUnion(_)));
        let nested = parse_selector("a | / | b").unwrap();
        let Expression::Binary { op, right, .. } = nested else {
            panic!("Expected union");
        };
        assert_eq!(op, BinaryOperator::Union);
        assert!(matches!(*right, Expression::RootUnion(_)));
        assert_eq!(parse_selector("/").unwrap(), Expression::Root);
    }

    #[test]
    fn test_processing_instruction_target() {
        let expr = parse_selector("processing-instruction('tag')").unwrap();
        let Expression::Path(path) = expr else {
            panic!("Expected a path");
        };
        assert_eq!(
            path.steps,
            vec![LocationStep::Step(Step {
                axis: Axis::Child,
                node_test: NodeTest::NodeType(NodeTypeTest::ProcessingInstruction(Some(
                    "tag".to_string()
                ))),
                predicates: vec![],
            })]
        );
    }

    #[test]
    fn test_unclosed_predicate_reports_end_of_input() {
        let err = parse_selector("//line[").unwrap_err();
        assert_eq!(
            err,
            ParseError::Syntax {
                position: 7,
                expected: "']'".to_string(),
                found: "end of input".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_bracket_after_predicate() {
        let err = parse_selector("//line[1").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { position: 8, ref expected, .. } if expected == "']'"));
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        let err = parse_selector("line line").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { position: 5, .. }));
    }

    #[test]
    fn test_scan_error_surfaces() {
        let err = parse_selector("//line[@id = 'x]").unwrap_err();
        assert_eq!(
            err,
            ParseError::Scan {
                position: 13,
                fault: ScanFault::UnterminatedLiteral,
                text: "'x]".to_string(),
            }
        );
        assert_eq!(parse_selector("a ^ b").unwrap_err().position(), 2);
    }

    #[test]
    fn test_printed_form_reparses_to_same_ast() {
        let selectors = [
            "//paragraph[1]/word",
            "/document/page[2]//line",
            "//line[@confidence > 0.9]",
            "count(//p) + 1",
            "-(1 + 2) * 3",
            "1 - -2",
            "a | b | c",
            "/ | //p",
            "a | / | b",
            "(/ | a) | b",
            "(//p)[1]",
            "(a | b)/c",
            "$x/a//b",
            "a div b mod c",
            "8 - (4 - 2)",
            "not(hasTag('ORG')) and position() = last()",
            "ancestor::page[1]",
            "feature::tag:ORG/node()",
            "processing-instruction('tag')",
            "@*",
            "tag:*",
            "../line",
            "./line",
            "a stream b",
            "a intersect b | c",
            "\"it's\"",
            "text()[. = 'x']",
            "descendant-or-self::node()/line",
            "a//descendant-or-self::node()/b",
            "(/) div 2",
            "* * *",
        ];
        for selector in selectors {
            let ast = parse_selector(selector).unwrap();
            let printed = ast.to_string();
            let reparsed = parse_selector(&printed)
                .unwrap_or_else(|e| panic!("'{printed}' (from '{selector}') failed: {e}"));
            assert_eq!(ast, reparsed, "round trip of '{selector}' via '{printed}'");
        }
    }

    #[test]
    fn test_canonical_printing() {
        let print = |s: &str| parse_selector(s).unwrap().to_string();
        assert_eq!(print("child::line[attribute::id='a']"), "line[@id = 'a']");
        assert_eq!(print("/descendant-or-self::node()/line"), "//line");
        assert_eq!(print("(1+2)*3"), "(1 + 2) * 3");
        assert_eq!(print("/|p"), "/ | p");
    }
}
