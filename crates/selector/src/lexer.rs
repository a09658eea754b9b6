//! A `nom`-based scanner turning selector text into a flat token stream.
//!
//! Scanning never fails: characters that cannot start a token come out as
//! `Invalid` tokens and the parser reports them. Operator names and `*` are
//! disambiguated here using the preceding token (XPath 1.0 §3.7).

use crate::error::ScanFault;
use nom::{
    IResult, Input, Parser,
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit0, digit1, satisfy},
    combinator::{map, opt, recognize},
    sequence::{delimited, pair},
};
use nom_locate::LocatedSpan;

type Span<'a> = LocatedSpan<&'a str>;

const NODE_TYPES: [&str; 4] = ["comment", "text", "processing-instruction", "node"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    AxisName,
    NodeType,
    Name,
    Number,
    Literal,
    Slash,
    DoubleSlash,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Minus,
    Plus,
    Dot,
    DotDot,
    At,
    Comma,
    Pipe,
    Dollar,
    /// `*` as a name test.
    Star,
    /// `*` as the multiplication operator.
    Multiply,
    And,
    Or,
    Div,
    Mod,
    Intersect,
    Stream,
    Equals,
    NotEquals,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Colon,
    DoubleColon,
    Invalid(ScanFault),
    Eof,
}

impl TokenKind {
    /// Tokens after which a name or `*` must be an operand rather than an operator.
    fn forces_operand(self) -> bool {
        !matches!(
            self,
            TokenKind::Name
                | TokenKind::NodeType
                | TokenKind::AxisName
                | TokenKind::Number
                | TokenKind::Literal
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::Dot
                | TokenKind::DotDot
                | TokenKind::Star
                | TokenKind::Eof
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text of the token; for literals, the text between the quotes.
    pub text: String,
    /// Byte offset of the token in the selector text.
    pub offset: usize,
}

impl Token {
    /// How the token reads in an error message.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Literal => format!("literal '{}'", self.text),
            _ => format!("'{}'", self.text),
        }
    }
}

/// Scans the whole input. The result always ends with an `Eof` token whose
/// offset is the input length.
pub fn scan(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = Span::new(input);
    loop {
        rest = skip_whitespace(rest);
        let offset = rest.location_offset();
        let Some(first) = rest.fragment().chars().next() else {
            break;
        };
        match raw_token(rest) {
            Ok((next, (kind, text))) => {
                tokens.push(Token {
                    kind,
                    text: text.fragment().to_string(),
                    offset,
                });
                rest = next;
            }
            Err(_) if first == '"' || first == '\'' => {
                tokens.push(Token {
                    kind: TokenKind::Invalid(ScanFault::UnterminatedLiteral),
                    text: rest.fragment().to_string(),
                    offset,
                });
                rest = rest.take_from(rest.fragment().len());
            }
            Err(_) => {
                tokens.push(Token {
                    kind: TokenKind::Invalid(ScanFault::UnexpectedCharacter),
                    text: first.to_string(),
                    offset,
                });
                rest = rest.take_from(first.len_utf8());
            }
        }
    }
    tokens.push(Token {
        kind: TokenKind::Eof,
        text: String::new(),
        offset: input.len(),
    });
    classify(&mut tokens);
    tokens
}

fn skip_whitespace(input: Span) -> Span {
    let len = input
        .fragment()
        .find(|c: char| !c.is_whitespace())
        .unwrap_or(input.fragment().len());
    input.take_from(len)
}

/// Resolves names and `*` against their neighbours.
fn classify(tokens: &mut [Token]) {
    for i in 0..tokens.len() {
        let operator_position = i > 0 && !tokens[i - 1].kind.forces_operand();
        let next = tokens.get(i + 1).map(|t| t.kind);
        let token = &mut tokens[i];
        match token.kind {
            TokenKind::Star if operator_position => token.kind = TokenKind::Multiply,
            TokenKind::Name if operator_position => {
                if let Some(op) = operator_name(&token.text) {
                    token.kind = op;
                }
            }
            TokenKind::Name => {
                if next == Some(TokenKind::DoubleColon) {
                    token.kind = TokenKind::AxisName;
                } else if next == Some(TokenKind::LParen) && NODE_TYPES.contains(&token.text.as_str())
                {
                    token.kind = TokenKind::NodeType;
                }
            }
            _ => {}
        }
    }
}

fn operator_name(name: &str) -> Option<TokenKind> {
    match name {
        "and" => Some(TokenKind::And),
        "or" => Some(TokenKind::Or),
        "div" => Some(TokenKind::Div),
        "mod" => Some(TokenKind::Mod),
        "intersect" => Some(TokenKind::Intersect),
        "stream" => Some(TokenKind::Stream),
        _ => None,
    }
}

// --- Token parsers ---

type Scanned<'a> = (TokenKind, Span<'a>);

fn raw_token(input: Span) -> IResult<Span, Scanned> {
    alt((literal, number, name, symbol)).parse(input)
}

fn literal(input: Span) -> IResult<Span, Scanned> {
    map(
        alt((
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        )),
        |text| (TokenKind::Literal, text),
    )
    .parse(input)
}

fn number(input: Span) -> IResult<Span, Scanned> {
    map(
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        |text| (TokenKind::Number, text),
    )
    .parse(input)
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

fn name(input: Span) -> IResult<Span, Scanned> {
    map(
        recognize(pair(satisfy(is_name_start), take_while(is_name_char))),
        |text| (TokenKind::Name, text),
    )
    .parse(input)
}

fn sym<'a>(
    symbol: &'static str,
    kind: TokenKind,
) -> impl Parser<Span<'a>, Output = Scanned<'a>, Error = nom::error::Error<Span<'a>>> {
    map(tag(symbol), move |text| (kind, text))
}

fn symbol(input: Span) -> IResult<Span, Scanned> {
    alt((
        alt((
            sym("//", TokenKind::DoubleSlash),
            sym("::", TokenKind::DoubleColon),
            sym("..", TokenKind::DotDot),
            sym("!=", TokenKind::NotEquals),
            sym("<=", TokenKind::LessEq),
            sym(">=", TokenKind::GreaterEq),
        )),
        alt((
            sym("/", TokenKind::Slash),
            sym(":", TokenKind::Colon),
            sym(".", TokenKind::Dot),
            sym("=", TokenKind::Equals),
            sym("<", TokenKind::Less),
            sym(">", TokenKind::Greater),
            sym("(", TokenKind::LParen),
            sym(")", TokenKind::RParen),
            sym("[", TokenKind::LBracket),
            sym("]", TokenKind::RBracket),
            sym("@", TokenKind::At),
            sym(",", TokenKind::Comma),
            sym("|", TokenKind::Pipe),
            sym("$", TokenKind::Dollar),
            sym("*", TokenKind::Star),
            sym("+", TokenKind::Plus),
            sym("-", TokenKind::Minus),
        )),
    ))
    .parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        scan(input).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_maximal_munch() {
        assert_eq!(
            kinds("//a::b..!=<=>="),
            vec![
                TokenKind::DoubleSlash,
                TokenKind::AxisName,
                TokenKind::DoubleColon,
                TokenKind::Name,
                TokenKind::DotDot,
                TokenKind::NotEquals,
                TokenKind::LessEq,
                TokenKind::GreaterEq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_offsets_and_eof() {
        let tokens = scan("  //line[1]");
        assert_eq!(tokens[0].offset, 2);
        assert_eq!(tokens[1].text, "line");
        assert_eq!(tokens[1].offset, 4);
        let eof = tokens.last().unwrap();
        assert_eq!(eof.kind, TokenKind::Eof);
        assert_eq!(eof.offset, 11);
    }

    #[test]
    fn test_numbers() {
        let tokens = scan("12 3.5 .25 7.");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["12", "3.5", ".25", "7.", ""]);
        assert!(tokens[..4].iter().all(|t| t.kind == TokenKind::Number));
    }

    #[test]
    fn test_literals_strip_quotes() {
        let tokens = scan(r#"'it' "it's""#);
        assert_eq!(tokens[0].kind, TokenKind::Literal);
        assert_eq!(tokens[0].text, "it");
        assert_eq!(tokens[1].text, "it's");
    }

    #[test]
    fn test_unterminated_literal() {
        let tokens = scan("a = 'open");
        assert_eq!(
            tokens[2].kind,
            TokenKind::Invalid(ScanFault::UnterminatedLiteral)
        );
        assert_eq!(tokens[2].offset, 4);
        assert_eq!(tokens[3].kind, TokenKind::Eof);
    }

    #[test]
    fn test_unexpected_character() {
        let tokens = scan("a # b");
        assert_eq!(
            tokens[1].kind,
            TokenKind::Invalid(ScanFault::UnexpectedCharacter)
        );
        assert_eq!(tokens[1].text, "#");
        assert_eq!(tokens[2].kind, TokenKind::Name);
    }

    #[test]
    fn test_operator_names_depend_on_position() {
        assert_eq!(
            kinds("and and and"),
            vec![TokenKind::Name, TokenKind::And, TokenKind::Name, TokenKind::Eof]
        );
        assert_eq!(
            kinds("div/div"),
            vec![TokenKind::Name, TokenKind::Slash, TokenKind::Name, TokenKind::Eof]
        );
        assert_eq!(
            kinds("a stream b intersect c"),
            vec![
                TokenKind::Name,
                TokenKind::Stream,
                TokenKind::Name,
                TokenKind::Intersect,
                TokenKind::Name,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_star_disambiguation() {
        assert_eq!(
            kinds("* * *"),
            vec![TokenKind::Star, TokenKind::Multiply, TokenKind::Star, TokenKind::Eof]
        );
        assert_eq!(
            kinds("tag:*"),
            vec![TokenKind::Name, TokenKind::Colon, TokenKind::Star, TokenKind::Eof]
        );
    }

    #[test]
    fn test_node_type_needs_paren() {
        assert_eq!(kinds("text()")[0], TokenKind::NodeType);
        assert_eq!(kinds("text")[0], TokenKind::Name);
        assert_eq!(kinds("count()")[0], TokenKind::Name);
    }

    #[test]
    fn test_names_allow_hyphen_and_dot() {
        let tokens = scan("following-sibling::line.item");
        assert_eq!(tokens[0].kind, TokenKind::AxisName);
        assert_eq!(tokens[0].text, "following-sibling");
        assert_eq!(tokens[2].text, "line.item");
    }
}
