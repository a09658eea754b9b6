//! Defines the Abstract Syntax Tree (AST) for selector expressions.
//!
//! The `Display` implementations print canonical selector text: parsing the
//! printed form of an expression yields an equal AST.

use std::fmt;

/// The top-level expression that can be evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(String),
    Number(f64),
    Path(LocationPath),
    /// A bare `/`: the document root.
    Root,
    /// `/ | expr`: the document root unioned with the rest of the union.
    RootUnion(Box<Expression>),
    Variable(QualifiedName),
    FunctionCall {
        name: QualifiedName,
        args: Vec<Expression>,
    },
    /// A primary expression followed by one or more predicates, e.g. `(//p)[1]`.
    Filter {
        primary: Box<Expression>,
        predicates: Vec<Expression>,
    },
    Binary {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    Negate(Box<Expression>),
}

const UNARY_PRECEDENCE: u8 = 8;
const PATH_PRECEDENCE: u8 = 11;

impl Expression {
    pub fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Self {
        Expression::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Checks if the expression is a `Path` variant.
    pub fn is_path(&self) -> bool {
        matches!(self, Expression::Path(_))
    }

    fn precedence(&self) -> u8 {
        match self {
            Expression::Binary { op, .. } => op.precedence(),
            Expression::Negate(_) => UNARY_PRECEDENCE,
            Expression::RootUnion(_) => BinaryOperator::Union.precedence(),
            _ => PATH_PRECEDENCE,
        }
    }

    /// True for expressions that can open a filter expression without parentheses.
    fn is_filter_primary(&self) -> bool {
        matches!(
            self,
            Expression::Literal(_)
                | Expression::Number(_)
                | Expression::Variable(_)
                | Expression::FunctionCall { .. }
        )
    }
}

/// A possibly prefixed name, e.g. `tag:ORG` or `count`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub prefix: Option<String>,
    pub local: String,
}

impl QualifiedName {
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
        }
    }

    pub fn prefixed(prefix: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            local: local.into(),
        }
    }
}

/// A binary operator used in an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Pipeline
    Stream,
    // Logical
    Or,
    And,
    // Equality
    Equals,
    NotEquals,
    // Relational
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    // Additive
    Plus,
    Minus,
    // Multiplicative
    Multiply,
    Divide,
    Modulo,
    // Set
    Union,
    Intersect,
}

impl BinaryOperator {
    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Stream => 1,
            BinaryOperator::Or => 2,
            BinaryOperator::And => 3,
            BinaryOperator::Equals | BinaryOperator::NotEquals => 4,
            BinaryOperator::LessThan
            | BinaryOperator::LessThanOrEqual
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterThanOrEqual => 5,
            BinaryOperator::Plus | BinaryOperator::Minus => 6,
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => 7,
            BinaryOperator::Union => 9,
            BinaryOperator::Intersect => 10,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Stream => "stream",
            BinaryOperator::Or => "or",
            BinaryOperator::And => "and",
            BinaryOperator::Equals => "=",
            BinaryOperator::NotEquals => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "div",
            BinaryOperator::Modulo => "mod",
            BinaryOperator::Union => "|",
            BinaryOperator::Intersect => "intersect",
        }
    }
}

/// Represents a full location path, like `/child::foo`, `descendant::bar[1]`, or `$var/item`.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    /// An optional starting expression, for paths like `$var/foo` or `func()/foo`.
    /// If `None`, the path starts from the context node or root.
    pub start_point: Option<Box<Expression>>,
    /// True if the path starts from the document root (e.g., `/foo`).
    /// Meaningless if `start_point` is `Some`.
    pub is_absolute: bool,
    pub steps: Vec<LocationStep>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocationStep {
    Step(Step),
    Abbreviated(AbbreviatedStep),
}

impl LocationStep {
    /// The `descendant-or-self::node()` step that `//` stands for.
    pub fn descendant_or_self() -> Self {
        LocationStep::Step(Step {
            axis: Axis::DescendantOrSelf,
            node_test: NodeTest::NodeType(NodeTypeTest::Node),
            predicates: Vec::new(),
        })
    }

    fn is_descendant_or_self(&self) -> bool {
        *self == LocationStep::descendant_or_self()
    }
}

/// `.` and `..`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbbreviatedStep {
    SelfNode,
    Parent,
}

/// Represents a single step in a location path, like `child::foo[position() > 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expression>,
}

/// The axis of movement from the context node.
///
/// Axes other than the core six are resolved by name at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Attribute,
    SelfAxis,
    Named(String),
}

impl Axis {
    pub fn from_name(name: &str) -> Self {
        match name {
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "parent" => Axis::Parent,
            "attribute" => Axis::Attribute,
            "self" => Axis::SelfAxis,
            other => Axis::Named(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Axis::Child => "child",
            Axis::Descendant => "descendant",
            Axis::DescendantOrSelf => "descendant-or-self",
            Axis::Parent => "parent",
            Axis::Attribute => "attribute",
            Axis::SelfAxis => "self",
            Axis::Named(name) => name,
        }
    }
}

/// A test to apply to nodes on a given axis to see if they should be included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// `*`
    Wildcard,
    /// `prefix:*`
    PrefixWildcard(String),
    /// A qualified name test (e.g., `line`, `tag:ORG`).
    Name(QualifiedName),
    /// A node type test (e.g., `text()`, `node()`).
    NodeType(NodeTypeTest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTypeTest {
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

// --- Printing ---

fn write_literal(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    if s.contains('\'') {
        write!(f, "\"{s}\"")
    } else {
        write!(f, "'{s}'")
    }
}

fn write_grouped(f: &mut fmt::Formatter<'_>, expr: &Expression, parens: bool) -> fmt::Result {
    if parens {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(s) => write_literal(f, s),
            Expression::Number(n) => write!(f, "{n}"),
            Expression::Path(path) => write!(f, "{path}"),
            Expression::Root => write!(f, "/"),
            Expression::RootUnion(rest) => write!(f, "/ | {rest}"),
            Expression::Variable(name) => write!(f, "${name}"),
            Expression::FunctionCall { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expression::Filter {
                primary,
                predicates,
            } => {
                write_grouped(f, primary, !primary.is_filter_primary())?;
                for predicate in predicates {
                    write!(f, "[{predicate}]")?;
                }
                Ok(())
            }
            Expression::Binary { left, op, right } => {
                let prec = op.precedence();
                // `/ | a | b` re-parses with the root union swallowing the whole chain,
                // and a bare `/` would read a following `div` or `*` as a name test.
                let left_parens = left.precedence() < prec
                    || (matches!(**left, Expression::RootUnion(_)) && prec >= 9)
                    || matches!(**left, Expression::Root);
                let right_parens = right.precedence() <= prec
                    && !(*op == BinaryOperator::Union
                        && matches!(**right, Expression::RootUnion(_)));
                write_grouped(f, left, left_parens)?;
                write!(f, " {} ", op.symbol())?;
                write_grouped(f, right, right_parens)
            }
            Expression::Negate(inner) => {
                write!(f, "-")?;
                write_grouped(f, inner, inner.precedence() < UNARY_PRECEDENCE)
            }
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

impl fmt::Display for LocationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let has_start = self.start_point.is_some();
        if let Some(start) = &self.start_point {
            let plain = start.is_filter_primary() || matches!(**start, Expression::Filter { .. });
            write_grouped(f, start, !plain)?;
        } else if self.is_absolute {
            write!(f, "/")?;
        }
        let mut prev_elided = false;
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 || has_start {
                write!(f, "/")?;
            }
            let elide = step.is_descendant_or_self()
                && i + 1 < self.steps.len()
                && (i > 0 || self.is_absolute || has_start)
                && !prev_elided;
            if !elide {
                write!(f, "{step}")?;
            }
            prev_elided = elide;
        }
        Ok(())
    }
}

impl fmt::Display for LocationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationStep::Abbreviated(AbbreviatedStep::SelfNode) => write!(f, "."),
            LocationStep::Abbreviated(AbbreviatedStep::Parent) => write!(f, ".."),
            LocationStep::Step(step) => write!(f, "{step}"),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.axis {
            Axis::Child => {}
            Axis::Attribute => write!(f, "@")?,
            axis => write!(f, "{}::", axis.name())?,
        }
        write!(f, "{}", self.node_test)?;
        for predicate in &self.predicates {
            write!(f, "[{predicate}]")?;
        }
        Ok(())
    }
}

impl fmt::Display for NodeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeTest::Wildcard => write!(f, "*"),
            NodeTest::PrefixWildcard(prefix) => write!(f, "{prefix}:*"),
            NodeTest::Name(name) => write!(f, "{name}"),
            NodeTest::NodeType(NodeTypeTest::Node) => write!(f, "node()"),
            NodeTest::NodeType(NodeTypeTest::Text) => write!(f, "text()"),
            NodeTest::NodeType(NodeTypeTest::Comment) => write!(f, "comment()"),
            NodeTest::NodeType(NodeTypeTest::ProcessingInstruction(None)) => {
                write!(f, "processing-instruction()")
            }
            NodeTest::NodeType(NodeTypeTest::ProcessingInstruction(Some(target))) => {
                write!(f, "processing-instruction(")?;
                write_literal(f, target)?;
                write!(f, ")")
            }
        }
    }
}
