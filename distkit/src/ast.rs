// Syntax tree for source-defined callables

// --- Literals ---

#[derive(Debug, PartialEq, Clone)]
pub enum Literal {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
    Undefined,
}

// --- Operators ---

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
    TypeOf,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LogicalOp {
    And,
    Or,
    Coalesce,
}

// --- Expressions ---

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Literal(Literal),
    Identifier(String),
    Array(Vec<Expression>),
    Object(Vec<(String, Expression)>),
    /// Nested function literal together with its own source text.
    Function(Box<FunctionDef>, String),
    Member(Box<Expression>, String),
    Index(Box<Expression>, Box<Expression>),
    Call(Box<Expression>, Vec<Expression>),
    Unary(UnaryOp, Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    Logical(LogicalOp, Box<Expression>, Box<Expression>),
    Conditional(Box<Expression>, Box<Expression>, Box<Expression>),
}

impl Expression {
    /// `a.b.c` as `["a", "b", "c"]` when the expression is a pure identifier/member chain.
    pub fn static_path(&self) -> Option<Vec<&str>> {
        match self {
            Expression::Identifier(name) => Some(vec![name.as_str()]),
            Expression::Member(object, property) => {
                let mut path = object.static_path()?;
                path.push(property.as_str());
                Some(path)
            }
            _ => None,
        }
    }
}

// --- Statements ---

#[derive(Debug, PartialEq, Clone)]
pub enum Statement {
    Declare(String, Option<Expression>),
    Return(Option<Expression>),
    If(Expression, Vec<Statement>, Option<Vec<Statement>>),
    Expression(Expression),
    Empty,
}

#[derive(Debug, PartialEq, Clone)]
pub enum FunctionBody {
    /// Arrow function with an expression body.
    Expression(Box<Expression>),
    Block(Vec<Statement>),
}

#[derive(Debug, PartialEq, Clone)]
pub struct FunctionDef {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: FunctionBody,
}
