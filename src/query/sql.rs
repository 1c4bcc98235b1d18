//! Leaf SQL vocabulary referenced by the select IR.
//!
//! These types stay deliberately small: they name tables, columns, predicates
//! and orderings well enough for relation descriptors to be compared and
//! hashed structurally. Turning them into query text is the renderer's job;
//! the `Display` impls here only feed explain output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bare SQL identifier (unquoted form).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identifier(pub String);

impl Identifier {
    /// Creates an identifier from any string-like value.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0.replace('"', "\"\""))
    }
}

/// Alias a table-like row source is bound to.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableAlias(pub Identifier);

impl TableAlias {
    /// Creates a table alias.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Identifier::new(name))
    }

    /// Returns the identifier the alias binds.
    pub fn identifier(&self) -> &Identifier {
        &self.0
    }
}

impl From<&str> for TableAlias {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for TableAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Alias of an output column.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnAlias(pub Identifier);

impl ColumnAlias {
    /// Creates a column alias.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Identifier::new(name))
    }

    /// Returns the alias text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ColumnAlias {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for ColumnAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Physical column name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Column(pub String);

impl Column {
    /// Creates a column reference by name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl From<&str> for Column {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

/// Schema-qualified table name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QualifiedTable {
    /// Owning schema.
    pub schema: String,
    /// Table name.
    pub name: String,
}

impl QualifiedTable {
    /// Creates a qualified table name.
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for QualifiedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\".\"{}\"", self.schema, self.name)
    }
}

/// Schema-qualified function name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FunctionName {
    /// Owning schema, if any.
    pub schema: Option<String>,
    /// Function name.
    pub name: String,
}

impl FunctionName {
    /// Creates an unqualified (built-in) function name.
    pub fn builtin(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Creates a schema-qualified function name.
    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "\"{schema}\".\"{}\"", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Literal values embedded in expressions.
///
/// Floating point literals travel as `Numeric` text so every expression keeps
/// total equality and a consistent hash.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Literal {
    /// SQL NULL.
    Null,
    /// Boolean literal.
    Bool(bool),
    /// Signed 64-bit integer literal.
    Int(i64),
    /// Text literal.
    Text(String),
    /// Arbitrary-precision numeric carried as its decimal text.
    Numeric(String),
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Text(value.to_owned())
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("NULL"),
            Literal::Bool(b) => f.write_str(if *b { "true" } else { "false" }),
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Numeric(n) => f.write_str(n),
        }
    }
}

/// Scalar expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    /// Unqualified column reference.
    Column(Column),
    /// Column qualified by the row source it is read from.
    QualifiedColumn {
        /// Row source identifier.
        qualifier: Identifier,
        /// Column name.
        column: Column,
    },
    /// Literal value.
    Literal(Literal),
    /// Positional query parameter (`$n`).
    Param(u32),
    /// Function application.
    Function {
        /// Function being applied.
        name: FunctionName,
        /// Arguments in call order.
        args: Vec<Expr>,
    },
    /// Type cast.
    Cast {
        /// Expression being cast.
        expr: Box<Expr>,
        /// Target type name.
        ty: String,
    },
    /// Key/value object constructor (`json_build_object`).
    BuildObject(Vec<(String, Expr)>),
    /// Array aggregate with an optional ordering (`json_agg(.. ORDER BY ..)`).
    ArrayAgg {
        /// Aggregated expression.
        expr: Box<Expr>,
        /// Ordering applied inside the aggregate.
        order_by: Option<Box<OrderByExpr>>,
    },
    /// Text passed through verbatim.
    Raw(String),
}

impl Expr {
    /// Shorthand for a qualified column reference.
    pub fn qualified(qualifier: impl Into<Identifier>, column: impl Into<Column>) -> Self {
        Expr::QualifiedColumn {
            qualifier: qualifier.into(),
            column: column.into(),
        }
    }

    /// Shorthand for an unqualified column reference.
    pub fn column(name: impl Into<Column>) -> Self {
        Expr::Column(name.into())
    }

    /// Shorthand for a literal.
    pub fn literal(value: impl Into<Literal>) -> Self {
        Expr::Literal(value.into())
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(col) => write!(f, "{col}"),
            Expr::QualifiedColumn { qualifier, column } => write!(f, "{qualifier}.{column}"),
            Expr::Literal(lit) => write!(f, "{lit}"),
            Expr::Param(idx) => write!(f, "${idx}"),
            Expr::Function { name, args } => {
                write!(f, "{name}(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Expr::Cast { expr, ty } => write!(f, "({expr})::{ty}"),
            Expr::BuildObject(fields) => {
                f.write_str("json_build_object(")?;
                for (idx, (key, value)) in fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{key}', {value}")?;
                }
                f.write_str(")")
            }
            Expr::ArrayAgg { expr, order_by } => match order_by {
                Some(order) => write!(f, "json_agg({expr} {order})"),
                None => write!(f, "json_agg({expr})"),
            },
            Expr::Raw(text) => f.write_str(text),
        }
    }
}

/// Comparison operators usable in predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        })
    }
}

/// Boolean predicate tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoolExpr {
    /// Constant boolean.
    Lit(bool),
    /// Binary comparison.
    Compare {
        /// Operator.
        op: CompareOp,
        /// Left operand.
        left: Expr,
        /// Right operand.
        right: Expr,
    },
    /// `IS NULL` / `IS NOT NULL` test.
    IsNull {
        /// Tested expression.
        expr: Expr,
        /// Whether the test is negated.
        negated: bool,
    },
    /// Conjunction.
    And(Vec<BoolExpr>),
    /// Disjunction.
    Or(Vec<BoolExpr>),
    /// Negation.
    Not(Box<BoolExpr>),
    /// `EXISTS (SELECT 1 FROM .. WHERE ..)`.
    Exists {
        /// Row source probed.
        from: Box<FromItem>,
        /// Correlated predicate.
        predicate: Box<BoolExpr>,
    },
}

impl BoolExpr {
    /// The always-true predicate.
    pub fn always_true() -> Self {
        BoolExpr::Lit(true)
    }

    /// Equality comparison shorthand.
    pub fn eq(left: Expr, right: Expr) -> Self {
        BoolExpr::Compare {
            op: CompareOp::Eq,
            left,
            right,
        }
    }
}

impl Default for BoolExpr {
    fn default() -> Self {
        BoolExpr::always_true()
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, terms: &[BoolExpr], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (idx, term) in terms.iter().enumerate() {
        if idx > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{term}")?;
    }
    f.write_str(")")
}

impl fmt::Display for BoolExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoolExpr::Lit(b) => f.write_str(if *b { "true" } else { "false" }),
            BoolExpr::Compare { op, left, right } => write!(f, "{left} {op} {right}"),
            BoolExpr::IsNull { expr, negated } => {
                if *negated {
                    write!(f, "{expr} IS NOT NULL")
                } else {
                    write!(f, "{expr} IS NULL")
                }
            }
            BoolExpr::And(terms) if terms.is_empty() => f.write_str("true"),
            BoolExpr::And(terms) => write_joined(f, terms, " AND "),
            BoolExpr::Or(terms) if terms.is_empty() => f.write_str("false"),
            BoolExpr::Or(terms) => write_joined(f, terms, " OR "),
            BoolExpr::Not(inner) => write!(f, "NOT ({inner})"),
            BoolExpr::Exists { from, predicate } => {
                write!(f, "EXISTS (SELECT 1 FROM {from} WHERE {predicate})")
            }
        }
    }
}

/// Row source appearing in a FROM clause.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FromItem {
    /// Base table or view.
    Table {
        /// Table scanned.
        table: QualifiedTable,
        /// Alias bound to the scan.
        alias: Option<TableAlias>,
    },
    /// Reference to a named row source already in scope (e.g. a CTE).
    Identifier(Identifier),
    /// Set-returning function call.
    Function {
        /// Function invoked.
        name: FunctionName,
        /// Call arguments.
        args: Vec<Expr>,
        /// Alias bound to the result set.
        alias: TableAlias,
    },
    /// `LATERAL` reference to a subquery bound under an identifier.
    Lateral(Identifier),
}

impl FromItem {
    /// Shorthand for an unaliased table scan.
    pub fn table(schema: &str, name: &str) -> Self {
        FromItem::Table {
            table: QualifiedTable::new(schema, name),
            alias: None,
        }
    }
}

impl fmt::Display for FromItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FromItem::Table { table, alias } => match alias {
                Some(alias) => write!(f, "{table} AS {alias}"),
                None => write!(f, "{table}"),
            },
            FromItem::Identifier(ident) => write!(f, "{ident}"),
            FromItem::Function { name, args, alias } => {
                write!(f, "{name}(")?;
                write_list(f, args)?;
                write!(f, ") AS {alias}")
            }
            FromItem::Lateral(ident) => write!(f, "LATERAL {ident}"),
        }
    }
}

/// Sort direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

/// Placement of NULLs within an ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NullsOrder {
    /// NULLs sort first.
    First,
    /// NULLs sort last.
    Last,
}

/// Single ORDER BY term.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderByItem {
    /// Sort key.
    pub expr: Expr,
    /// Sort direction.
    pub direction: OrderDirection,
    /// Explicit NULL placement, if any.
    pub nulls: Option<NullsOrder>,
}

impl OrderByItem {
    /// Ascending order on `expr` with default NULL placement.
    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            direction: OrderDirection::Asc,
            nulls: None,
        }
    }

    /// Descending order on `expr` with default NULL placement.
    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            direction: OrderDirection::Desc,
            nulls: None,
        }
    }
}

impl fmt::Display for OrderByItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if self.direction == OrderDirection::Desc {
            f.write_str(" DESC")?;
        }
        match self.nulls {
            Some(NullsOrder::First) => f.write_str(" NULLS FIRST"),
            Some(NullsOrder::Last) => f.write_str(" NULLS LAST"),
            None => Ok(()),
        }
    }
}

/// Non-empty ORDER BY clause.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderByExpr {
    first: OrderByItem,
    rest: Vec<OrderByItem>,
}

impl OrderByExpr {
    /// Creates an ordering with a single term.
    pub fn new(first: OrderByItem) -> Self {
        Self {
            first,
            rest: Vec::new(),
        }
    }

    /// Builds an ordering from a list of terms, `None` when the list is empty.
    pub fn from_items(items: impl IntoIterator<Item = OrderByItem>) -> Option<Self> {
        let mut iter = items.into_iter();
        let first = iter.next()?;
        Some(Self {
            first,
            rest: iter.collect(),
        })
    }

    /// Appends a tie-breaking term.
    pub fn then(mut self, item: OrderByItem) -> Self {
        self.rest.push(item);
        self
    }

    /// Iterates terms in priority order.
    pub fn items(&self) -> impl Iterator<Item = &OrderByItem> {
        std::iter::once(&self.first).chain(self.rest.iter())
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        1 + self.rest.len()
    }

    /// Always false; an ordering has at least one term.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for OrderByExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ORDER BY ")?;
        for (idx, item) in self.items().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

/// DISTINCT clause.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistinctExpr {
    /// Plain `DISTINCT`.
    Distinct,
    /// `DISTINCT ON (..)`.
    DistinctOn(Vec<Expr>),
}

impl fmt::Display for DistinctExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistinctExpr::Distinct => f.write_str("DISTINCT"),
            DistinctExpr::DistinctOn(exprs) => {
                f.write_str("DISTINCT ON (")?;
                write_list(f, exprs)?;
                f.write_str(")")
            }
        }
    }
}

/// Piece of an externally authored query.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterpolatedItem {
    /// Verbatim query text.
    Text(String),
    /// Scalar bound into the text.
    Scalar(Literal),
    /// Expression bound into the text.
    Expr(Expr),
}

/// Parameterised query inlined as a common table expression.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterpolatedQuery(pub Vec<InterpolatedItem>);

impl InterpolatedQuery {
    /// Creates a query consisting only of verbatim text.
    pub fn text(sql: impl Into<String>) -> Self {
        Self(vec![InterpolatedItem::Text(sql.into())])
    }
}

impl fmt::Display for InterpolatedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.0 {
            match item {
                InterpolatedItem::Text(text) => f.write_str(text)?,
                InterpolatedItem::Scalar(lit) => write!(f, "{lit}")?,
                InterpolatedItem::Expr(expr) => write!(f, "{expr}")?,
            }
        }
        Ok(())
    }
}
