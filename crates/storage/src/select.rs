//! Select statements with joins and three-valued filter logic
//!
//! This is the host's query engine: just enough relational semantics to
//! make join-type decisions observable.
//!
//! # Semantics
//!
//! - Joins run as nested loops in declaration order
//! - `INNER` drops a candidate with no matching joined row
//! - `OUTER` keeps it, with every column of that alias reading NULL
//! - `Eq` with a NULL operand is UNKNOWN; `IsNull` is always TRUE/FALSE
//! - A base row is returned when any joined combination evaluates TRUE
//! - Results are distinct by base id, in ascending id order

use std::collections::{BTreeMap, BTreeSet};

use valuta_core::{Error, JoinType, Result, Value};

use crate::table::{Row, Table};

/// Which relation a column reference reads from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Relation {
    /// The `FROM` table
    Base,
    /// A joined table, by alias
    Alias(String),
}

/// Column reference, optionally descending into a hash column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    /// Relation to read
    pub relation: Relation,
    /// Column name
    pub column: String,
    /// Map entry inside a hash column (`column -> path`)
    pub path: Option<String>,
}

impl ColumnRef {
    /// Column on the base table
    pub fn base(column: impl Into<String>) -> Self {
        Self {
            relation: Relation::Base,
            column: column.into(),
            path: None,
        }
    }

    /// Column on a joined alias
    pub fn aliased(alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            relation: Relation::Alias(alias.into()),
            column: column.into(),
            path: None,
        }
    }

    /// Descend into a map entry
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Expression operand
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Column value
    Column(ColumnRef),
    /// Constant
    Literal(Value),
}

/// Boolean filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `a = b` (UNKNOWN when either side is NULL)
    Eq(Operand, Operand),
    /// `a IS NULL`
    IsNull(Operand),
    /// Conjunction
    And(Box<Expr>, Box<Expr>),
    /// Disjunction
    Or(Box<Expr>, Box<Expr>),
    /// Negation
    Not(Box<Expr>),
}

/// Right-hand side of a join condition
#[derive(Debug, Clone, PartialEq)]
pub enum JoinValue {
    /// Column on the base table
    BaseColumn(String),
    /// Constant
    Literal(Value),
}

/// One `alias.column = value` join condition
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOn {
    /// Column on the joined table
    pub column: String,
    /// What it must equal
    pub value: JoinValue,
}

impl JoinOn {
    /// `alias.column = base.base_column`
    pub fn base(column: impl Into<String>, base_column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: JoinValue::BaseColumn(base_column.into()),
        }
    }

    /// `alias.column = literal`
    pub fn literal(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: JoinValue::Literal(value.into()),
        }
    }
}

/// A join clause
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// INNER or OUTER
    pub kind: JoinType,
    /// Joined table
    pub table: String,
    /// Alias, unique within one select
    pub alias: String,
    /// Conjunction of join conditions
    pub on: Vec<JoinOn>,
}

/// A select over one base table
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    /// Base table
    pub from: String,
    /// Joins in order
    pub joins: Vec<Join>,
    /// Optional filter
    pub filter: Option<Expr>,
}

impl Select {
    /// Select every row of `from`
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            from: table.into(),
            joins: Vec::new(),
            filter: None,
        }
    }
}

/// SQL three-valued truth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    /// TRUE
    True,
    /// FALSE
    False,
    /// UNKNOWN (NULL comparison)
    Unknown,
}

impl Truth {
    fn from_option(b: Option<bool>) -> Self {
        match b {
            Some(true) => Truth::True,
            Some(false) => Truth::False,
            None => Truth::Unknown,
        }
    }

    fn and(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::False, _) | (_, Truth::False) => Truth::False,
            (Truth::True, Truth::True) => Truth::True,
            _ => Truth::Unknown,
        }
    }

    fn or(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::True, _) | (_, Truth::True) => Truth::True,
            (Truth::False, Truth::False) => Truth::False,
            _ => Truth::Unknown,
        }
    }

    fn not(self) -> Truth {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Unknown => Truth::Unknown,
        }
    }
}

/// One candidate: base row plus the joined row (or NULL) per alias
struct Candidate<'a> {
    base: &'a Row,
    joined: BTreeMap<&'a str, Option<&'a Row>>,
}

impl Candidate<'_> {
    fn resolve(&self, column: &ColumnRef) -> Value {
        let cell = match &column.relation {
            Relation::Base => self.base.value(&column.column),
            Relation::Alias(alias) => match self.joined.get(alias.as_str()).copied().flatten() {
                Some(row) => row.value(&column.column),
                None => Value::Null,
            },
        };
        match &column.path {
            None => cell,
            Some(path) => match cell {
                Value::Map(map) => map.get(path).cloned().unwrap_or(Value::Null),
                _ => Value::Null,
            },
        }
    }

    fn operand(&self, operand: &Operand) -> Value {
        match operand {
            Operand::Column(c) => self.resolve(c),
            Operand::Literal(v) => v.clone(),
        }
    }

    fn eval(&self, expr: &Expr) -> Truth {
        match expr {
            Expr::Eq(a, b) => Truth::from_option(self.operand(a).sql_eq(&self.operand(b))),
            Expr::IsNull(a) => {
                if self.operand(a).is_null() {
                    Truth::True
                } else {
                    Truth::False
                }
            }
            Expr::And(l, r) => self.eval(l).and(self.eval(r)),
            Expr::Or(l, r) => self.eval(l).or(self.eval(r)),
            Expr::Not(x) => self.eval(x).not(),
        }
    }
}

fn join_matches(base: &Row, joined: &Row, on: &[JoinOn]) -> bool {
    on.iter().all(|cond| {
        let expected = match &cond.value {
            JoinValue::BaseColumn(c) => base.value(c),
            JoinValue::Literal(v) => v.clone(),
        };
        joined.value(&cond.column).sql_eq(&expected) == Some(true)
    })
}

/// Validate aliases and column references before execution
fn validate(select: &Select, tables: &BTreeMap<String, Table>) -> Result<()> {
    let base = tables
        .get(&select.from)
        .ok_or_else(|| Error::UnknownTable(select.from.clone()))?;

    let mut aliases: BTreeMap<&str, &Table> = BTreeMap::new();
    for join in &select.joins {
        let table = tables
            .get(&join.table)
            .ok_or_else(|| Error::UnknownTable(join.table.clone()))?;
        if aliases.insert(join.alias.as_str(), table).is_some() {
            return Err(Error::AmbiguousAlias(join.alias.clone()));
        }
        for cond in &join.on {
            if !table.schema().has_column(&cond.column) {
                return Err(Error::unknown_column(&join.table, &cond.column));
            }
            if let JoinValue::BaseColumn(c) = &cond.value {
                if !base.schema().has_column(c) {
                    return Err(Error::unknown_column(&select.from, c));
                }
            }
        }
    }

    let mut columns = Vec::new();
    if let Some(filter) = &select.filter {
        collect_columns(filter, &mut columns);
    }
    for column in columns {
        let (table, name) = match &column.relation {
            Relation::Base => (base, &select.from),
            Relation::Alias(alias) => match aliases.get(alias.as_str()) {
                Some(t) => (*t, alias),
                None => {
                    return Err(Error::InvalidOperation(format!(
                        "filter references unknown alias '{}'",
                        alias
                    )))
                }
            },
        };
        if !table.schema().has_column(&column.column) {
            return Err(Error::unknown_column(name, &column.column));
        }
    }
    Ok(())
}

fn collect_columns<'a>(expr: &'a Expr, out: &mut Vec<&'a ColumnRef>) {
    fn push<'a>(operand: &'a Operand, out: &mut Vec<&'a ColumnRef>) {
        if let Operand::Column(c) = operand {
            out.push(c);
        }
    }
    match expr {
        Expr::Eq(a, b) => {
            push(a, out);
            push(b, out);
        }
        Expr::IsNull(a) => push(a, out),
        Expr::And(l, r) | Expr::Or(l, r) => {
            collect_columns(l, out);
            collect_columns(r, out);
        }
        Expr::Not(x) => collect_columns(x, out),
    }
}

/// Execute `select` against a table map, returning distinct base rows
pub(crate) fn execute(select: &Select, tables: &BTreeMap<String, Table>) -> Result<Vec<Row>> {
    validate(select, tables)?;
    let base = &tables[&select.from];

    let mut out = BTreeSet::new();

    for row in base.rows.values() {
        let mut candidates = vec![Candidate {
            base: row,
            joined: BTreeMap::new(),
        }];

        for join in &select.joins {
            let table = &tables[&join.table];
            let mut next = Vec::with_capacity(candidates.len());
            for candidate in candidates {
                let matches: Vec<&Row> = table
                    .rows
                    .values()
                    .filter(|joined| join_matches(candidate.base, joined, &join.on))
                    .collect();
                if matches.is_empty() {
                    if join.kind == JoinType::Outer {
                        let mut joined = candidate.joined;
                        joined.insert(join.alias.as_str(), None);
                        next.push(Candidate {
                            base: candidate.base,
                            joined,
                        });
                    }
                } else {
                    for m in matches {
                        let mut joined = candidate.joined.clone();
                        joined.insert(join.alias.as_str(), Some(m));
                        next.push(Candidate {
                            base: candidate.base,
                            joined,
                        });
                    }
                }
            }
            candidates = next;
        }

        for candidate in &candidates {
            let keep = match &select.filter {
                Some(filter) => candidate.eval(filter) == Truth::True,
                None => true,
            };
            if keep {
                out.insert(row.id);
                break;
            }
        }
    }

    Ok(out.into_iter().map(|id| base.rows[&id].clone()).collect())
}
