//! Expression tree

use std::fmt;

/// A parsed series expression.
///
/// Trees are immutable once built and can be evaluated any number of times
/// against different series maps.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to a raw metric series
    Metric { target: String },
    /// Integer-valued numeric constant and the digits it was written as
    Const { value: f64, literal: String },
    /// Function call. `raw_args` is the exact text between the parentheses,
    /// used when naming output series.
    Call {
        name: String,
        args: Vec<Expr>,
        raw_args: String,
    },
}

impl Expr {
    /// Create a metric reference
    pub fn metric(target: impl Into<String>) -> Self {
        Expr::Metric {
            target: target.into(),
        }
    }

    /// Create a numeric constant
    pub fn constant(value: f64) -> Self {
        Expr::Const {
            value,
            literal: value.to_string(),
        }
    }

    /// Metric targets referenced by this tree, depth-first and left to right.
    ///
    /// Duplicates are kept: a metric referenced twice is listed twice.
    pub fn metrics(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_metrics(&mut out);
        out
    }

    fn collect_metrics<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Metric { target } => out.push(target),
            Expr::Const { .. } => {}
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_metrics(out);
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Metric { target } => f.write_str(target),
            Expr::Const { literal, .. } => f.write_str(literal),
            Expr::Call { name, args, .. } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}
