//! RusTs Expr - Series expression language
//!
//! This crate turns expressions such as
//! `sum(scale(servers.*.requests,60),movingAverage(lb.requests,5))` into
//! derived series:
//! - Parsing text into an expression tree
//! - Collecting the metric names a tree needs fetched
//! - Evaluating the tree against already fetched series
//!
//! # Example
//!
//! ```ignore
//! use rusts_expr::{evaluate, ExprParser};
//!
//! let expr = ExprParser::parse_complete("movingAverage(cpu.load,5)")?;
//! let values = fetch(expr.metrics());
//! let series = evaluate(&expr, &values)?;
//! ```

pub mod ast;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod window;

pub use ast::Expr;
pub use config::ExprConfig;
pub use error::{ConfigError, EvalError, ParseError, Result, WindowError};
pub use evaluator::{evaluate, Evaluator};
pub use functions::{Arity, Function, FunctionRegistry};
pub use parser::ExprParser;
pub use window::WindowedMean;
