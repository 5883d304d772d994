//! Builtin function registry
//!
//! Maps the function names accepted in expressions to the closed set of
//! transforms the evaluator implements.

use crate::error::{EvalError, Result};

/// Builtin series functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// Trailing simple mean over a fixed number of samples
    MovingAverage,
    /// Difference to the previous sample, negative differences dropped
    NonNegativeDerivative,
    /// Multiply every sample by a constant
    Scale,
    /// Normalize a per-step rate to a per-N-seconds rate
    ScaleToSeconds,
    /// Element-wise sum of every resolved series
    Sum,
}

/// Number of arguments a function accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    /// Check an argument count against this arity
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "{}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

impl Function {
    /// Canonical name of the function
    pub fn name(&self) -> &'static str {
        match self {
            Function::MovingAverage => "movingAverage",
            Function::NonNegativeDerivative => "nonNegativeDerivative",
            Function::Scale => "scale",
            Function::ScaleToSeconds => "scaleToSeconds",
            Function::Sum => "sum",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Function::MovingAverage | Function::Scale | Function::ScaleToSeconds => {
                Arity::Exactly(2)
            }
            Function::NonNegativeDerivative => Arity::Exactly(1),
            Function::Sum => Arity::AtLeast(1),
        }
    }

    /// Fail with [`EvalError::ArityMismatch`] unless `count` arguments are accepted
    pub fn check_arity(&self, count: usize) -> Result<()> {
        let arity = self.arity();
        if arity.accepts(count) {
            Ok(())
        } else {
            Err(EvalError::ArityMismatch {
                function: self.name().to_string(),
                expected: arity.to_string(),
                actual: count,
            })
        }
    }
}

/// Registry for functions callable from expressions
pub struct FunctionRegistry;

impl FunctionRegistry {
    /// Resolve a function name. Names are case sensitive.
    pub fn get(name: &str) -> Result<Function> {
        match name {
            "movingAverage" => Ok(Function::MovingAverage),
            "nonNegativeDerivative" => Ok(Function::NonNegativeDerivative),
            "scale" => Ok(Function::Scale),
            "scaleToSeconds" => Ok(Function::ScaleToSeconds),
            "sum" | "sumSeries" => Ok(Function::Sum),
            _ => Err(EvalError::UnknownFunction(name.to_string())),
        }
    }

    /// Check if a name resolves to a builtin function
    pub fn is_known(name: &str) -> bool {
        Self::get(name).is_ok()
    }
}
