//! Expression evaluator
//!
//! Walks an expression tree against a caller-supplied [`SeriesMap`] and
//! produces freshly allocated output series. Inputs are assumed to be
//! aligned already: every series passed to one function call shares length
//! and step, and nothing is resampled.
//!
//! Uses rayon to transform many input series in parallel; output order
//! always matches input order.

use crate::ast::Expr;
use crate::error::{EvalError, Result, WindowError};
use crate::functions::{Function, FunctionRegistry};
use crate::window::WindowedMean;
use rayon::prelude::*;
use rusts_core::{NamedSeries, ParallelConfig, SeriesMap};
use tracing::{debug, trace, warn};

/// Evaluate `expr` with the default configuration
pub fn evaluate(expr: &Expr, values: &SeriesMap) -> Result<Vec<NamedSeries>> {
    Evaluator::new().evaluate(expr, values)
}

/// Tree-walking evaluator for series expressions
pub struct Evaluator {
    config: ParallelConfig,
    /// Dedicated pool, only built when the config asks for one
    pool: Option<rayon::ThreadPool>,
}

impl Evaluator {
    /// Create an evaluator running on the global rayon pool
    pub fn new() -> Self {
        Self {
            config: ParallelConfig::default(),
            pool: None,
        }
    }

    /// Create an evaluator with explicit parallelism settings
    pub fn with_config(config: ParallelConfig) -> Result<Self> {
        let pool = if config.uses_dedicated_pool() {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.thread_pool_size)
                .thread_name(|i| format!("rusts-expr-{}", i))
                .build()
                .map_err(|e| EvalError::ThreadPool(e.to_string()))?;
            Some(pool)
        } else {
            None
        };

        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    /// Evaluate an expression tree against `values`.
    ///
    /// Metrics missing from `values` resolve to no series rather than an
    /// error. Any malformed call fails the whole evaluation.
    pub fn evaluate(&self, expr: &Expr, values: &SeriesMap) -> Result<Vec<NamedSeries>> {
        let result = match &self.pool {
            Some(pool) => pool.install(|| self.eval(expr, values)),
            None => self.eval(expr, values),
        };

        if let Err(e) = &result {
            warn!("Failed to evaluate '{}': {}", expr, e);
        }

        result
    }

    fn eval(&self, expr: &Expr, values: &SeriesMap) -> Result<Vec<NamedSeries>> {
        match expr {
            Expr::Metric { target } => match values.get(target) {
                Some(series) => Ok(series.clone()),
                None => {
                    trace!("Metric '{}' resolved no series", target);
                    Ok(Vec::new())
                }
            },
            Expr::Const { value, literal } => {
                Ok(vec![NamedSeries::scalar(literal.clone(), *value)])
            }
            Expr::Call {
                name,
                args,
                raw_args,
            } => self.eval_call(name, args, raw_args, values),
        }
    }

    fn eval_call(
        &self,
        name: &str,
        args: &[Expr],
        raw_args: &str,
        values: &SeriesMap,
    ) -> Result<Vec<NamedSeries>> {
        let function = FunctionRegistry::get(name)?;
        function.check_arity(args.len())?;

        let output = match function {
            Function::MovingAverage => {
                let inputs = self.eval(&args[0], values)?;
                let window = window_size(self.scalar_arg(name, args, 1, values)?)?;
                debug!("{} over {} series, window {}", name, inputs.len(), window);
                self.map_series(&inputs, |s| moving_average(s, window))?
            }
            Function::NonNegativeDerivative => {
                let inputs = self.eval(&args[0], values)?;
                debug!("{} over {} series", name, inputs.len());
                self.map_series(&inputs, |s| Ok(non_negative_derivative(s)))?
            }
            Function::Scale => {
                let inputs = self.eval(&args[0], values)?;
                let factor = self.scalar_arg(name, args, 1, values)?;
                debug!("{} over {} series by {}", name, inputs.len(), factor);
                self.map_series(&inputs, |s| Ok(scale(s, factor, raw_args)))?
            }
            Function::ScaleToSeconds => {
                let inputs = self.eval(&args[0], values)?;
                let seconds = self.scalar_arg(name, args, 1, values)?;
                debug!("{} over {} series to {}s", name, inputs.len(), seconds);
                self.map_series(&inputs, |s| Ok(scale_to_seconds(s, seconds, raw_args)))?
            }
            Function::Sum => {
                let mut inputs = Vec::new();
                for arg in args {
                    inputs.extend(self.eval(arg, values)?);
                }
                debug!("{} over {} series", name, inputs.len());
                let total = sum(&inputs, raw_args).ok_or_else(|| EvalError::EmptyAggregate {
                    function: name.to_string(),
                })?;
                vec![total]
            }
        };

        Ok(output)
    }

    /// Evaluate `args[index]` and require exactly one single-sample series
    fn scalar_arg(
        &self,
        function: &str,
        args: &[Expr],
        index: usize,
        values: &SeriesMap,
    ) -> Result<f64> {
        let series = self.eval(&args[index], values)?;

        match series.as_slice() {
            [only] => only.as_scalar().ok_or_else(|| EvalError::NonScalarArgument {
                function: function.to_string(),
                argument: index + 1,
                series: 1,
                samples: only.len(),
            }),
            _ => Err(EvalError::NonScalarArgument {
                function: function.to_string(),
                argument: index + 1,
                series: series.len(),
                samples: series.iter().map(NamedSeries::len).sum(),
            }),
        }
    }

    /// Apply a per-series transform, in parallel once there are enough inputs
    fn map_series<F>(&self, inputs: &[NamedSeries], f: F) -> Result<Vec<NamedSeries>>
    where
        F: Fn(&NamedSeries) -> std::result::Result<NamedSeries, WindowError> + Sync + Send,
    {
        let output = if self.config.should_parallelize_series(inputs.len()) {
            inputs.par_iter().map(&f).collect::<std::result::Result<Vec<_>, _>>()
        } else {
            inputs.iter().map(&f).collect::<std::result::Result<Vec<_>, _>>()
        };

        Ok(output?)
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a scalar argument into a window size, truncating toward zero
fn window_size(value: f64) -> Result<usize> {
    let n = value.trunc();
    if !n.is_finite() || n < 1.0 {
        return Err(EvalError::InvalidWindowSize { value });
    }
    Ok(n as usize)
}

// =============================================================================
// Per-series transforms
// =============================================================================

/// Trailing mean over the last `window` samples. Missing samples count as 0,
/// so the output never contains NaN.
pub fn moving_average(
    series: &NamedSeries,
    window: usize,
) -> std::result::Result<NamedSeries, WindowError> {
    // At most len() samples are ever pushed; a smaller buffer gives the same means.
    let mut w = WindowedMean::new(window.min(series.len()).max(1))?;
    let mut data = Vec::with_capacity(series.len());

    for &v in &series.data {
        w.push(if v.is_nan() { 0.0 } else { v });
        data.push(w.mean()?);
    }

    Ok(NamedSeries::new(
        format!("movingAverage({}, {})", series.name, window),
        data,
        series.step,
    ))
}

/// Difference to the previous sample. Negative differences and any
/// difference involving a missing sample become NaN.
pub fn non_negative_derivative(series: &NamedSeries) -> NamedSeries {
    let mut data = Vec::with_capacity(series.len());
    let mut prev = f64::NAN;

    for &v in &series.data {
        if prev.is_nan() || v.is_nan() {
            data.push(f64::NAN);
        } else {
            let diff = v - prev;
            data.push(if diff < 0.0 { f64::NAN } else { diff });
        }
        prev = v;
    }

    NamedSeries::new(
        format!("nonNegativeDerivative({})", series.name),
        data,
        series.step,
    )
}

/// Multiply every present sample by `factor`
pub fn scale(series: &NamedSeries, factor: f64, raw_args: &str) -> NamedSeries {
    NamedSeries::new(
        format!("scale({},{})", raw_args, format_g(factor)),
        multiply(&series.data, factor),
        series.step,
    )
}

/// Turn a per-step rate into a per-`seconds` rate.
///
/// Output is named like [`scale`], with `seconds` as the factor.
pub fn scale_to_seconds(series: &NamedSeries, seconds: f64, raw_args: &str) -> NamedSeries {
    let factor = seconds / series.step as f64;
    NamedSeries::new(
        format!("scale({},{})", raw_args, format_g(seconds)),
        multiply(&series.data, factor),
        series.step,
    )
}

/// Shortest `%g` rendering: plain decimal for exponents in -4..6, otherwise
/// exponent form with a sign and at least two exponent digits (`1e+06`).
fn format_g(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }

    let sci = format!("{:e}", v);
    let parts = sci
        .split_once('e')
        .and_then(|(mantissa, exp)| exp.parse::<i32>().ok().map(|exp| (mantissa, exp)));

    match parts {
        Some((mantissa, exp)) if !(-4..6).contains(&exp) => {
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        _ => v.to_string(),
    }
}

fn multiply(data: &[f64], factor: f64) -> Vec<f64> {
    data.iter()
        .map(|&v| if v.is_nan() { v } else { v * factor })
        .collect()
}

/// Element-wise sum with missing samples counted as 0.
///
/// The first series fixes the output length and step. Returns `None` when
/// there is nothing to sum.
pub fn sum(inputs: &[NamedSeries], raw_args: &str) -> Option<NamedSeries> {
    let first = inputs.first()?;
    let mut data = vec![0.0; first.len()];

    for series in inputs {
        for (acc, &v) in data.iter_mut().zip(&series.data) {
            if !v.is_nan() {
                *acc += v;
            }
        }
    }

    Some(NamedSeries::new(
        format!("sum({})", raw_args),
        data,
        first.step,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ExprParser;
    use rusts_core::series_map;

    fn eval_str(expr: &str, values: &SeriesMap) -> Result<Vec<NamedSeries>> {
        let expr = ExprParser::parse_complete(expr).unwrap();
        evaluate(&expr, values)
    }

    fn assert_series_eq(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "length mismatch");
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            if e.is_nan() {
                assert!(a.is_nan(), "sample {}: expected NaN, got {}", i, a);
            } else {
                assert!((a - e).abs() < 1e-9, "sample {}: expected {}, got {}", i, e, a);
            }
        }
    }

    #[test]
    fn test_metric_lookup() {
        let values = series_map(vec![("a", NamedSeries::new("a", vec![1.0, 2.0], 10))]);
        let result = eval_str("a", &values).unwrap();
        assert_eq!(result, values["a"]);
    }

    #[test]
    fn test_missing_metric_is_empty() {
        let result = eval_str("nope", &SeriesMap::new()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_constant() {
        let result = eval_str("12", &SeriesMap::new()).unwrap();
        assert_eq!(result, vec![NamedSeries::new("12", vec![12.0], 0)]);
    }

    #[test]
    fn test_constant_named_by_literal_text() {
        let result = eval_str("007", &SeriesMap::new()).unwrap();
        assert_eq!(result, vec![NamedSeries::new("007", vec![7.0], 0)]);
    }

    #[test]
    fn test_moving_average_partial_window() {
        let s = NamedSeries::new("x", vec![1.0, 2.0, 3.0, 4.0], 60);
        let out = moving_average(&s, 3).unwrap();
        assert_eq!(out.name, "movingAverage(x, 3)");
        assert_eq!(out.step, 60);
        assert_series_eq(&out.data, &[1.0, 1.5, 2.0, 3.0]);
    }

    #[test]
    fn test_moving_average_nan_counts_as_zero() {
        let s = NamedSeries::new("x", vec![4.0, f64::NAN, 2.0], 60);
        let out = moving_average(&s, 2).unwrap();
        assert_series_eq(&out.data, &[4.0, 2.0, 1.0]);
        assert!(out.data.iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn test_moving_average_constant_input() {
        let s = NamedSeries::new("x", vec![7.25; 20], 10);
        for window in [1, 2, 5, 20, 100] {
            let out = moving_average(&s, window).unwrap();
            assert_series_eq(&out.data, &[7.25; 20]);
        }
    }

    #[test]
    fn test_moving_average_empty_series() {
        let s = NamedSeries::new("x", vec![], 10);
        let out = moving_average(&s, 5).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.name, "movingAverage(x, 5)");
    }

    #[test]
    fn test_moving_average_rejects_bad_window() {
        let values = series_map(vec![("a", NamedSeries::new("a", vec![1.0], 10))]);
        let err = eval_str("movingAverage(a,0)", &values).unwrap_err();
        assert!(matches!(err, EvalError::InvalidWindowSize { .. }));
    }

    #[test]
    fn test_window_size_truncates() {
        assert_eq!(window_size(3.9).unwrap(), 3);
        assert!(window_size(0.5).is_err());
        assert!(window_size(f64::INFINITY).is_err());
        assert!(window_size(f64::NAN).is_err());
    }

    #[test]
    fn test_non_negative_derivative_increasing() {
        let s = NamedSeries::new("c", vec![1.0, 2.0, 3.0, 4.0], 10);
        let out = non_negative_derivative(&s);
        assert_eq!(out.name, "nonNegativeDerivative(c)");
        assert_series_eq(&out.data, &[f64::NAN, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_non_negative_derivative_decrease() {
        let s = NamedSeries::new("c", vec![5.0, 3.0], 10);
        assert_series_eq(&non_negative_derivative(&s).data, &[f64::NAN, f64::NAN]);
    }

    #[test]
    fn test_non_negative_derivative_gap() {
        let s = NamedSeries::new("c", vec![1.0, f64::NAN, 3.0, 6.0, 2.0, 4.0], 10);
        assert_series_eq(
            &non_negative_derivative(&s).data,
            &[f64::NAN, f64::NAN, f64::NAN, 3.0, f64::NAN, 2.0],
        );
    }

    #[test]
    fn test_scale_by_zero_keeps_nan() {
        let s = NamedSeries::new("m", vec![3.0, f64::NAN, -1.0], 10);
        let out = scale(&s, 0.0, "m,0");
        assert_eq!(out.name, "scale(m,0,0)");
        assert_series_eq(&out.data, &[0.0, f64::NAN, 0.0]);
    }

    #[test]
    fn test_format_g() {
        assert_eq!(format_g(0.0), "0");
        assert_eq!(format_g(2.0), "2");
        assert_eq!(format_g(0.5), "0.5");
        assert_eq!(format_g(0.0001), "0.0001");
        assert_eq!(format_g(0.00001), "1e-05");
        assert_eq!(format_g(123456.0), "123456");
        assert_eq!(format_g(1_000_000.0), "1e+06");
        assert_eq!(format_g(1_234_567.0), "1.234567e+06");
        assert_eq!(format_g(-2.5e-7), "-2.5e-07");
        assert_eq!(format_g(1e100), "1e+100");
        assert_eq!(format_g(f64::INFINITY), "+Inf");
        assert_eq!(format_g(f64::NAN), "NaN");
    }

    #[test]
    fn test_scale_name_uses_exponent_for_large_factor() {
        let values = series_map(vec![("a", NamedSeries::new("a", vec![1.0], 10))]);
        let out = eval_str("scale(a,1000000)", &values).unwrap();
        assert_eq!(out[0].name, "scale(a,1000000,1e+06)");

        let out = eval_str("scaleToSeconds(a,86400000)", &values).unwrap();
        assert_eq!(out[0].name, "scale(a,86400000,8.64e+07)");
    }

    #[test]
    fn test_scale_to_seconds() {
        let s = NamedSeries::new("rate", vec![6.0, f64::NAN, 12.0], 60);
        let out = scale_to_seconds(&s, 1.0, "rate,1");
        assert_eq!(out.name, "scale(rate,1,1)");
        assert_eq!(out.step, 60);
        assert_series_eq(&out.data, &[0.1, f64::NAN, 0.2]);
    }

    #[test]
    fn test_sum_treats_nan_as_zero() {
        let inputs = vec![
            NamedSeries::new("a", vec![1.0, f64::NAN, 3.0], 10),
            NamedSeries::new("b", vec![f64::NAN, f64::NAN, 1.0], 10),
        ];
        let out = sum(&inputs, "a,b").unwrap();
        assert_eq!(out.name, "sum(a,b)");
        assert_eq!(out.step, 10);
        assert_series_eq(&out.data, &[1.0, 0.0, 4.0]);
    }

    #[test]
    fn test_sum_shape_follows_first_series() {
        let inputs = vec![
            NamedSeries::new("a", vec![1.0, 1.0], 30),
            NamedSeries::new("b", vec![1.0, 1.0, 1.0], 10),
            NamedSeries::new("c", vec![1.0], 10),
        ];
        let out = sum(&inputs, "a,b,c").unwrap();
        assert_eq!(out.step, 30);
        assert_series_eq(&out.data, &[3.0, 2.0]);
    }

    #[test]
    fn test_sum_of_nothing() {
        assert!(sum(&[], "").is_none());

        let err = eval_str("sumSeries(missing)", &SeriesMap::new()).unwrap_err();
        assert!(matches!(
            err,
            EvalError::EmptyAggregate { ref function } if function == "sumSeries"
        ));
    }

    #[test]
    fn test_unknown_function() {
        let err = eval_str("median(a)", &SeriesMap::new()).unwrap_err();
        assert!(matches!(err, EvalError::UnknownFunction(ref name) if name == "median"));
    }

    #[test]
    fn test_arity_mismatch() {
        let err = eval_str("scale(a)", &SeriesMap::new()).unwrap_err();
        assert!(matches!(err, EvalError::ArityMismatch { actual: 1, .. }));
    }

    #[test]
    fn test_non_scalar_factor() {
        let values = series_map(vec![
            ("a", NamedSeries::new("a", vec![1.0, 2.0], 10)),
            ("f", NamedSeries::new("f", vec![2.0, 3.0], 10)),
        ]);

        let err = eval_str("scale(a,f)", &values).unwrap_err();
        assert!(matches!(
            err,
            EvalError::NonScalarArgument {
                argument: 2,
                series: 1,
                samples: 2,
                ..
            }
        ));

        let err = eval_str("scale(a,missing)", &values).unwrap_err();
        assert!(matches!(
            err,
            EvalError::NonScalarArgument { series: 0, .. }
        ));
    }

    #[test]
    fn test_scalar_from_metric_is_accepted() {
        let values = series_map(vec![
            ("a", NamedSeries::new("a", vec![1.0, 2.0], 10)),
            ("f", NamedSeries::new("f", vec![3.0], 10)),
        ]);
        let out = eval_str("scale(a,f)", &values).unwrap();
        assert_series_eq(&out[0].data, &[3.0, 6.0]);
        assert_eq!(out[0].name, "scale(a,f,3)");
    }

    #[test]
    fn test_deepest_nesting_evaluates() {
        let depth = crate::parser::MAX_NESTING_DEPTH;
        let input = format!("{}x{}", "sum(".repeat(depth), ")".repeat(depth));
        let values = series_map(vec![("x", NamedSeries::new("x", vec![1.0, 2.0], 10))]);

        let out = eval_str(&input, &values).unwrap();
        assert_eq!(out.len(), 1);
        assert_series_eq(&out[0].data, &[1.0, 2.0]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let entries: Vec<_> = (0..16)
            .map(|i| {
                let data = (0..50).map(|j| (i * j) as f64).collect();
                ("servers.*", NamedSeries::new(format!("servers.{}", i), data, 10))
            })
            .collect();
        let values = series_map(entries);
        let expr = ExprParser::parse_complete("movingAverage(servers.*,5)").unwrap();

        let parallel = Evaluator::with_config(ParallelConfig::new().with_series_threshold(1))
            .unwrap()
            .evaluate(&expr, &values)
            .unwrap();
        let sequential = Evaluator::with_config(ParallelConfig::sequential())
            .unwrap()
            .evaluate(&expr, &values)
            .unwrap();

        assert_eq!(parallel, sequential);
        assert_eq!(parallel[3].name, "movingAverage(servers.3, 5)");
    }

    #[test]
    fn test_dedicated_pool() {
        let evaluator =
            Evaluator::with_config(ParallelConfig::new().with_thread_pool_size(2)).unwrap();
        assert_eq!(evaluator.config().thread_pool_size, 2);
        assert_eq!(
            evaluator.pool.as_ref().map(|p| p.current_num_threads()),
            Some(2)
        );

        let values = series_map(vec![("a", NamedSeries::new("a", vec![1.0, 2.0], 10))]);
        let expr = ExprParser::parse_complete("sum(a,a)").unwrap();
        let out = evaluator.evaluate(&expr, &values).unwrap();
        assert_series_eq(&out[0].data, &[2.0, 4.0]);
    }
}
