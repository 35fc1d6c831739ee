use crate::arena::Ctx;
use crate::buffer::safe_div;
use crate::indicator::Indicator;
use crate::series::LineSeries;
use std::ops;

/// Deferred arithmetic between lines as a tagged-variant tree.
///
/// An expression reads its operands at evaluation time, so the same tree
/// serves both the streaming and the batch path through one uniform
/// interface ([`ExprIndicator`]). `Input(k)` is the k-th bound input line
/// at the current bar; `Lagged(k, n)` the same line `n` bars back.
/// Comparisons evaluate to `1.0` / `0.0`; NaN operands poison comparisons
/// to NaN.
#[derive(Debug, Clone, PartialEq)]
pub enum LineExpr {
    Const(f64),
    Input(usize),
    Lagged(usize, usize),
    Add(Box<LineExpr>, Box<LineExpr>),
    Sub(Box<LineExpr>, Box<LineExpr>),
    Mul(Box<LineExpr>, Box<LineExpr>),
    Div(Box<LineExpr>, Box<LineExpr>),
    SafeDiv {
        num: Box<LineExpr>,
        den: Box<LineExpr>,
        zero: f64,
    },
    Neg(Box<LineExpr>),
    Abs(Box<LineExpr>),
    Max(Box<LineExpr>, Box<LineExpr>),
    Min(Box<LineExpr>, Box<LineExpr>),
    Gt(Box<LineExpr>, Box<LineExpr>),
    Lt(Box<LineExpr>, Box<LineExpr>),
    If {
        cond: Box<LineExpr>,
        then: Box<LineExpr>,
        or_else: Box<LineExpr>,
    },
}

impl LineExpr {
    pub fn eval(&self, ctx: &Ctx<'_>, i: usize) -> f64 {
        match self {
            Self::Const(v) => *v,
            Self::Input(k) => ctx.at(*k, i as isize),
            Self::Lagged(k, n) => ctx.at(*k, i as isize - *n as isize),
            Self::Add(a, b) => a.eval(ctx, i) + b.eval(ctx, i),
            Self::Sub(a, b) => a.eval(ctx, i) - b.eval(ctx, i),
            Self::Mul(a, b) => a.eval(ctx, i) * b.eval(ctx, i),
            Self::Div(a, b) => a.eval(ctx, i) / b.eval(ctx, i),
            Self::SafeDiv { num, den, zero } => safe_div(num.eval(ctx, i), den.eval(ctx, i), *zero),
            Self::Neg(a) => -a.eval(ctx, i),
            Self::Abs(a) => a.eval(ctx, i).abs(),
            Self::Max(a, b) => nan_strict(a.eval(ctx, i), b.eval(ctx, i), f64::max),
            Self::Min(a, b) => nan_strict(a.eval(ctx, i), b.eval(ctx, i), f64::min),
            Self::Gt(a, b) => compare(a.eval(ctx, i), b.eval(ctx, i), |x, y| x > y),
            Self::Lt(a, b) => compare(a.eval(ctx, i), b.eval(ctx, i), |x, y| x < y),
            Self::If {
                cond,
                then,
                or_else,
            } => {
                let c = cond.eval(ctx, i);
                if c.is_nan() {
                    f64::NAN
                } else if c != 0.0 {
                    then.eval(ctx, i)
                } else {
                    or_else.eval(ctx, i)
                }
            }
        }
    }

    /// Deepest lag referenced anywhere in the tree.
    pub fn max_lag(&self) -> usize {
        match self {
            Self::Const(_) | Self::Input(_) => 0,
            Self::Lagged(_, n) => *n,
            Self::Add(a, b)
            | Self::Sub(a, b)
            | Self::Mul(a, b)
            | Self::Div(a, b)
            | Self::Max(a, b)
            | Self::Min(a, b)
            | Self::Gt(a, b)
            | Self::Lt(a, b) => a.max_lag().max(b.max_lag()),
            Self::SafeDiv { num, den, .. } => num.max_lag().max(den.max_lag()),
            Self::Neg(a) | Self::Abs(a) => a.max_lag(),
            Self::If {
                cond,
                then,
                or_else,
            } => cond.max_lag().max(then.max_lag()).max(or_else.max_lag()),
        }
    }

    /// Highest input slot referenced, if any.
    pub fn max_input(&self) -> Option<usize> {
        match self {
            Self::Const(_) => None,
            Self::Input(k) | Self::Lagged(k, _) => Some(*k),
            Self::Add(a, b)
            | Self::Sub(a, b)
            | Self::Mul(a, b)
            | Self::Div(a, b)
            | Self::Max(a, b)
            | Self::Min(a, b)
            | Self::Gt(a, b)
            | Self::Lt(a, b) => a.max_input().max(b.max_input()),
            Self::SafeDiv { num, den, .. } => num.max_input().max(den.max_input()),
            Self::Neg(a) | Self::Abs(a) => a.max_input(),
            Self::If {
                cond,
                then,
                or_else,
            } => cond
                .max_input()
                .max(then.max_input())
                .max(or_else.max_input()),
        }
    }

    pub fn safe_div(self, den: LineExpr, zero: f64) -> LineExpr {
        LineExpr::SafeDiv {
            num: Box::new(self),
            den: Box::new(den),
            zero,
        }
    }

    pub fn abs(self) -> LineExpr {
        LineExpr::Abs(Box::new(self))
    }

    pub fn max(self, other: LineExpr) -> LineExpr {
        LineExpr::Max(Box::new(self), Box::new(other))
    }

    pub fn min(self, other: LineExpr) -> LineExpr {
        LineExpr::Min(Box::new(self), Box::new(other))
    }

    pub fn gt(self, other: LineExpr) -> LineExpr {
        LineExpr::Gt(Box::new(self), Box::new(other))
    }

    pub fn lt(self, other: LineExpr) -> LineExpr {
        LineExpr::Lt(Box::new(self), Box::new(other))
    }
}

fn nan_strict(a: f64, b: f64, pick: fn(f64, f64) -> f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        pick(a, b)
    }
}

fn compare(a: f64, b: f64, cmp: fn(f64, f64) -> bool) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if cmp(a, b) {
        1.0
    } else {
        0.0
    }
}

impl ops::Add for LineExpr {
    type Output = LineExpr;
    fn add(self, rhs: LineExpr) -> LineExpr {
        LineExpr::Add(Box::new(self), Box::new(rhs))
    }
}

impl ops::Sub for LineExpr {
    type Output = LineExpr;
    fn sub(self, rhs: LineExpr) -> LineExpr {
        LineExpr::Sub(Box::new(self), Box::new(rhs))
    }
}

impl ops::Mul for LineExpr {
    type Output = LineExpr;
    fn mul(self, rhs: LineExpr) -> LineExpr {
        LineExpr::Mul(Box::new(self), Box::new(rhs))
    }
}

impl ops::Div for LineExpr {
    type Output = LineExpr;
    fn div(self, rhs: LineExpr) -> LineExpr {
        LineExpr::Div(Box::new(self), Box::new(rhs))
    }
}

impl ops::Neg for LineExpr {
    type Output = LineExpr;
    fn neg(self) -> LineExpr {
        LineExpr::Neg(Box::new(self))
    }
}

impl From<f64> for LineExpr {
    fn from(v: f64) -> Self {
        LineExpr::Const(v)
    }
}

/// An expression mounted as a single-line indicator.
#[derive(Debug, Clone)]
pub struct ExprIndicator {
    expr: LineExpr,
    num_inputs: usize,
    min_period: usize,
}

impl ExprIndicator {
    pub fn new(expr: LineExpr) -> Self {
        let num_inputs = expr.max_input().map_or(0, |k| k + 1).max(1);
        let min_period = expr.max_lag() + 1;
        Self {
            expr,
            num_inputs,
            min_period,
        }
    }
}

impl Indicator for ExprIndicator {
    fn line_names(&self) -> &'static [&'static str] {
        &["expr"]
    }

    fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    fn min_period(&self) -> usize {
        self.min_period
    }

    fn update(&mut self, ctx: &Ctx<'_>, out: &mut LineSeries, i: usize) {
        if i + 1 < self.min_period {
            return;
        }
        out.set_abs(0, i, self.expr.eval(ctx, i));
    }
}
