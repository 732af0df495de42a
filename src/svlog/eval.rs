// Copyright (c) 2016-2021 Fabian Schuiki

//! A tree-walking interpreter for constant expressions.
//!
//! Expression nodes are handed to the core by the parser collaborator; this
//! module reduces them to values in the [`ConstantValue`] domain. All
//! failures are in-band: a diagnostic is reported and `Unassigned` is
//! returned, which then propagates through every downstream operation.

use crate::compilation::Compilation;
use crate::crate_prelude::*;
use crate::value::{ConstantValue, SvInt};
use num::{ToPrimitive, Zero};
use std::cell::RefCell;
use std::collections::HashMap;

/// A unary operator.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// A binary operator.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// A constant expression node.
#[derive(Clone, PartialEq, Debug)]
pub enum Expr {
    Int(i32),
    Real(f64),
    Str(Vec<u8>),
    /// A reference to a parameter visible in the enclosing scope.
    Param(Name),
    /// A local slot; the only expression that can be an l-value.
    Local(usize),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// A call to a built-in method on the receiver value.
    MethodCall {
        receiver: Box<Expr>,
        method: Name,
        args: Vec<Expr>,
    },
    /// A reference to a specialization of a generic class. Evaluating this
    /// forces the specialization into existence.
    SpecializationOf { class: Name, args: Vec<Expr> },
    /// An expression the collaborators could not resolve; evaluates to
    /// `Unassigned` and reports `ExpressionNotConstant`.
    Invalid,
}

impl Expr {
    pub fn str<S: Into<Vec<u8>>>(s: S) -> Expr {
        Expr::Str(s.into())
    }

    pub fn call(receiver: Expr, method: Name, args: Vec<Expr>) -> Expr {
        Expr::MethodCall {
            receiver: Box::new(receiver),
            method,
            args,
        }
    }
}

/// The context a constant expression is evaluated in: the parameter
/// environment of the enclosing scope, local slots for l-values, and
/// optionally the compilation whose sink receives the diagnostics.
pub struct EvalContext<'sc, 'a> {
    comp: Option<&'sc Compilation<'a>>,
    pub params: HashMap<Name, ConstantValue>,
    pub loc: Location,
    locals: Vec<ConstantValue>,
    local_diags: RefCell<Diagnostics>,
}

impl<'sc, 'a> EvalContext<'sc, 'a> {
    /// Create a standalone context, with its own diagnostic sink.
    pub fn new() -> EvalContext<'sc, 'a> {
        EvalContext {
            comp: None,
            params: HashMap::new(),
            loc: INVALID_LOCATION,
            locals: Vec::new(),
            local_diags: RefCell::new(Diagnostics::new()),
        }
    }

    /// Create a context that reports into a compilation's sink.
    pub fn for_compilation(
        comp: &'sc Compilation<'a>,
        params: HashMap<Name, ConstantValue>,
        loc: Location,
    ) -> EvalContext<'sc, 'a> {
        EvalContext {
            comp: Some(comp),
            params,
            loc,
            locals: Vec::new(),
            local_diags: RefCell::new(Diagnostics::new()),
        }
    }

    /// Report a diagnostic into the compilation's sink, or the context's own
    /// sink when evaluating standalone.
    pub fn emit(&self, diag: Diagnostic) {
        match self.comp {
            Some(comp) => comp.diags.borrow_mut().add(diag),
            None => self.local_diags.borrow_mut().add(diag),
        }
    }

    /// The diagnostics reported into this standalone context.
    pub fn diagnostics(&self) -> std::cell::Ref<Diagnostics> {
        self.local_diags.borrow()
    }

    /// Allocate a local slot holding `value`, returning its index for use in
    /// `Expr::Local`.
    pub fn alloc_local(&mut self, value: ConstantValue) -> usize {
        self.locals.push(value);
        self.locals.len() - 1
    }

    /// Load the value of a local slot.
    pub fn load_local(&self, slot: usize) -> ConstantValue {
        self.locals[slot].clone()
    }

    /// Store a value into a local slot.
    pub fn store_local(&mut self, slot: usize, value: ConstantValue) {
        self.locals[slot] = value;
    }

    /// Resolve an expression to an l-value slot. Only local slots are
    /// assignable; anything else reports and yields `None`.
    pub fn eval_lvalue(&mut self, expr: &Expr) -> Option<usize> {
        match expr {
            Expr::Local(slot) => Some(*slot),
            _ => {
                self.emit(Diagnostic::new(DiagCode::ExpressionNotConstant, self.loc));
                None
            }
        }
    }

    /// Evaluate an expression to a constant value.
    pub fn eval(&mut self, expr: &Expr) -> ConstantValue {
        match expr {
            Expr::Int(v) => ConstantValue::int32(*v),
            Expr::Real(v) => ConstantValue::Real(*v),
            Expr::Str(v) => ConstantValue::Str(v.clone()),
            Expr::Param(name) => match self.params.get(name) {
                Some(v) => v.clone(),
                None => {
                    self.emit(Diagnostic::new(DiagCode::ExpressionNotConstant, self.loc));
                    ConstantValue::Unassigned
                }
            },
            Expr::Local(slot) => self.load_local(*slot),
            Expr::Unary(op, operand) => {
                let v = self.eval(operand);
                self.eval_unary(*op, v)
            }
            Expr::Binary(op, lhs, rhs) => {
                let lv = self.eval(lhs);
                let rv = self.eval(rhs);
                self.eval_binary(*op, lv, rv)
            }
            Expr::MethodCall {
                receiver,
                method,
                args,
            } => {
                let sub = match crate::builtins::registry().get(&*method.as_str()) {
                    Some(sub) => sub,
                    None => {
                        self.emit(Diagnostic::new(DiagCode::ExpressionNotConstant, self.loc));
                        return ConstantValue::Unassigned;
                    }
                };
                let mut all = Vec::with_capacity(args.len() + 1);
                all.push((**receiver).clone());
                all.extend(args.iter().cloned());
                sub.eval(self, &all)
            }
            Expr::SpecializationOf { class, args } => {
                let values: Vec<_> = args.iter().map(|a| self.eval(a)).collect();
                match self.comp {
                    Some(comp) => match comp.request_specialization(*class, values, self.loc) {
                        Some(_) => ConstantValue::int32(0),
                        None => ConstantValue::Unassigned,
                    },
                    None => ConstantValue::Unassigned,
                }
            }
            Expr::Invalid => {
                self.emit(Diagnostic::new(DiagCode::ExpressionNotConstant, self.loc));
                ConstantValue::Unassigned
            }
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, value: ConstantValue) -> ConstantValue {
        match (op, value) {
            (_, ConstantValue::Unassigned) => ConstantValue::Unassigned,
            (UnaryOp::Neg, ConstantValue::Int(v)) if !v.has_unknown() => {
                ConstantValue::Int(SvInt::new(32, true, -v.value))
            }
            (UnaryOp::Neg, ConstantValue::Real(v)) => ConstantValue::Real(-v),
            (UnaryOp::Not, ConstantValue::Int(v)) if !v.has_unknown() => {
                ConstantValue::int32(if v.value.is_zero() { 1 } else { 0 })
            }
            _ => {
                self.emit(Diagnostic::new(DiagCode::ExpressionNotConstant, self.loc));
                ConstantValue::Unassigned
            }
        }
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        lhs: ConstantValue,
        rhs: ConstantValue,
    ) -> ConstantValue {
        use ConstantValue as CV;
        match (lhs, rhs) {
            (CV::Unassigned, _) | (_, CV::Unassigned) => CV::Unassigned,
            (CV::Int(a), CV::Int(b)) => {
                if a.has_unknown() || b.has_unknown() {
                    return CV::Unassigned;
                }
                let value = match op {
                    BinaryOp::Add => a.value + b.value,
                    BinaryOp::Sub => a.value - b.value,
                    BinaryOp::Mul => a.value * b.value,
                    BinaryOp::Div => {
                        if b.value.is_zero() {
                            self.emit(Diagnostic::new(DiagCode::DivideByZero, self.loc));
                            return CV::Unassigned;
                        }
                        a.value / b.value
                    }
                };
                CV::Int(SvInt::new(32, true, value))
            }
            (a, b) => match (to_real(&a), to_real(&b)) {
                (Some(x), Some(y)) => match op {
                    BinaryOp::Add => CV::Real(x + y),
                    BinaryOp::Sub => CV::Real(x - y),
                    BinaryOp::Mul => CV::Real(x * y),
                    BinaryOp::Div => CV::Real(x / y),
                },
                _ => {
                    self.emit(Diagnostic::new(DiagCode::ExpressionNotConstant, self.loc));
                    CV::Unassigned
                }
            },
        }
    }
}

fn to_real(value: &ConstantValue) -> Option<f64> {
    match value {
        ConstantValue::Real(v) => Some(*v),
        ConstantValue::Int(v) if !v.has_unknown() => v.value.to_f64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::intern;

    #[test]
    fn arithmetic() {
        let mut cx = EvalContext::new();
        let e = Expr::Binary(
            BinaryOp::Add,
            Box::new(Expr::Int(40)),
            Box::new(Expr::Binary(
                BinaryOp::Mul,
                Box::new(Expr::Int(1)),
                Box::new(Expr::Int(2)),
            )),
        );
        assert_eq!(cx.eval(&e), ConstantValue::int32(42));
    }

    #[test]
    fn division_by_zero() {
        let mut cx = EvalContext::new();
        let e = Expr::Binary(BinaryOp::Div, Box::new(Expr::Int(1)), Box::new(Expr::Int(0)));
        assert_eq!(cx.eval(&e), ConstantValue::Unassigned);
        assert_eq!(cx.diagnostics().last().unwrap().code, DiagCode::DivideByZero);
    }

    #[test]
    fn params_resolve() {
        let mut cx = EvalContext::new();
        let n = intern("WIDTH");
        cx.params.insert(n, ConstantValue::int32(8));
        let e = Expr::Binary(BinaryOp::Sub, Box::new(Expr::Param(n)), Box::new(Expr::Int(1)));
        assert_eq!(cx.eval(&e), ConstantValue::int32(7));
    }

    #[test]
    fn invalid_reports_and_propagates() {
        let mut cx = EvalContext::new();
        let e = Expr::Unary(UnaryOp::Neg, Box::new(Expr::Invalid));
        assert_eq!(cx.eval(&e), ConstantValue::Unassigned);
        assert_eq!(
            cx.diagnostics().last().unwrap().code,
            DiagCode::ExpressionNotConstant
        );
        assert_eq!(cx.diagnostics().len(), 1);
    }

    #[test]
    fn locals_are_lvalues() {
        let mut cx = EvalContext::new();
        let slot = cx.alloc_local(ConstantValue::string("abc"));
        assert_eq!(cx.eval_lvalue(&Expr::Local(slot)), Some(slot));
        assert_eq!(cx.eval_lvalue(&Expr::Int(1)), None);
    }
}
