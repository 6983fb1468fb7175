//! The generic dispatch routine and its typed wrappers.
//!
//! A call runs in a fixed order:
//!
//! 1. options are resolved (no foreign call happens on failure),
//! 2. the entry point is looked up and the operand count checked,
//! 3. the pool capacity is checked against inputs + outputs,
//! 4. numeric and text inputs are promoted to temporary values,
//! 5. every output, then every input, is bound,
//! 6. every binding is re-verified,
//! 7. the kernel runs and each output is read back.

use std::borrow::Cow;

use smallvec::SmallVec;
use tracing::{debug, warn};

use bfreg_core::{BigFloat, Kernel, Options, Ptr, Status};
use bfreg_pool::marshal;

use crate::context::Context;
use crate::error::{DispatchError, Error};
use crate::operand::Operand;

/// Register pointers of one call's operands.
pub(crate) type Ptrs = SmallVec<[Ptr; 2]>;

/// Results of one dispatched call.
#[derive(Clone, Debug, PartialEq)]
pub struct CallOutput {
    /// Output values, in entry-point order.
    pub values: SmallVec<[BigFloat; 2]>,
    /// The kernel's status word.
    pub status: Status,
}

impl<K: Kernel> Context<K> {
    /// Bind `outputs` then `inputs` and check none was evicted on the way.
    pub(crate) fn bind_call(
        &mut self,
        op: &'static str,
        outputs: &[&BigFloat],
        inputs: &[&BigFloat],
    ) -> Result<(Ptrs, Ptrs), Error> {
        let needed = outputs.len() + inputs.len();
        let capacity = self.pool.capacity() as usize;
        if needed > capacity {
            return Err(DispatchError::PoolTooSmall {
                op,
                needed,
                capacity,
            }
            .into());
        }
        let pool = &mut self.pool;
        let kernel = &mut self.kernel;
        let outs = outputs
            .iter()
            .map(|v| pool.ensure(kernel, v))
            .collect::<Result<Ptrs, _>>()?;
        let ins = inputs
            .iter()
            .map(|v| pool.ensure(kernel, v))
            .collect::<Result<Ptrs, _>>()?;
        for (v, &p) in outputs.iter().zip(&outs).chain(inputs.iter().zip(&ins)) {
            pool.verify(v, p)?;
        }
        Ok((outs, ins))
    }

    fn promote<'a>(
        &mut self,
        operand: Operand<'a>,
        opts: &Options,
    ) -> Result<Cow<'a, BigFloat>, Error> {
        Ok(match operand {
            Operand::Value(v) => Cow::Borrowed(v),
            Operand::Number(x) => Cow::Owned(self.from_f64(x)?),
            Operand::Text(s) => Cow::Owned(self.parse(s, opts)?),
        })
    }

    /// Run entry point `name` on `args`.
    pub fn call(
        &mut self,
        name: &str,
        args: &[Operand<'_>],
        opts: &Options,
    ) -> Result<CallOutput, Error> {
        let r = opts.resolve()?;
        let op = self.table.get(name)?;
        if args.len() != op.inputs {
            return Err(DispatchError::WrongArity {
                op: op.name,
                expected: op.inputs,
                got: args.len(),
            }
            .into());
        }
        let capacity = self.pool.capacity() as usize;
        if op.registers() > capacity {
            return Err(DispatchError::PoolTooSmall {
                op: op.name,
                needed: op.registers(),
                capacity,
            }
            .into());
        }

        let inputs = args
            .iter()
            .map(|&a| self.promote(a, opts))
            .collect::<Result<SmallVec<[Cow<'_, BigFloat>; 2]>, _>>()?;
        let input_refs: SmallVec<[&BigFloat; 2]> = inputs.iter().map(|c| &**c).collect();
        let mut values: SmallVec<[BigFloat; 2]> =
            (0..op.outputs).map(|_| BigFloat::default()).collect();
        let output_refs: SmallVec<[&BigFloat; 2]> = values.iter().collect();

        let (outs, ins) = self.bind_call(op.name, &output_refs, &input_refs)?;
        drop(output_refs);
        let status = self
            .kernel
            .invoke(op.name, &outs, &ins, r.prec, r.flags)?
            .check(op.name)?;
        for (v, &p) in values.iter_mut().zip(&outs) {
            marshal::deserialize(&self.kernel, p, v.value_mut())?;
        }

        debug!(
            op = op.name,
            inputs = op.inputs,
            outputs = op.outputs,
            %status,
            "dispatched"
        );
        if status.is_exceptional() {
            warn!(op = op.name, %status, "kernel reported exceptional status");
        }
        Ok(CallOutput { values, status })
    }

    fn call_n<const M: usize>(
        &mut self,
        name: &'static str,
        args: &[Operand<'_>],
        opts: &Options,
    ) -> Result<[BigFloat; M], Error> {
        let out = self.call(name, args, opts)?;
        let got = out.values.len();
        out.values.into_vec().try_into().map_err(|_| {
            Error::from(DispatchError::ResultCount {
                op: name,
                expected: M,
                got,
            })
        })
    }

    /// Quotient and remainder of `a / b`; the quotient is truncated.
    pub fn divrem<'a>(
        &mut self,
        a: impl Into<Operand<'a>>,
        b: impl Into<Operand<'a>>,
        opts: &Options,
    ) -> Result<(BigFloat, BigFloat), Error> {
        let [q, r] = self.call_n::<2>("divrem", &[a.into(), b.into()], opts)?;
        Ok((q, r))
    }
}

macro_rules! constant_ops {
    ($($(#[$doc:meta])* $name:ident;)*) => {
        impl<K: Kernel> Context<K> {
            $(
                $(#[$doc])*
                pub fn $name(&mut self, opts: &Options) -> Result<BigFloat, Error> {
                    let [v] = self.call_n::<1>(stringify!($name), &[], opts)?;
                    Ok(v)
                }
            )*
        }
    };
}

macro_rules! unary_ops {
    ($($(#[$doc:meta])* $name:ident;)*) => {
        impl<K: Kernel> Context<K> {
            $(
                $(#[$doc])*
                pub fn $name<'a>(
                    &mut self,
                    a: impl Into<Operand<'a>>,
                    opts: &Options,
                ) -> Result<BigFloat, Error> {
                    let [v] = self.call_n::<1>(stringify!($name), &[a.into()], opts)?;
                    Ok(v)
                }
            )*
        }
    };
}

macro_rules! binary_ops {
    ($($(#[$doc:meta])* $name:ident;)*) => {
        impl<K: Kernel> Context<K> {
            $(
                $(#[$doc])*
                pub fn $name<'a>(
                    &mut self,
                    a: impl Into<Operand<'a>>,
                    b: impl Into<Operand<'a>>,
                    opts: &Options,
                ) -> Result<BigFloat, Error> {
                    let [v] = self.call_n::<1>(stringify!($name), &[a.into(), b.into()], opts)?;
                    Ok(v)
                }
            )*
        }
    };
}

constant_ops! {
    /// ln 2 at the requested precision.
    const_log2;
    /// π at the requested precision.
    const_pi;
}

unary_ops! {
    /// Square root.
    sqrt;
    /// e^a.
    exp;
    /// Natural logarithm.
    log;
    /// Cosine.
    cos;
    /// Sine.
    sin;
    /// Tangent.
    tan;
    /// Arc cosine.
    acos;
    /// Arc sine.
    asin;
    /// Arc tangent.
    atan;
}

binary_ops! {
    /// a + b.
    add;
    /// a - b.
    sub;
    /// a × b.
    mul;
    /// a / b.
    div;
    /// Remainder with the quotient truncated toward zero.
    fmod;
    /// IEEE remainder (quotient rounded to nearest, ties to even).
    remainder;
    /// Bitwise OR of the integer parts.
    logic_or;
    /// Bitwise XOR of the integer parts.
    logic_xor;
    /// Bitwise AND of the integer parts.
    logic_and;
    /// a raised to b.
    pow;
    /// Arc tangent of a / b using both signs.
    atan2;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bfreg_core::{ConfigError, KernelError, Precision};
    use bfreg_pool::BindError;
    use bfreg_pool::PoolConfig;
    use bfreg_test_utils::SoftKernel;

    fn ctx(n: u32) -> Context<SoftKernel> {
        Context::new(SoftKernel::new(), PoolConfig::new(n)).unwrap()
    }

    fn num(c: &mut Context<SoftKernel>, v: &BigFloat) -> f64 {
        c.to_number(v, &Options::default()).unwrap()
    }

    #[test]
    fn binary_with_values() {
        let mut c = ctx(4);
        let o = Options::default();
        let a = c.from_f64(6.0).unwrap();
        let b = c.from_f64(4.0).unwrap();
        let s = c.add(&a, &b, &o).unwrap();
        let d = c.sub(&a, &b, &o).unwrap();
        let p = c.mul(&a, &b, &o).unwrap();
        let q = c.div(&a, &b, &o).unwrap();
        assert_eq!(num(&mut c, &s), 10.0);
        assert_eq!(num(&mut c, &d), 2.0);
        assert_eq!(num(&mut c, &p), 24.0);
        assert_eq!(num(&mut c, &q), 1.5);
    }

    #[test]
    fn numbers_and_text_are_promoted() {
        let mut c = ctx(4);
        let o = Options::default();
        let v = c.add(1.5, "2.25", &o).unwrap();
        assert_eq!(num(&mut c, &v), 3.75);
        let w = c.pow(&v, 2.0, &o).unwrap();
        assert_eq!(num(&mut c, &w), 14.0625);
    }

    #[test]
    fn constants_and_unary() {
        let mut c = ctx(2);
        let o = Options::default();
        let pi = c.const_pi(&o).unwrap();
        assert_eq!(num(&mut c, &pi), std::f64::consts::PI);
        let r = c.sqrt(16.0, &o).unwrap();
        assert_eq!(num(&mut c, &r), 4.0);
    }

    #[test]
    fn divrem_returns_both_outputs() {
        let mut c = ctx(4);
        let (q, r) = c.divrem(17.0, 5.0, &Options::default()).unwrap();
        assert_eq!(num(&mut c, &q), 3.0);
        assert_eq!(num(&mut c, &r), 2.0);
    }

    #[test]
    fn status_is_reported() {
        let mut c = ctx(3);
        let out = c
            .call("div", &[1.0.into(), 0.0.into()], &Options::default())
            .unwrap();
        assert!(out.status.has(Status::DIVIDE_ZERO));
        assert!(out.values[0].value().is_infinite());
    }

    #[test]
    fn precision_rounds_outputs() {
        let mut c = ctx(3);
        let o = Options::default().with_precision(Precision::Bits(4));
        let out = c.call("div", &[1.0.into(), 3.0.into()], &o).unwrap();
        assert!(out.status.has(Status::INEXACT));
        assert!(!out.status.is_exceptional());
        assert_eq!(num(&mut c, &out.values[0]), 0.34375);
    }

    #[test]
    fn unknown_op_and_arity() {
        let mut c = ctx(3);
        let o = Options::default();
        assert_eq!(
            c.call("hypot", &[1.0.into()], &o),
            Err(Error::Dispatch(DispatchError::UnknownOp {
                name: "hypot".into()
            }))
        );
        assert_eq!(
            c.call("add", &[1.0.into()], &o),
            Err(Error::Dispatch(DispatchError::WrongArity {
                op: "add",
                expected: 2,
                got: 1
            }))
        );
    }

    #[test]
    fn pool_too_small_is_rejected_before_binding() {
        let mut c = ctx(2);
        let a = c.from_f64(1.0).unwrap();
        let b = c.from_f64(2.0).unwrap();
        let inits = c.kernel().call_count("init");
        let err = c.add(&a, &b, &Options::default()).unwrap_err();
        assert_eq!(
            err,
            Error::Dispatch(DispatchError::PoolTooSmall {
                op: "add",
                needed: 3,
                capacity: 2
            })
        );
        assert!(err.is_fatal());
        assert_eq!(c.kernel().call_count("init"), inits);
        assert!(c.pool().is_bound(a.id()) && c.pool().is_bound(b.id()));
    }

    #[test]
    fn operands_survive_a_full_pool() {
        // Exactly N = inputs + outputs registers, all occupied beforehand.
        let mut c = ctx(3);
        let o = Options::default();
        let a = c.from_f64(7.0).unwrap();
        let b = c.from_f64(3.0).unwrap();
        let _x = c.from_f64(99.0).unwrap();
        let r = c.fmod(&a, &b, &o).unwrap();
        assert!(c.pool().is_bound(a.id()));
        assert!(c.pool().is_bound(b.id()));
        assert!(c.pool().is_bound(r.id()));
        assert_eq!(num(&mut c, &r), 1.0);
    }

    #[test]
    fn invalid_options_are_rejected_before_any_kernel_call() {
        let mut c = ctx(3);
        let a = c.from_f64(1.0).unwrap();
        let allocs = c.kernel().total_allocs();
        let inits = c.kernel().call_count("init");
        let cases = [
            (
                Options::default().with_radix(1),
                ConfigError::InvalidRadix { value: 1 },
            ),
            (
                Options::default().with_radix(37),
                ConfigError::InvalidRadix { value: 37 },
            ),
            (
                Options::default().with_precision(Precision::Bits(1)),
                ConfigError::InvalidPrecision { value: 1 },
            ),
        ];
        for (opts, want) in cases {
            assert_eq!(c.add(&a, "2", &opts), Err(Error::Config(want)));
        }
        assert_eq!(c.kernel().total_allocs(), allocs);
        assert_eq!(c.kernel().call_count("init"), inits);
        assert_eq!(c.kernel().call_count("add"), 0);
    }

    #[test]
    fn kernel_failure_propagates() {
        let mut c = ctx(3);
        c.kernel_mut().fail_next("sin");
        let err = c.sin(1.0, &Options::default()).unwrap_err();
        assert!(matches!(err, Error::Bind(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn kernel_memory_exhaustion_fails_the_call() {
        let mut c = ctx(3);
        c.kernel_mut().raise_next("add", Status::MEM_ERROR);
        let err = c
            .call("add", &[1.0.into(), 2.0.into()], &Options::default())
            .unwrap_err();
        assert_eq!(
            err,
            Error::Bind(BindError::Kernel(KernelError::Exhausted {
                entry: "add".into()
            }))
        );
        assert!(err.is_fatal());
        // The next call is unaffected.
        let v = c.add(1.0, 2.0, &Options::default()).unwrap();
        assert_eq!(num(&mut c, &v), 3.0);
    }
}
