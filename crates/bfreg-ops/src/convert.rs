//! Ingestion of numbers, text and copies, and conversion back out.

use tracing::{trace, warn};

use bfreg_core::{BigFloat, Kernel, Options, Ptr, Status, DOUBLE_SIZE, WORD_SIZE};
use bfreg_pool::marshal;
use bfreg_pool::scratch::{with_cstr, with_scratch};
use bfreg_pool::BindError;

use crate::context::Context;
use crate::error::Error;

impl<K: Kernel> Context<K> {
    /// A fresh zero value already bound to a register.
    fn bound_zero(&mut self) -> Result<(BigFloat, Ptr), Error> {
        let out = BigFloat::default();
        let ptr = self.pool.ensure(&mut self.kernel, &out)?;
        Ok((out, ptr))
    }

    /// Ingest a float64 exactly.
    pub fn from_f64(&mut self, x: f64) -> Result<BigFloat, Error> {
        let (mut out, ptr) = self.bound_zero()?;
        self.kernel.set_float64(ptr, x)?;
        marshal::deserialize(&self.kernel, ptr, out.value_mut())?;
        trace!(value = %out.id(), x, "ingested float64");
        Ok(out)
    }

    /// Parse `text` with `opts`' radix, precision, rounding and parse flags.
    ///
    /// Unparseable text yields NaN; see [`parse_with_status`](Self::parse_with_status).
    pub fn parse(&mut self, text: &str, opts: &Options) -> Result<BigFloat, Error> {
        self.parse_with_status(text, opts).map(|(v, _)| v)
    }

    /// [`parse`](Self::parse), also returning the kernel status.
    pub fn parse_with_status(
        &mut self,
        text: &str,
        opts: &Options,
    ) -> Result<(BigFloat, Status), Error> {
        let r = opts.resolve_for_parse()?;
        let (mut out, ptr) = self.bound_zero()?;
        let status = with_cstr(&mut self.kernel, text, |k, s| {
            k.atof(ptr, s, r.radix, r.prec, r.flags)
                .map_err(BindError::from)
        })?
        .check("atof")?;
        marshal::deserialize(&self.kernel, ptr, out.value_mut())?;
        if status.is_exceptional() {
            warn!(%status, text, "parse reported exceptional status");
        }
        Ok((out, status))
    }

    /// A new value equal to `src`, copied by the kernel.
    pub fn copy(&mut self, src: &BigFloat) -> Result<BigFloat, Error> {
        let mut out = BigFloat::default();
        let (outs, ins) = self.bind_call("set", &[&out], &[src])?;
        self.kernel.set(outs[0], ins[0])?;
        marshal::deserialize(&self.kernel, outs[0], out.value_mut())?;
        Ok(out)
    }

    /// Round `value` to the nearest float64 using `opts.rounding`.
    pub fn to_number(&mut self, value: &BigFloat, opts: &Options) -> Result<f64, Error> {
        let r = opts.resolve()?;
        let ptr = self.pool.ensure(&mut self.kernel, value)?;
        with_scratch(&mut self.kernel, DOUBLE_SIZE, DOUBLE_SIZE, |k, cell| {
            k.get_float64(ptr, cell, r.rounding)?;
            Ok(k.memory().read_f64(cell)?)
        })
    }

    /// Format `value` as text. Radix 0 formats in base 10.
    pub fn to_text(&mut self, value: &BigFloat, opts: &Options) -> Result<String, Error> {
        let r = opts.resolve_for_format()?;
        let radix = if r.radix == 0 { 10 } else { r.radix };
        let ptr = self.pool.ensure(&mut self.kernel, value)?;
        with_scratch(&mut self.kernel, WORD_SIZE, WORD_SIZE, |k, cell| {
            let len = k.ftoa(cell, ptr, radix, r.prec, r.flags)?;
            let buf = k.memory().read_word(cell)?;
            let text = k.memory().read_str(buf, Some(len as usize));
            k.free(buf);
            Ok::<_, Error>(text?)
        })
    }
}
