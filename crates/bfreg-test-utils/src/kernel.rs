//! [`SoftKernel`]: a binary64-backed implementation of [`Kernel`].

use indexmap::IndexMap;

use bfreg_core::kernel::{SLOT_EXPN, SLOT_LEN, SLOT_SIGN, SLOT_TAB};
use bfreg_core::options::{ParseFlags, PREC_INF};
use bfreg_core::value::EXPN_ZERO;
use bfreg_core::{
    Kernel, KernelError, LinearMemory, LogicalValue, Ptr, RoundingMode, Status, WORD_SIZE,
};

use crate::convert::{value_from_f64, value_to_f64};
use crate::heap::Heap;

/// First address handed out by the allocator.
pub const HEAP_BASE: Ptr = 1024;

/// Reference kernel computing in binary64.
///
/// Every entry point keeps the slot layout contract (a buffer of exactly
/// `len` limbs). The allocator panics on double free and exposes live
/// allocation counts; [`fail_next`](Self::fail_next) injects a failure
/// into the next call of a named entry point,
/// [`fail_after`](Self::fail_after) fails it once its work is done, and
/// [`raise_next`](Self::raise_next) adds status bits to its result.
#[derive(Debug)]
pub struct SoftKernel {
    memory: LinearMemory,
    heap: Heap,
    calls: IndexMap<String, u64>,
    fail_next: Option<String>,
    fail_after: Option<String>,
    raise_next: Option<(String, u32)>,
}

impl SoftKernel {
    /// One initial page, growable to 16.
    pub fn new() -> Self {
        Self::with_pages(1, 16)
    }

    /// Custom initial and maximum page counts.
    pub fn with_pages(initial: u32, max: u32) -> Self {
        Self {
            memory: LinearMemory::new(initial, max),
            heap: Heap::new(HEAP_BASE),
            calls: IndexMap::new(),
            fail_next: None,
            fail_after: None,
            raise_next: None,
        }
    }

    /// Make the next call to entry point `name` fail.
    pub fn fail_next(&mut self, name: &str) {
        self.fail_next = Some(name.to_string());
    }

    /// Make the next call to `name` take full effect, then fail. Observed
    /// by the slot-writing entry points (`resize`, `set`, `set_float64`).
    pub fn fail_after(&mut self, name: &str) {
        self.fail_after = Some(name.to_string());
    }

    /// OR `bits` into the status of the next call to entry point `name`.
    /// Only status-returning entry points (`atof`, arithmetic) observe it.
    pub fn raise_next(&mut self, name: &str, bits: u32) {
        self.raise_next = Some((name.to_string(), bits));
    }

    fn raised(&mut self, name: &str, status: Status) -> Status {
        match self.raise_next.take() {
            Some((n, bits)) if n == name => status | Status(bits),
            other => {
                self.raise_next = other;
                status
            }
        }
    }

    /// Number of live `malloc` allocations.
    pub fn live_allocations(&self) -> usize {
        self.heap.live_count()
    }

    /// Bytes held by live allocations.
    pub fn live_bytes(&self) -> u64 {
        self.heap.live_bytes()
    }

    /// Total `malloc` calls that succeeded.
    pub fn total_allocs(&self) -> u64 {
        self.heap.total_allocs
    }

    /// Total `free` calls.
    pub fn total_frees(&self) -> u64 {
        self.heap.total_frees
    }

    /// Whether `ptr` is a live allocation.
    pub fn is_live(&self, ptr: Ptr) -> bool {
        self.heap.is_live(ptr)
    }

    /// How many times entry point `name` was called.
    pub fn call_count(&self, name: &str) -> u64 {
        self.calls.get(name).copied().unwrap_or(0)
    }

    /// Decode a slot directly, bypassing the binding layer.
    pub fn read_slot(&self, slot: Ptr) -> Result<LogicalValue, KernelError> {
        let mem = &self.memory;
        let sign = mem.read_sword(slot + SLOT_SIGN)? != 0;
        let expn = mem.read_sword(slot + SLOT_EXPN)?;
        let len = mem.read_word(slot + SLOT_LEN)? as usize;
        let mut value = LogicalValue::zero(false);
        value.set_header(sign, expn);
        if len > 0 {
            let tab = mem.read_word(slot + SLOT_TAB)?;
            mem.read_words(tab, value.resize_limbs(len))?;
        }
        Ok(value)
    }

    fn write_slot(&mut self, slot: Ptr, value: &LogicalValue) -> Result<(), KernelError> {
        self.memory.write_sword(slot + SLOT_SIGN, value.sign() as i32)?;
        self.memory.write_sword(slot + SLOT_EXPN, value.exponent())?;
        self.resize_slot(slot, value.limb_count() as u32)?;
        if value.has_buffer() {
            let tab = self.memory.read_word(slot + SLOT_TAB)?;
            self.memory.write_words(tab, value.limbs())?;
        }
        Ok(())
    }

    fn resize_slot(&mut self, slot: Ptr, len: u32) -> Result<(), KernelError> {
        let old_len = self.memory.read_word(slot + SLOT_LEN)?;
        let old_tab = self.memory.read_word(slot + SLOT_TAB)?;
        if len == old_len {
            return Ok(());
        }
        let new_tab = if len == 0 {
            0
        } else {
            let tab = self.heap.alloc(&mut self.memory, len * WORD_SIZE)?;
            let keep = old_len.min(len) as usize;
            if keep > 0 {
                let mut words = vec![0; keep];
                self.memory.read_words(old_tab, &mut words)?;
                self.memory.write_words(tab, &words)?;
            }
            tab
        };
        if old_tab != 0 {
            self.heap.release(old_tab);
        }
        self.memory.write_word(slot + SLOT_TAB, new_tab)?;
        self.memory.write_word(slot + SLOT_LEN, len)?;
        Ok(())
    }

    fn enter(&mut self, name: &str) -> Result<(), KernelError> {
        *self.calls.entry(name.to_string()).or_insert(0) += 1;
        if self.fail_next.as_deref() == Some(name) {
            self.fail_next = None;
            return Err(KernelError::Failed {
                reason: format!("injected failure in {name}"),
            });
        }
        Ok(())
    }

    fn leave(&mut self, name: &str) -> Result<(), KernelError> {
        if self.fail_after.as_deref() == Some(name) {
            self.fail_after = None;
            return Err(KernelError::Failed {
                reason: format!("injected failure after {name}"),
            });
        }
        Ok(())
    }

    fn read_f64_slot(&self, slot: Ptr) -> Result<f64, KernelError> {
        Ok(value_to_f64(&self.read_slot(slot)?))
    }

    fn write_f64_slot(&mut self, slot: Ptr, x: f64, prec: u32) -> Result<Status, KernelError> {
        let rounded = round_to_prec(x, prec);
        let mut status = if rounded == x || x.is_nan() {
            Status::OK
        } else {
            Status(Status::INEXACT)
        };
        if rounded.is_nan() {
            status = status | Status(Status::INVALID_OP);
        }
        self.write_slot(slot, &value_from_f64(rounded))?;
        Ok(status)
    }
}

impl Default for SoftKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel for SoftKernel {
    fn memory(&self) -> &LinearMemory {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut LinearMemory {
        &mut self.memory
    }

    fn malloc(&mut self, size: u32) -> Result<Ptr, KernelError> {
        self.enter("malloc")?;
        self.heap.alloc(&mut self.memory, size)
    }

    fn free(&mut self, ptr: Ptr) {
        *self.calls.entry("free".to_string()).or_insert(0) += 1;
        if ptr != 0 {
            self.heap.release(ptr);
        }
    }

    fn init(&mut self, slot: Ptr) -> Result<(), KernelError> {
        self.enter("init")?;
        self.memory.write_sword(slot + SLOT_SIGN, 0)?;
        self.memory.write_sword(slot + SLOT_EXPN, EXPN_ZERO)?;
        self.memory.write_word(slot + SLOT_LEN, 0)?;
        self.memory.write_word(slot + SLOT_TAB, 0)?;
        Ok(())
    }

    fn resize(&mut self, slot: Ptr, len: u32) -> Result<(), KernelError> {
        self.enter("resize")?;
        self.resize_slot(slot, len)?;
        self.leave("resize")
    }

    fn set(&mut self, dst: Ptr, src: Ptr) -> Result<Status, KernelError> {
        self.enter("set")?;
        let value = self.read_slot(src)?;
        self.write_slot(dst, &value)?;
        self.leave("set")?;
        Ok(Status::OK)
    }

    fn set_float64(&mut self, dst: Ptr, value: f64) -> Result<Status, KernelError> {
        self.enter("set_float64")?;
        self.write_slot(dst, &value_from_f64(value))?;
        self.leave("set_float64")?;
        Ok(Status::OK)
    }

    fn get_float64(
        &mut self,
        src: Ptr,
        out: Ptr,
        _rounding: RoundingMode,
    ) -> Result<Status, KernelError> {
        self.enter("get_float64")?;
        let x = self.read_f64_slot(src)?;
        self.memory.write_f64(out, x)?;
        Ok(Status::OK)
    }

    fn atof(
        &mut self,
        dst: Ptr,
        text: Ptr,
        radix: u32,
        prec: u32,
        flags: u32,
    ) -> Result<Status, KernelError> {
        self.enter("atof")?;
        let text = self.memory.read_str(text, None)?;
        let status = match parse_text(&text, radix, flags) {
            Some(x) => self.write_f64_slot(dst, x, prec)?,
            None => {
                self.write_slot(dst, &LogicalValue::nan())?;
                Status(Status::INVALID_OP)
            }
        };
        Ok(self.raised("atof", status))
    }

    fn ftoa(
        &mut self,
        out: Ptr,
        src: Ptr,
        radix: u32,
        _prec: u32,
        _flags: u32,
    ) -> Result<u32, KernelError> {
        self.enter("ftoa")?;
        LinearMemory::check_aligned(out, WORD_SIZE)?;
        let x = self.read_f64_slot(src)?;
        let text = format_f64(x, radix);
        let len = text.len() as u32;
        let buf = self.heap.alloc(&mut self.memory, len + 1)?;
        self.memory.write_bytes(buf, text.as_bytes())?;
        self.memory.write_word(out, buf)?;
        Ok(len)
    }

    fn invoke(
        &mut self,
        name: &str,
        outputs: &[Ptr],
        inputs: &[Ptr],
        prec: u32,
        _flags: u32,
    ) -> Result<Status, KernelError> {
        self.enter(name)?;
        let args = inputs
            .iter()
            .map(|&p| self.read_f64_slot(p))
            .collect::<Result<Vec<_>, _>>()?;
        let arg = |i: usize| args.get(i).copied().unwrap_or(f64::NAN);
        let (a, b) = (arg(0), arg(1));
        let results: Vec<f64> = match name {
            "const_log2" => vec![std::f64::consts::LN_2],
            "const_pi" => vec![std::f64::consts::PI],
            "sqrt" => vec![a.sqrt()],
            "exp" => vec![a.exp()],
            "log" => vec![a.ln()],
            "cos" => vec![a.cos()],
            "sin" => vec![a.sin()],
            "tan" => vec![a.tan()],
            "acos" => vec![a.acos()],
            "asin" => vec![a.asin()],
            "atan" => vec![a.atan()],
            "add" => vec![a + b],
            "sub" => vec![a - b],
            "mul" => vec![a * b],
            "div" => vec![a / b],
            "fmod" => vec![a % b],
            "remainder" => vec![ieee_remainder(a, b)],
            "logic_or" => vec![logic(a, b, |x, y| x | y)],
            "logic_xor" => vec![logic(a, b, |x, y| x ^ y)],
            "logic_and" => vec![logic(a, b, |x, y| x & y)],
            "pow" => vec![a.powf(b)],
            "atan2" => vec![a.atan2(b)],
            "divrem" => {
                let q = (a / b).trunc();
                vec![q, a - q * b]
            }
            _ => {
                return Err(KernelError::UnknownEntryPoint {
                    name: name.to_string(),
                })
            }
        };
        if results.len() != outputs.len() {
            return Err(KernelError::Failed {
                reason: format!(
                    "{name} produces {} results, got {} outputs",
                    results.len(),
                    outputs.len()
                ),
            });
        }
        let mut status = if b == 0.0 && matches!(name, "div" | "divrem") && a.is_finite() {
            Status(Status::DIVIDE_ZERO)
        } else {
            Status::OK
        };
        for (&out, x) in outputs.iter().zip(results) {
            status = status | self.write_f64_slot(out, x, prec)?;
        }
        Ok(self.raised(name, status))
    }
}

fn round_to_prec(x: f64, prec: u32) -> f64 {
    if prec >= 53 || prec == PREC_INF || !x.is_finite() || x == 0.0 {
        return x;
    }
    // Round the 53-bit significand to `prec` bits, ties to even.
    let drop = 53 - prec;
    let (mant, exp) = frexp(x);
    let scaled = mant * f64::powi(2.0, 53);
    let unit = f64::powi(2.0, drop as i32);
    let q = scaled / unit;
    let r = q.round();
    let r = if (q - q.trunc()).abs() == 0.5 && r % 2.0 != 0.0 {
        r - q.signum()
    } else {
        r
    };
    r * unit * f64::powi(2.0, exp - 53)
}

fn frexp(x: f64) -> (f64, i32) {
    let v = value_from_f64(x);
    let exp = v.exponent();
    (x * f64::powi(2.0, -exp), exp)
}

fn ieee_remainder(a: f64, b: f64) -> f64 {
    let q = a / b;
    let mut n = q.round();
    if (q - q.trunc()).abs() == 0.5 && n % 2.0 != 0.0 {
        n -= q.signum();
    }
    a - n * b
}

fn logic(a: f64, b: f64, op: impl Fn(i64, i64) -> i64) -> f64 {
    if !a.is_finite() || !b.is_finite() {
        return f64::NAN;
    }
    op(a.trunc() as i64, b.trunc() as i64) as f64
}

fn parse_text(text: &str, radix: u32, flags: u32) -> Option<f64> {
    let text = text.trim();
    let (neg, body) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let lower = body.to_ascii_lowercase();
    let magnitude = match lower.as_str() {
        "inf" | "infinity" => f64::INFINITY,
        "nan" => return Some(f64::NAN),
        _ => {
            let (radix, digits) = match (radix, lower.strip_prefix("0x")) {
                (0 | 16, Some(hex)) if flags & ParseFlags::NO_HEX == 0 => (16, hex),
                (0, _) => (10, lower.as_str()),
                (r, _) => (r, lower.as_str()),
            };
            if radix == 10 {
                if flags & ParseFlags::INT_ONLY != 0 && digits.contains(['.', 'e']) {
                    return None;
                }
                digits.parse::<f64>().ok()?
            } else {
                u64::from_str_radix(digits, radix).ok()? as f64
            }
        }
    };
    Some(if neg { -magnitude } else { magnitude })
}

fn format_f64(x: f64, radix: u32) -> String {
    if x.is_nan() {
        return "NaN".to_string();
    }
    if x.is_infinite() {
        return if x < 0.0 { "-Infinity" } else { "Infinity" }.to_string();
    }
    let radix = if radix == 0 { 10 } else { radix };
    if radix == 10 {
        return format!("{x}");
    }
    let mut out = String::new();
    if x < 0.0 {
        out.push('-');
    }
    let mut int = x.abs().trunc();
    let mut frac = x.abs() - int;
    let mut digits = Vec::new();
    while int >= 1.0 {
        let d = (int % radix as f64) as u32;
        digits.push(char::from_digit(d, radix).unwrap_or('?'));
        int = (int / radix as f64).trunc();
    }
    if digits.is_empty() {
        digits.push('0');
    }
    out.extend(digits.iter().rev());
    if frac > 0.0 {
        out.push('.');
        for _ in 0..64 {
            if frac == 0.0 {
                break;
            }
            frac *= radix as f64;
            let d = frac.trunc();
            out.push(char::from_digit(d as u32, radix).unwrap_or('?'));
            frac -= d;
        }
    }
    out
}
