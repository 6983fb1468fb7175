//! Option surface shared by ingestion, conversion and dispatch.
//!
//! [`Options`] is what callers fill in; [`Options::resolve`] validates it
//! and packs it into the scalar words the kernel expects
//! ([`ResolvedOptions`]). Validation always happens before any foreign
//! call, so an invalid option never leaves a half-bound register behind.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Smallest supported exponent field width, in bits.
pub const EXPN_BITS_MIN: u32 = 3;

/// Largest supported exponent field width, in bits.
pub const EXPN_BITS_MAX: u32 = 30;

/// Smallest finite precision, in bits.
pub const PREC_MIN: u32 = 2;

/// Largest finite precision, in bits.
pub const PREC_MAX: u32 = (1 << EXPN_BITS_MAX) - 2;

/// Precision word meaning "exact" (no rounding).
pub const PREC_INF: u32 = PREC_MAX + 1;

/// Flag bit allowing subnormal results.
pub const FLAG_ALLOW_SUBNORMAL: u32 = 1 << 3;

/// Shift of the reduced exponent width inside the flags word.
pub const FLAG_EXPN_BITS_SHIFT: u32 = 4;

/// Default precision in bits (IEEE 754 binary64).
pub const DEFAULT_PRECISION: u32 = 53;

/// Default exponent field width (IEEE 754 binary64).
pub const DEFAULT_EXPN_BITS: u32 = 11;

/// Rounding modes understood by the kernel, with their wire codes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum RoundingMode {
    /// Round to nearest, ties to even.
    #[default]
    TiesToEven = 0,
    /// Round toward zero.
    TowardZero = 1,
    /// Round toward negative infinity.
    TowardNegative = 2,
    /// Round toward positive infinity.
    TowardPositive = 3,
    /// Round to nearest, ties away from zero.
    TiesToAwayZero = 4,
    /// Faithful rounding (either neighbour).
    Faithful = 5,
}

impl RoundingMode {
    /// All modes, in code order.
    pub const ALL: [RoundingMode; 6] = [
        Self::TiesToEven,
        Self::TowardZero,
        Self::TowardNegative,
        Self::TowardPositive,
        Self::TiesToAwayZero,
        Self::Faithful,
    ];

    /// The wire code passed to the kernel.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Canonical name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Self::TiesToEven => "roundTiesToEven",
            Self::TowardZero => "roundTowardZero",
            Self::TowardNegative => "roundTowardNegative",
            Self::TowardPositive => "roundTowardPositive",
            Self::TiesToAwayZero => "roundTiesToAwayZero",
            Self::Faithful => "roundFaithful",
        }
    }
}

impl fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u32> for RoundingMode {
    type Error = ConfigError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|m| m.code() == code)
            .ok_or_else(|| ConfigError::InvalidRoundingMode {
                value: code.to_string(),
            })
    }
}

impl FromStr for RoundingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| ConfigError::InvalidRoundingMode {
                value: s.to_string(),
            })
    }
}

/// Working precision of an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precision {
    /// Round results to this many significand bits.
    Bits(u32),
    /// Exact results (only meaningful for operations that terminate).
    Infinite,
}

impl Precision {
    /// The precision word passed to the kernel.
    pub fn word(self) -> u32 {
        match self {
            Self::Bits(n) => n,
            Self::Infinite => PREC_INF,
        }
    }

    fn validate(self) -> Result<u32, ConfigError> {
        match self {
            Self::Bits(n) if (PREC_MIN..=PREC_MAX).contains(&n) => Ok(n),
            Self::Bits(n) => Err(ConfigError::InvalidPrecision { value: n }),
            Self::Infinite => Ok(PREC_INF),
        }
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self::Bits(DEFAULT_PRECISION)
    }
}

/// Flags consulted only when parsing text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseFlags {
    /// Reject `0x` prefixes.
    pub no_hex: bool,
    /// Accept `0b` and `0o` prefixes.
    pub bin_oct: bool,
    /// Accept integers only.
    pub int_only: bool,
    /// Reject a radix prefix after the sign.
    pub no_prefix_after_sign: bool,
    /// JavaScript number-literal quirks (`Infinity`, legacy octal).
    pub js_quirks: bool,
    /// Parse integers at infinite precision.
    pub int_prec_inf: bool,
}

impl ParseFlags {
    /// Reject hexadecimal prefixes.
    pub const NO_HEX: u32 = 1 << 16;
    /// Accept binary and octal prefixes.
    pub const BIN_OCT: u32 = 1 << 17;
    /// Integers only.
    pub const INT_ONLY: u32 = 1 << 18;
    /// No prefix after the sign.
    pub const NO_PREFIX_AFTER_SIGN: u32 = 1 << 19;
    /// JavaScript quirks.
    pub const JS_QUIRKS: u32 = 1 << 20;
    /// Integers at infinite precision.
    pub const INT_PREC_INF: u32 = 1 << 21;

    /// Packed flag bits.
    pub fn bits(&self) -> u32 {
        [
            (self.no_hex, Self::NO_HEX),
            (self.bin_oct, Self::BIN_OCT),
            (self.int_only, Self::INT_ONLY),
            (self.no_prefix_after_sign, Self::NO_PREFIX_AFTER_SIGN),
            (self.js_quirks, Self::JS_QUIRKS),
            (self.int_prec_inf, Self::INT_PREC_INF),
        ]
        .into_iter()
        .filter(|(on, _)| *on)
        .fold(0, |acc, (_, bit)| acc | bit)
    }
}

/// Layout of formatted text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextFormat {
    /// Fixed number of significant digits.
    Fixed,
    /// Fixed number of fractional digits.
    Frac,
    /// Enough digits to round-trip at the given precision.
    Free,
    /// Shortest digits that round-trip.
    #[default]
    FreeMin,
}

impl TextFormat {
    /// All formats, in code order.
    pub const ALL: [TextFormat; 4] = [Self::Fixed, Self::Frac, Self::Free, Self::FreeMin];

    /// Flag bits for this format.
    pub fn bits(self) -> u32 {
        let index = match self {
            Self::Fixed => 0,
            Self::Frac => 1,
            Self::Free => 2,
            Self::FreeMin => 3,
        };
        index << 16
    }

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Frac => "frac",
            Self::Free => "free",
            Self::FreeMin => "freeMin",
        }
    }
}

impl FromStr for TextFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| ConfigError::InvalidFormat {
                value: s.to_string(),
            })
    }
}

/// Options consulted only when formatting text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FormatOptions {
    /// Digit layout.
    pub format: TextFormat,
    /// Always use exponential notation.
    pub force_exp: bool,
    /// Prefix non-decimal output with `0x`, `0o` or `0b`.
    pub add_prefix: bool,
    /// JavaScript `Number.prototype.toString` quirks.
    pub js_quirks: bool,
}

impl FormatOptions {
    /// Force exponential notation.
    pub const FORCE_EXP: u32 = 1 << 20;
    /// Add a radix prefix.
    pub const ADD_PREFIX: u32 = 1 << 21;
    /// JavaScript quirks.
    pub const JS_QUIRKS: u32 = 1 << 22;

    /// Packed flag bits, including the format selector.
    pub fn bits(&self) -> u32 {
        let mut bits = self.format.bits();
        if self.force_exp {
            bits |= Self::FORCE_EXP;
        }
        if self.add_prefix {
            bits |= Self::ADD_PREFIX;
        }
        if self.js_quirks {
            bits |= Self::JS_QUIRKS;
        }
        bits
    }
}

/// Caller-facing options for every kernel-facing operation.
///
/// Defaults model IEEE 754 binary64: 53-bit precision, 11 exponent bits,
/// ties-to-even, subnormals allowed, radix chosen by the kernel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// Radix for parsing and formatting: 0 (kernel default) or 2..=36.
    pub radix: u32,
    /// Working precision.
    pub precision: Precision,
    /// Rounding mode.
    pub rounding: RoundingMode,
    /// Whether results may be subnormal.
    pub allow_subnormal: bool,
    /// Width of the exponent field.
    pub exponent_bits: u32,
    /// Flags used by text parsing.
    pub parse: ParseFlags,
    /// Options used by text formatting.
    pub format: FormatOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            radix: 0,
            precision: Precision::default(),
            rounding: RoundingMode::default(),
            allow_subnormal: true,
            exponent_bits: DEFAULT_EXPN_BITS,
            parse: ParseFlags::default(),
            format: FormatOptions::default(),
        }
    }
}

impl Options {
    /// Set the radix.
    pub fn with_radix(mut self, radix: u32) -> Self {
        self.radix = radix;
        self
    }

    /// Set the precision.
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    /// Set the rounding mode.
    pub fn with_rounding(mut self, rounding: RoundingMode) -> Self {
        self.rounding = rounding;
        self
    }

    /// Allow or forbid subnormal results.
    pub fn with_subnormal(mut self, allow: bool) -> Self {
        self.allow_subnormal = allow;
        self
    }

    /// Set the exponent field width.
    pub fn with_exponent_bits(mut self, bits: u32) -> Self {
        self.exponent_bits = bits;
        self
    }

    /// Set the text-parsing flags.
    pub fn with_parse_flags(mut self, parse: ParseFlags) -> Self {
        self.parse = parse;
        self
    }

    /// Set the text-formatting options.
    pub fn with_format(mut self, format: FormatOptions) -> Self {
        self.format = format;
        self
    }

    /// Validate and pack into kernel words. The flags word carries the
    /// rounding mode, subnormal flag and exponent width only.
    pub fn resolve(&self) -> Result<ResolvedOptions, ConfigError> {
        if self.radix != 0 && !(2..=36).contains(&self.radix) {
            return Err(ConfigError::InvalidRadix { value: self.radix });
        }
        let prec = self.precision.validate()?;
        if !(EXPN_BITS_MIN..=EXPN_BITS_MAX).contains(&self.exponent_bits) {
            return Err(ConfigError::InvalidExponentBits {
                value: self.exponent_bits,
            });
        }
        let mut flags = self.rounding.code();
        if self.allow_subnormal {
            flags |= FLAG_ALLOW_SUBNORMAL;
        }
        flags |= (EXPN_BITS_MAX - self.exponent_bits) << FLAG_EXPN_BITS_SHIFT;
        Ok(ResolvedOptions {
            radix: self.radix,
            prec,
            flags,
            rounding: self.rounding,
            exponent_bits: self.exponent_bits,
        })
    }

    /// [`resolve`](Self::resolve) plus the parse flags.
    pub fn resolve_for_parse(&self) -> Result<ResolvedOptions, ConfigError> {
        let mut resolved = self.resolve()?;
        resolved.flags |= self.parse.bits();
        Ok(resolved)
    }

    /// [`resolve`](Self::resolve) plus the format selector and flags.
    pub fn resolve_for_format(&self) -> Result<ResolvedOptions, ConfigError> {
        let mut resolved = self.resolve()?;
        resolved.flags |= self.format.bits();
        Ok(resolved)
    }
}

/// Validated options packed into the scalar words of a kernel call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedOptions {
    /// Radix word (0 = kernel default).
    pub radix: u32,
    /// Precision word ([`PREC_INF`] for exact).
    pub prec: u32,
    /// Rounding, subnormal, exponent-width and mode-specific flags.
    pub flags: u32,
    /// The rounding mode on its own, for entry points taking it alone.
    pub rounding: RoundingMode,
    /// Exponent field width.
    pub exponent_bits: u32,
}
