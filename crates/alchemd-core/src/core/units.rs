//! Dimensioned physical quantities.
//!
//! A [`Quantity`] stores its magnitude in SI base units (radians for angles,
//! molar quantities per mole) together with the exponents of its seven base
//! dimensions. Conversions to a display [`Unit`] fail when the dimensions do
//! not match, which is how the restraint engine rejects, for instance, a bond
//! force constant given per radian squared.

use serde::Deserialize;
use std::f64::consts::PI;
use std::fmt;
use std::ops::{Div, Mul, Neg};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum UnitError {
    #[error("Incompatible dimensions: expected {expected}, found {found}")]
    IncompatibleDimensions {
        expected: Dimensions,
        found: Dimensions,
    },
    #[error("Invalid numeric value '{0}'")]
    InvalidNumber(String),
    #[error("Unknown unit '{0}'")]
    UnknownUnit(String),
    #[error("Malformed unit expression '{expression}': {reason}")]
    MalformedExpression { expression: String, reason: String },
}

/// Exponents of the base dimensions, in the order
/// (angle, charge, length, mass, quantity, temperature, time).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimensions {
    pub angle: i8,
    pub charge: i8,
    pub length: i8,
    pub mass: i8,
    pub quantity: i8,
    pub temperature: i8,
    pub time: i8,
}

impl Dimensions {
    pub const NONE: Self = Self::new(0, 0, 0, 0, 0, 0, 0);
    pub const ANGLE: Self = Self::new(1, 0, 0, 0, 0, 0, 0);
    pub const CHARGE: Self = Self::new(0, 1, 0, 0, 0, 0, 0);
    pub const LENGTH: Self = Self::new(0, 0, 1, 0, 0, 0, 0);
    pub const MASS: Self = Self::new(0, 0, 0, 1, 0, 0, 0);
    pub const QUANTITY: Self = Self::new(0, 0, 0, 0, 1, 0, 0);
    pub const TEMPERATURE: Self = Self::new(0, 0, 0, 0, 0, 1, 0);
    pub const TIME: Self = Self::new(0, 0, 0, 0, 0, 0, 1);
    /// Energy per mole.
    pub const MOLAR_ENERGY: Self = Self::new(0, 0, 2, 1, -1, 0, -2);
    /// Molar energy per length squared.
    pub const BOND_FORCE_CONSTANT: Self = Self::new(0, 0, 0, 1, -1, 0, -2);
    /// Molar energy per angle squared.
    pub const ANGLE_FORCE_CONSTANT: Self = Self::new(-2, 0, 2, 1, -1, 0, -2);

    pub const fn new(
        angle: i8,
        charge: i8,
        length: i8,
        mass: i8,
        quantity: i8,
        temperature: i8,
        time: i8,
    ) -> Self {
        Self {
            angle,
            charge,
            length,
            mass,
            quantity,
            temperature,
            time,
        }
    }

    pub const fn mul(self, other: Self) -> Self {
        Self::new(
            self.angle + other.angle,
            self.charge + other.charge,
            self.length + other.length,
            self.mass + other.mass,
            self.quantity + other.quantity,
            self.temperature + other.temperature,
            self.time + other.time,
        )
    }

    pub const fn div(self, other: Self) -> Self {
        self.mul(other.powi(-1))
    }

    pub const fn powi(self, n: i8) -> Self {
        Self::new(
            self.angle * n,
            self.charge * n,
            self.length * n,
            self.mass * n,
            self.quantity * n,
            self.temperature * n,
            self.time * n,
        )
    }

    fn zip_with(self, other: Self, f: impl Fn(i8, i8) -> Option<i8>) -> Option<Self> {
        Some(Self::new(
            f(self.angle, other.angle)?,
            f(self.charge, other.charge)?,
            f(self.length, other.length)?,
            f(self.mass, other.mass)?,
            f(self.quantity, other.quantity)?,
            f(self.temperature, other.temperature)?,
            f(self.time, other.time)?,
        ))
    }

    /// Like [`mul`](Self::mul), but `None` when an exponent leaves the `i8` range.
    pub fn checked_mul(self, other: Self) -> Option<Self> {
        self.zip_with(other, i8::checked_add)
    }

    pub fn checked_div(self, other: Self) -> Option<Self> {
        self.checked_mul(other.checked_powi(-1)?)
    }

    pub fn checked_powi(self, n: i8) -> Option<Self> {
        self.zip_with(self, |exponent, _| exponent.checked_mul(n))
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}, {}, {}, {})",
            self.angle,
            self.charge,
            self.length,
            self.mass,
            self.quantity,
            self.temperature,
            self.time
        )
    }
}

/// A unit of measure: a scale factor to SI base units plus dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    scale: f64,
    dimensions: Dimensions,
}

pub const DIMENSIONLESS: Unit = Unit::new(1.0, Dimensions::NONE);
pub const METER: Unit = Unit::new(1.0, Dimensions::LENGTH);
pub const NANOMETER: Unit = Unit::new(1e-9, Dimensions::LENGTH);
pub const ANGSTROM: Unit = Unit::new(1e-10, Dimensions::LENGTH);
pub const RADIAN: Unit = Unit::new(1.0, Dimensions::ANGLE);
pub const DEGREE: Unit = Unit::new(PI / 180.0, Dimensions::ANGLE);
pub const KELVIN: Unit = Unit::new(1.0, Dimensions::TEMPERATURE);
pub const MOLE: Unit = Unit::new(1.0, Dimensions::QUANTITY);
pub const KILOGRAM: Unit = Unit::new(1.0, Dimensions::MASS);
pub const GRAM: Unit = Unit::new(1e-3, Dimensions::MASS);
pub const SECOND: Unit = Unit::new(1.0, Dimensions::TIME);
pub const PICOSECOND: Unit = Unit::new(1e-12, Dimensions::TIME);
pub const FEMTOSECOND: Unit = Unit::new(1e-15, Dimensions::TIME);
pub const JOULE: Unit = Unit::new(1.0, Dimensions::new(0, 0, 2, 1, 0, 0, -2));
pub const KILOJOULE: Unit = Unit::new(1e3, Dimensions::new(0, 0, 2, 1, 0, 0, -2));
pub const KILOCALORIE: Unit = Unit::new(4184.0, Dimensions::new(0, 0, 2, 1, 0, 0, -2));
pub const KJ_PER_MOL: Unit = Unit::new(1e3, Dimensions::MOLAR_ENERGY);
pub const KCAL_PER_MOL: Unit = Unit::new(4184.0, Dimensions::MOLAR_ENERGY);

impl Unit {
    pub const fn new(scale: f64, dimensions: Dimensions) -> Self {
        Self { scale, dimensions }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn powi(self, n: i8) -> Self {
        Self::new(self.scale.powi(n as i32), self.dimensions.powi(n))
    }

    /// Unit algebra for untrusted expressions: `None` on exponent overflow.
    pub fn checked_mul(self, rhs: Unit) -> Option<Unit> {
        let dimensions = self.dimensions.checked_mul(rhs.dimensions)?;
        Some(Self::new(self.scale * rhs.scale, dimensions))
    }

    pub fn checked_div(self, rhs: Unit) -> Option<Unit> {
        let dimensions = self.dimensions.checked_div(rhs.dimensions)?;
        Some(Self::new(self.scale / rhs.scale, dimensions))
    }

    pub fn checked_powi(self, n: i8) -> Option<Unit> {
        let dimensions = self.dimensions.checked_powi(n)?;
        Some(Self::new(self.scale.powi(n as i32), dimensions))
    }

    fn lookup(name: &str) -> Option<Unit> {
        let unit = match name {
            "1" => DIMENSIONLESS,
            "m" | "meter" | "meters" => METER,
            "nm" | "nanometer" | "nanometers" => NANOMETER,
            "Å" | "A" | "angstrom" | "angstroms" => ANGSTROM,
            "rad" | "radian" | "radians" => RADIAN,
            "deg" | "degree" | "degrees" | "°" => DEGREE,
            "K" | "kelvin" => KELVIN,
            "mol" | "mole" | "moles" => MOLE,
            "kg" | "kilogram" => KILOGRAM,
            "g" | "gram" => GRAM,
            "s" | "second" => SECOND,
            "ps" | "picosecond" => PICOSECOND,
            "fs" | "femtosecond" => FEMTOSECOND,
            "J" | "joule" => JOULE,
            "kJ" | "kj" | "kilojoule" => KILOJOULE,
            "kcal" | "kilocalorie" => KILOCALORIE,
            "kj_per_mol" => KJ_PER_MOL,
            "kcal_per_mol" => KCAL_PER_MOL,
            _ => return None,
        };
        Some(unit)
    }
}

impl Mul for Unit {
    type Output = Unit;
    fn mul(self, rhs: Unit) -> Unit {
        Unit::new(self.scale * rhs.scale, self.dimensions.mul(rhs.dimensions))
    }
}

impl Div for Unit {
    type Output = Unit;
    fn div(self, rhs: Unit) -> Unit {
        Unit::new(self.scale / rhs.scale, self.dimensions.div(rhs.dimensions))
    }
}

impl Mul<Unit> for f64 {
    type Output = Quantity;
    fn mul(self, rhs: Unit) -> Quantity {
        Quantity::new(self, rhs)
    }
}

/// A value with physical dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct Quantity {
    value: f64,
    dimensions: Dimensions,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self {
            value: value * unit.scale,
            dimensions: unit.dimensions,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn has_dimensions(&self, dimensions: Dimensions) -> bool {
        self.dimensions == dimensions
    }

    /// Magnitude in SI base units.
    pub fn si_value(&self) -> f64 {
        self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0.0
    }

    /// Converts the quantity to a numeric value in `unit`.
    pub fn value_in(&self, unit: Unit) -> Result<f64, UnitError> {
        if self.dimensions != unit.dimensions {
            return Err(UnitError::IncompatibleDimensions {
                expected: unit.dimensions,
                found: self.dimensions,
            });
        }
        Ok(self.value / unit.scale)
    }
}

impl Mul<f64> for Quantity {
    type Output = Quantity;
    fn mul(self, rhs: f64) -> Quantity {
        Quantity {
            value: self.value * rhs,
            dimensions: self.dimensions,
        }
    }
}

impl Div<f64> for Quantity {
    type Output = Quantity;
    fn div(self, rhs: f64) -> Quantity {
        Quantity {
            value: self.value / rhs,
            dimensions: self.dimensions,
        }
    }
}

impl Mul for Quantity {
    type Output = Quantity;
    fn mul(self, rhs: Quantity) -> Quantity {
        Quantity {
            value: self.value * rhs.value,
            dimensions: self.dimensions.mul(rhs.dimensions),
        }
    }
}

impl Div for Quantity {
    type Output = Quantity;
    fn div(self, rhs: Quantity) -> Quantity {
        Quantity {
            value: self.value / rhs.value,
            dimensions: self.dimensions.div(rhs.dimensions),
        }
    }
}

impl Mul<Unit> for Quantity {
    type Output = Quantity;
    fn mul(self, rhs: Unit) -> Quantity {
        self * Quantity::new(1.0, rhs)
    }
}

impl Div<Unit> for Quantity {
    type Output = Quantity;
    fn div(self, rhs: Unit) -> Quantity {
        self / Quantity::new(1.0, rhs)
    }
}

impl Neg for Quantity {
    type Output = Quantity;
    fn neg(self) -> Quantity {
        self * -1.0
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Int(i8),
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn tokenize(expression: &str) -> Result<Vec<Token>, UnitError> {
    let malformed = |reason: &str| UnitError::MalformedExpression {
        expression: expression.to_string(),
        reason: reason.to_string(),
    };

    let mut tokens = Vec::new();
    let mut chars = expression.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '*' | '.' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '^' => {
                chars.next();
                tokens.push(Token::Caret);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '-' | '0'..='9' => {
                let mut digits = String::new();
                digits.push(c);
                chars.next();
                while let Some(&d) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    digits.push(d);
                    chars.next();
                }
                let n = digits.parse().map_err(|_| malformed("invalid exponent"))?;
                tokens.push(Token::Int(n));
            }
            c if c.is_alphabetic() || c == '_' || c == '°' => {
                let mut name = String::new();
                while let Some(&d) = chars.peek() {
                    if !(d.is_alphabetic() || d == '_' || d == '°') {
                        break;
                    }
                    name.push(d);
                    chars.next();
                }
                tokens.push(Token::Name(name));
            }
            other => return Err(malformed(&format!("unexpected character '{other}'"))),
        }
    }
    Ok(tokens)
}

struct UnitParser<'a> {
    expression: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> UnitParser<'a> {
    fn malformed(&self, reason: &str) -> UnitError {
        UnitError::MalformedExpression {
            expression: self.expression.to_string(),
            reason: reason.to_string(),
        }
    }

    fn overflow(&self) -> UnitError {
        self.malformed("dimension exponent out of range")
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<Unit, UnitError> {
        let mut unit = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.next();
                    let rhs = self.term()?;
                    unit = unit.checked_mul(rhs).ok_or_else(|| self.overflow())?;
                }
                Some(Token::Slash) => {
                    self.next();
                    let rhs = self.term()?;
                    unit = unit.checked_div(rhs).ok_or_else(|| self.overflow())?;
                }
                _ => return Ok(unit),
            }
        }
    }

    fn term(&mut self) -> Result<Unit, UnitError> {
        let base = self.atom()?;
        if self.peek() == Some(&Token::Caret) {
            self.next();
            return match self.next() {
                Some(Token::Int(n)) => base.checked_powi(n).ok_or_else(|| self.overflow()),
                _ => Err(self.malformed("expected integer exponent after '^'")),
            };
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Unit, UnitError> {
        match self.next() {
            Some(Token::Name(name)) => {
                Unit::lookup(&name).ok_or(UnitError::UnknownUnit(name))
            }
            Some(Token::Int(1)) => Ok(DIMENSIONLESS),
            Some(Token::LParen) => {
                let unit = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(unit),
                    _ => Err(self.malformed("unbalanced parenthesis")),
                }
            }
            _ => Err(self.malformed("expected a unit name")),
        }
    }
}

impl FromStr for Unit {
    type Err = UnitError;

    /// Parses unit expressions such as `kcal/mol/angstrom^2` or `kJ/(mol*rad^2)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = UnitParser {
            expression: s,
            tokens: tokenize(s)?,
            pos: 0,
        };
        let unit = parser.expr()?;
        if parser.pos != parser.tokens.len() {
            return Err(parser.malformed("trailing tokens"));
        }
        Ok(unit)
    }
}

impl FromStr for Quantity {
    type Err = UnitError;

    /// Parses `"<number> <unit expression>"`, e.g. `"10 kcal/mol/angstrom^2"`.
    /// A bare number is dimensionless.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (number, unit) = match s.find(char::is_whitespace) {
            Some(i) => (&s[..i], s[i..].trim()),
            None => (s, ""),
        };
        let value: f64 = number
            .parse()
            .map_err(|_| UnitError::InvalidNumber(number.to_string()))?;
        let unit = if unit.is_empty() {
            DIMENSIONLESS
        } else {
            unit.parse()?
        };
        Ok(Quantity::new(value, unit))
    }
}

impl TryFrom<String> for Quantity {
    type Error = UnitError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
