// Printf-style cell format tokens (`%-8.3f`) and their rendering rules.
use std::fmt::Write as _;

use crate::core::error::{Error, ErrorKind};
use crate::core::value::{Kind, Value};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Conversion {
    Decimal,
    Hex,
    Fixed,
    Exponent,
    General,
    Text,
    Char,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CellFormat {
    pub left: bool,
    pub zero_pad: bool,
    pub width: Option<usize>,
    pub precision: Option<usize>,
    pub conversion: Conversion,
}

impl CellFormat {
    pub fn parse(token: &str) -> Result<Self, Error> {
        let invalid = |reason: &str| {
            Error::new(ErrorKind::Invalid)
                .with_message(format!("invalid format '{token}': {reason}"))
                .with_hint("Use a printf-style token such as %d, %.4f, %s, or %c.")
        };
        if token.contains(':') || token.contains('\n') || token.contains('\r') {
            return Err(invalid("separators are not allowed"));
        }
        let Some(spec) = token.strip_prefix('%') else {
            return Err(invalid("missing leading '%'"));
        };
        let bytes = spec.as_bytes();
        let mut pos = 0;
        let mut left = false;
        let mut zero_pad = false;
        while pos < bytes.len() {
            match bytes[pos] {
                b'-' => left = true,
                b'0' => zero_pad = true,
                _ => break,
            }
            pos += 1;
        }
        let width = take_number(bytes, &mut pos);
        let precision = if bytes.get(pos) == Some(&b'.') {
            pos += 1;
            Some(take_number(bytes, &mut pos).unwrap_or(0))
        } else {
            None
        };
        let conversion = match bytes.get(pos) {
            Some(b'd') => Conversion::Decimal,
            Some(b'x') => Conversion::Hex,
            Some(b'f') => Conversion::Fixed,
            Some(b'e') => Conversion::Exponent,
            Some(b'g') => Conversion::General,
            Some(b's') => Conversion::Text,
            Some(b'c') => Conversion::Char,
            Some(_) => return Err(invalid("unsupported conversion")),
            None => return Err(invalid("missing conversion")),
        };
        if pos + 1 != bytes.len() {
            return Err(invalid("trailing characters after conversion"));
        }
        Ok(Self {
            left,
            zero_pad,
            width,
            precision,
            conversion,
        })
    }

    pub fn kind(&self) -> Kind {
        match self.conversion {
            Conversion::Decimal | Conversion::Hex => Kind::Integer,
            Conversion::Fixed | Conversion::Exponent | Conversion::General => Kind::Decimal,
            Conversion::Char => Kind::Byte,
            Conversion::Text => Kind::String,
        }
    }

    /// Reads rendered text back into this format's kind. Hex cells parse base 16.
    pub fn parse_value(&self, text: &str) -> Result<Value, Error> {
        match self.conversion {
            Conversion::Hex => i64::from_str_radix(text.trim(), 16)
                .map(Value::Integer)
                .map_err(|err| {
                    Error::new(ErrorKind::Invalid)
                        .with_message(format!("'{text}' is not a hex Integer"))
                        .with_source(err)
                }),
            _ => self.kind().parse(text),
        }
    }

    /// Renders `value`; a value that does not suit the conversion prints as-is.
    pub fn render(&self, value: &Value) -> String {
        let body = match (self.conversion, value) {
            (Conversion::Decimal, Value::Integer(v)) => v.to_string(),
            (Conversion::Hex, Value::Integer(v)) if *v < 0 => format!("-{:x}", v.unsigned_abs()),
            (Conversion::Hex, Value::Integer(v)) => format!("{v:x}"),
            (Conversion::Fixed, Value::Decimal(_) | Value::Integer(_)) => {
                let v = value.as_f64().unwrap_or_default();
                match self.precision {
                    Some(precision) => format!("{v:.precision$}"),
                    None => Value::Decimal(v).to_string(),
                }
            }
            (Conversion::Exponent, Value::Decimal(_) | Value::Integer(_)) => {
                let v = value.as_f64().unwrap_or_default();
                match self.precision {
                    Some(precision) => format!("{v:.precision$e}"),
                    None => format!("{v:e}"),
                }
            }
            (Conversion::General, Value::Decimal(_) | Value::Integer(_)) => {
                let v = value.as_f64().unwrap_or_default();
                match self.precision {
                    Some(precision) if v.is_finite() => general(v, precision),
                    _ => Value::Decimal(v).to_string(),
                }
            }
            (Conversion::Text, Value::String(text)) => match self.precision {
                Some(precision) => text.chars().take(precision).collect(),
                None => text.clone(),
            },
            _ => value.to_string(),
        };
        self.pad(body)
    }

    fn pad(&self, body: String) -> String {
        let Some(width) = self.width else {
            return body;
        };
        let len = body.chars().count();
        if len >= width {
            return body;
        }
        let fill = width - len;
        let mut out = String::with_capacity(body.len() + fill);
        if self.left {
            out.push_str(&body);
            out.extend(std::iter::repeat_n(' ', fill));
        } else if self.zero_pad && body.starts_with('-') {
            out.push('-');
            out.extend(std::iter::repeat_n('0', fill));
            out.push_str(&body[1..]);
        } else {
            let pad = if self.zero_pad { '0' } else { ' ' };
            out.extend(std::iter::repeat_n(pad, fill));
            out.push_str(&body);
        }
        out
    }
}

impl std::fmt::Display for CellFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = String::from("%");
        if self.left {
            out.push('-');
        }
        if self.zero_pad {
            out.push('0');
        }
        if let Some(width) = self.width {
            let _ = write!(out, "{width}");
        }
        if let Some(precision) = self.precision {
            let _ = write!(out, ".{precision}");
        }
        out.push(match self.conversion {
            Conversion::Decimal => 'd',
            Conversion::Hex => 'x',
            Conversion::Fixed => 'f',
            Conversion::Exponent => 'e',
            Conversion::General => 'g',
            Conversion::Text => 's',
            Conversion::Char => 'c',
        });
        f.write_str(&out)
    }
}

// `%.Pg`: P significant digits, exponent form outside 1e-4..1e(P), trailing zeros dropped.
fn general(v: f64, precision: usize) -> String {
    let digits = precision.max(1);
    let sci = format!("{v:.prec$e}", prec = digits - 1);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or_default();
    if exp < -4 || exp >= digits as i32 {
        return format!("{}e{exp}", strip_zeros(mantissa));
    }
    let decimals = (digits as i32 - 1 - exp).max(0) as usize;
    strip_zeros(&format!("{v:.decimals$}")).to_string()
}

fn strip_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

fn take_number(bytes: &[u8], pos: &mut usize) -> Option<usize> {
    let start = *pos;
    while *pos < bytes.len() && bytes[*pos].is_ascii_digit() {
        *pos += 1;
    }
    if *pos == start {
        return None;
    }
    std::str::from_utf8(&bytes[start..*pos])
        .ok()
        .and_then(|digits| digits.parse().ok())
}
