//! Checked conversion of Lua arguments into C scalars
//!
//! Integer arguments are range-checked against the width and signedness of
//! the target C type. Integral floats and numeric strings are accepted the
//! way `luaL_checkinteger` accepts them; anything else raises an argument
//! error.

use crate::error::arg_error;
use mlua::Value;

/// A C scalar that can cross the Lua boundary.
pub trait Scalar: Copy + Default + PartialEq + std::fmt::Debug + 'static {
    /// Convert a Lua argument, raising an argument error when out of range.
    fn check(value: &Value, fname: &str, narg: usize) -> mlua::Result<Self>;

    fn into_value(self) -> Value;
}

macro_rules! impl_scalar_integer {
    ($($t:ty),+ $(,)?) => {
        $(
            impl Scalar for $t {
                fn check(value: &Value, fname: &str, narg: usize) -> mlua::Result<Self> {
                    check_xinteger::<$t>(value, fname, narg)
                }

                fn into_value(self) -> Value {
                    match i64::try_from(self) {
                        Ok(i) => Value::Integer(i),
                        Err(_) => Value::Number(self as f64),
                    }
                }
            }
        )+
    };
}

impl_scalar_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Scalar for f64 {
    fn check(value: &Value, fname: &str, narg: usize) -> mlua::Result<Self> {
        check_number(value, fname, narg)
    }

    fn into_value(self) -> Value {
        Value::Number(self)
    }
}

/// Parse a numeric argument as a wide integer, before any range check.
fn to_wide_integer(value: &Value, fname: &str, narg: usize) -> mlua::Result<i128> {
    match value {
        Value::Integer(i) => Ok(i128::from(*i)),
        Value::Number(n) if n.is_finite() && n.fract() == 0.0 => {
            // f64 -> i128 saturates, anything past 2^64 is out of range anyway
            Ok(*n as i128)
        }
        Value::Number(_) => Err(arg_error(fname, narg, "number has no integer representation")),
        Value::String(s) => {
            let s = s.to_str()?;
            let s = s.trim();
            s.parse::<i64>()
                .map(i128::from)
                .map_err(|_| arg_error(fname, narg, format!("number expected, got string '{s}'")))
        }
        other => Err(arg_error(
            fname,
            narg,
            format!("number expected, got {}", other.type_name()),
        )),
    }
}

/// Checked integer conversion bounded by the range of `T`.
pub fn check_xinteger<T>(value: &Value, fname: &str, narg: usize) -> mlua::Result<T>
where
    T: TryFrom<i128>,
{
    let wide = to_wide_integer(value, fname, narg)?;
    T::try_from(wide).map_err(|_| {
        arg_error(
            fname,
            narg,
            format!(
                "value {wide} out of range for {}",
                std::any::type_name::<T>()
            ),
        )
    })
}

/// `lua_Integer` without further narrowing.
pub fn check_integer(value: &Value, fname: &str, narg: usize) -> mlua::Result<i64> {
    check_xinteger::<i64>(value, fname, narg)
}

/// A Lua number (integer or float) as `f64`.
pub fn check_number(value: &Value, fname: &str, narg: usize) -> mlua::Result<f64> {
    match value {
        Value::Integer(i) => Ok(*i as f64),
        Value::Number(n) => Ok(*n),
        Value::String(s) => {
            let s = s.to_str()?;
            s.trim()
                .parse::<f64>()
                .map_err(|_| arg_error(fname, narg, "number expected, got string"))
        }
        other => Err(arg_error(
            fname,
            narg,
            format!("number expected, got {}", other.type_name()),
        )),
    }
}

/// A Lua string of at most `max_len` bytes, as raw bytes.
///
/// `Ok(None)` signals the string is longer than `max_len`; callers turn
/// that into `ERANGE`.
pub fn check_lstring(
    value: &Value,
    max_len: usize,
    fname: &str,
    narg: usize,
) -> mlua::Result<Option<Vec<u8>>> {
    match value {
        Value::String(s) => {
            let bytes = s.as_bytes();
            if bytes.len() > max_len {
                Ok(None)
            } else {
                Ok(Some(bytes.to_vec()))
            }
        }
        other => Err(arg_error(
            fname,
            narg,
            format!("string expected, got {}", other.type_name()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlua::Lua;

    #[test]
    fn test_integer_in_range() {
        assert_eq!(check_xinteger::<u32>(&Value::Integer(7), "f", 1).unwrap(), 7);
        assert_eq!(check_xinteger::<i8>(&Value::Integer(-128), "f", 1).unwrap(), -128);
    }

    #[test]
    fn test_integer_out_of_range() {
        assert!(check_xinteger::<u32>(&Value::Integer(-1), "f", 1).is_err());
        assert!(check_xinteger::<u32>(&Value::Integer(1 << 32), "f", 1).is_err());
        assert!(check_xinteger::<i16>(&Value::Integer(40_000), "f", 1).is_err());
    }

    #[test]
    fn test_integral_float_accepted() {
        assert_eq!(check_xinteger::<i32>(&Value::Number(3.0), "f", 1).unwrap(), 3);
        assert!(check_xinteger::<i32>(&Value::Number(3.5), "f", 1).is_err());
        assert!(check_xinteger::<i32>(&Value::Number(f64::NAN), "f", 1).is_err());
    }

    #[test]
    fn test_u64_beyond_lua_integer() {
        let big = 2f64.powi(63);
        assert_eq!(
            check_xinteger::<u64>(&Value::Number(big), "f", 1).unwrap(),
            1u64 << 63
        );
        assert_eq!((1u64 << 63).into_value(), Value::Number(big));
    }

    #[test]
    fn test_numeric_string_accepted() {
        let lua = Lua::new();
        let s = Value::String(lua.create_string(" 12 ").unwrap());
        assert_eq!(check_xinteger::<u16>(&s, "f", 1).unwrap(), 12);
        let bad = Value::String(lua.create_string("twelve").unwrap());
        assert!(check_xinteger::<u16>(&bad, "f", 1).is_err());
    }

    #[test]
    fn test_error_names_function_and_position() {
        let err = check_xinteger::<u8>(&Value::Integer(300), "set_value", 2).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("set_value"), "Got: {msg}");
        assert!(msg.contains("#2"), "Got: {msg}");
    }

    #[test]
    fn test_lstring_bounds() {
        let lua = Lua::new();
        let s = Value::String(lua.create_string("abcd").unwrap());
        assert_eq!(check_lstring(&s, 4, "f", 1).unwrap(), Some(b"abcd".to_vec()));
        assert_eq!(check_lstring(&s, 3, "f", 1).unwrap(), None);
        assert!(check_lstring(&Value::Integer(1), 3, "f", 1).is_err());
    }
}
