//! Error types for the binding layer
//!
//! Two kinds of failure reach a Lua caller. Argument errors (wrong type,
//! out-of-range integer) are raised as Lua errors. Everything the C side would
//! report through `errno` is returned as the `(nil, errno, strerror)` triple
//! instead, see [`SysRet`].

use mlua::{IntoLuaMulti, Lua, MultiValue, Value};
use nix::errno::Errno;
use std::sync::Arc;
use thiserror::Error;

/// Binding layer error type
#[derive(Debug, Error)]
pub enum LuabError {
    /// A call failed with an `errno` value
    #[error("{}", .0.desc())]
    Sys(#[from] Errno),

    /// Error raised by the Lua runtime
    #[error("Lua error: {0}")]
    Lua(#[from] mlua::Error),

    /// IO error while loading scripts or configuration
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Specialized Result type for binding operations
pub type LuabResult<T> = Result<T, LuabError>;

impl LuabError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// The `errno` carried by this error, if any
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Self::Sys(e) => Some(*e),
            Self::Io(e) => e.raw_os_error().map(Errno::from_raw),
            _ => None,
        }
    }
}

impl From<LuabError> for mlua::Error {
    fn from(err: LuabError) -> Self {
        match err {
            LuabError::Lua(e) => e,
            other => mlua::Error::external(other),
        }
    }
}

/// Return value of a bound C function following the errno convention.
///
/// `Ok(v)` pushes `v`, `Err(e)` pushes `nil, e, strerror(e)`.
#[derive(Debug)]
pub struct SysRet<T>(pub Result<T, Errno>);

impl<T> SysRet<T> {
    pub fn ok(value: T) -> Self {
        Self(Ok(value))
    }

    pub fn err(errno: Errno) -> Self {
        Self(Err(errno))
    }
}

impl<T> From<Result<T, Errno>> for SysRet<T> {
    fn from(res: Result<T, Errno>) -> Self {
        Self(res)
    }
}

impl<T: IntoLuaMulti> IntoLuaMulti for SysRet<T> {
    fn into_lua_multi(self, lua: &Lua) -> mlua::Result<MultiValue> {
        match self.0 {
            Ok(value) => value.into_lua_multi(lua),
            Err(errno) => (
                Value::Nil,
                errno as i32,
                lua.create_string(errno.desc())?,
            )
                .into_lua_multi(lua),
        }
    }
}

/// Split a [`LuabResult`] into the errno convention.
///
/// `Sys` errors become the failure triple, anything else is raised.
pub fn sysret<T>(res: LuabResult<T>) -> mlua::Result<SysRet<T>> {
    match res {
        Ok(value) => Ok(SysRet::ok(value)),
        Err(LuabError::Sys(errno)) => {
            tracing::trace!("call failed: {}", errno.desc());
            Ok(SysRet::err(errno))
        }
        Err(e) => Err(e.into()),
    }
}

/// Build the argument error Lua raises for a bad parameter.
pub fn arg_error(fname: &str, narg: usize, msg: impl Into<String>) -> mlua::Error {
    mlua::Error::BadArgument {
        to: Some(fname.to_string()),
        pos: narg,
        name: None,
        cause: Arc::new(mlua::Error::runtime(msg.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sys_error_display_is_strerror() {
        let err = LuabError::from(Errno::ENOENT);
        assert_eq!(err.to_string(), Errno::ENOENT.desc());
        assert_eq!(err.errno(), Some(Errno::ENOENT));
    }

    #[test]
    fn test_sysret_failure_triple() {
        let lua = Lua::new();
        let values = SysRet::<i32>::err(Errno::ERANGE)
            .into_lua_multi(&lua)
            .unwrap();
        let values: Vec<Value> = values.into_iter().collect();
        assert_eq!(values.len(), 3);
        assert!(values[0].is_nil());
        assert_eq!(values[1].as_i64(), Some(Errno::ERANGE as i64));
        assert_eq!(
            values[2].as_string().unwrap().to_string_lossy(),
            Errno::ERANGE.desc()
        );
    }

    #[test]
    fn test_sysret_success_passes_value() {
        let lua = Lua::new();
        let values = SysRet::ok(42).into_lua_multi(&lua).unwrap();
        let values: Vec<Value> = values.into_iter().collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].as_i64(), Some(42));
    }

    #[test]
    fn test_sysret_raises_non_sys_errors() {
        let res: LuabResult<()> = Err(LuabError::config("bad"));
        assert!(sysret(res).is_err());
    }
}
