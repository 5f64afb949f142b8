//! `<regex.h>`, exported as `bsd.regex`
//!
//! `regcomp`, `regexec` and `regerror` return the POSIX regex result code
//! (0 on success, `REG_*` otherwise) rather than the errno triple; only a
//! malformed `pmatch` table yields `ERANGE`.
//!
//! ```lua
//! local re = bsd.core.composite.create_regex()
//! bsd.regex.regcomp(re, "b(c+)d", bsd.regex.REG_EXTENDED)
//! local m = { create_regmatch(), create_regmatch() }
//! if bsd.regex.regexec(re, "abccd", 2, m, 0) == 0 then
//!     print(m[2]:get_rm_so(), m[2]:get_rm_eo())   -- 2  4
//! end
//! ```

use super::{libc_constants, path_cstring, sys_function};
use crate::composite::{Regex, Regmatch, RegmatchData};
use crate::core::{LuabTable, Module};
use crate::error::LuabResult;
use crate::lua_util::set_constants;
use mlua::{Lua, Table, Value};
use std::os::raw::c_int;

fn regexec(
    lua: &Lua,
    re: &Value,
    s: &mlua::String,
    nmatch: usize,
    pmatch: Option<Table>,
    eflags: c_int,
) -> LuabResult<c_int> {
    let re = Regex::get(re, "regexec", 1)?;
    let s = path_cstring(s)?;
    let mut matches = match &pmatch {
        Some(t) => Regmatch::check_table(t, Some(nmatch), "regexec", 4)?,
        None => LuabTable::<RegmatchData>::alloc(0),
    };
    let rc = re.exec(&s, matches.as_mut_slice(), eflags);
    if let (0, Some(t)) = (rc, pmatch) {
        Regmatch::push_table(lua, &matches, Some(t))?;
    }
    Ok(rc)
}

/// Register `regex` functions and constants
pub fn register_regex_module(lua: &Lua) -> mlua::Result<Table> {
    let regex = lua.create_table()?;

    // regex.regcomp(re, pattern, cflags) -> code
    regex.set(
        "regcomp",
        sys_function(
            lua,
            |_, (re, pattern, cflags): (Value, mlua::String, c_int)| {
                let re = Regex::get(&re, "regcomp", 1)?;
                let pattern = path_cstring(&pattern)?;
                Ok(re.compile(&pattern, cflags))
            },
        )?,
    )?;

    // regex.regexec(re, s, nmatch, pmatch, eflags) -> code
    regex.set(
        "regexec",
        sys_function(
            lua,
            |lua, (re, s, nmatch, pmatch, eflags): (Value, mlua::String, usize, Option<Table>, Option<c_int>)| {
                regexec(lua, &re, &s, nmatch, pmatch, eflags.unwrap_or(0))
            },
        )?,
    )?;

    // regex.regerror(code, re) -> message
    regex.set(
        "regerror",
        lua.create_function(|_, (code, re): (c_int, Value)| {
            let re = Regex::get(&re, "regerror", 2)?;
            Ok(re.error_message(code))
        })?,
    )?;

    // regex.regfree(re) -> 0
    regex.set(
        "regfree",
        lua.create_function(|_, re: Value| {
            Regex::get(&re, "regfree", 1)?.free();
            Ok(0)
        })?,
    )?;

    set_constants(
        &regex,
        libc_constants![
            REG_EXTENDED, REG_ICASE, REG_NOSUB, REG_NEWLINE, REG_NOTBOL, REG_NOTEOL,
            REG_NOMATCH, REG_BADPAT, REG_ECOLLATE, REG_ECTYPE, REG_EESCAPE, REG_ESUBREG,
            REG_EBRACK, REG_EPAREN, REG_EBRACE, REG_BADBR, REG_ERANGE, REG_ESPACE,
            REG_BADRPT,
        ],
    )?;

    Ok(regex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::install_constructor;

    fn create_lua() -> Lua {
        let lua = Lua::new();
        lua.globals().set("regex", register_regex_module(&lua).unwrap()).unwrap();
        let ns = lua.create_table().unwrap();
        install_constructor::<Regex>(&lua, &ns, "create_regex").unwrap();
        install_constructor::<Regmatch>(&lua, &ns, "create_regmatch").unwrap();
        lua.globals().set("c", ns).unwrap();
        lua
    }

    #[test]
    fn test_compile_exec_refills_pmatch() {
        let lua = create_lua();
        let (rc, nsub, so, eo): (i64, i64, i64, i64) = lua
            .load(
                r#"
                local re = c.create_regex()
                assert(regex.regcomp(re, "b(c+)d", regex.REG_EXTENDED) == 0)
                local m = { c.create_regmatch(), c.create_regmatch() }
                local rc = regex.regexec(re, "abccd", 2, m, 0)
                return rc, re:get_re_nsub(), m[2]:get_rm_so(), m[2]:get_rm_eo()
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!((rc, nsub, so, eo), (0, 1, 2, 4));
    }

    #[test]
    fn test_no_match_and_message() {
        let lua = create_lua();
        let (rc, msg, compiled): (i64, String, bool) = lua
            .load(
                r#"
                local re = c.create_regex()
                regex.regcomp(re, "^z", 0)
                local rc = regex.regexec(re, "abc", 0, nil, 0)
                local msg = regex.regerror(rc, re)
                regex.regfree(re)
                return rc, msg, re:get_compiled()
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!(rc, libc::REG_NOMATCH as i64);
        assert!(!msg.is_empty());
        assert!(!compiled);
    }

    #[test]
    fn test_pmatch_cardinality() {
        let lua = create_lua();
        let errno: i32 = lua
            .load(
                r#"
                local re = c.create_regex()
                regex.regcomp(re, "a", 0)
                local _, e = regex.regexec(re, "a", 3, { c.create_regmatch() }, 0)
                return e
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!(errno, libc::ERANGE);
    }
}
