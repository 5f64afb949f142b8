//! `<sys/stat.h>`, exported as `bsd.sys.stat`
//!
//! `stat`, `lstat` and `fstat` return a table of fields; the three time
//! stamps are `TIMESPEC*` userdata.

use super::{libc_constants, path_cstring, sys_function};
use crate::composite::{Timespec, TimespecData};
use crate::core::{Module, Scalar};
use crate::error::LuabResult;
use crate::lua_util::set_constants;
use mlua::{Lua, Table};
use nix::errno::Errno;
use std::mem::MaybeUninit;
use std::os::raw::{c_int, c_long};

fn chmod(path: &mlua::String, mode: libc::mode_t) -> LuabResult<c_int> {
    let path = path_cstring(path)?;
    // SAFETY: path is NUL terminated
    Ok(Errno::result(unsafe { libc::chmod(path.as_ptr(), mode) })?)
}

fn fchmodat(dirfd: c_int, path: &mlua::String, mode: libc::mode_t, flag: c_int) -> LuabResult<c_int> {
    let path = path_cstring(path)?;
    // SAFETY: path is NUL terminated
    Ok(Errno::result(unsafe { libc::fchmodat(dirfd, path.as_ptr(), mode, flag) })?)
}

fn mkdir(path: &mlua::String, mode: libc::mode_t) -> LuabResult<c_int> {
    let path = path_cstring(path)?;
    // SAFETY: path is NUL terminated
    Ok(Errno::result(unsafe { libc::mkdir(path.as_ptr(), mode) })?)
}

fn mkdirat(dirfd: c_int, path: &mlua::String, mode: libc::mode_t) -> LuabResult<c_int> {
    let path = path_cstring(path)?;
    // SAFETY: path is NUL terminated
    Ok(Errno::result(unsafe { libc::mkdirat(dirfd, path.as_ptr(), mode) })?)
}

fn mkfifo(path: &mlua::String, mode: libc::mode_t) -> LuabResult<c_int> {
    let path = path_cstring(path)?;
    // SAFETY: path is NUL terminated
    Ok(Errno::result(unsafe { libc::mkfifo(path.as_ptr(), mode) })?)
}

enum StatTarget<'a> {
    Path(&'a mlua::String),
    Link(&'a mlua::String),
    Fd(c_int),
}

fn stat(target: StatTarget<'_>) -> LuabResult<libc::stat> {
    let mut st = MaybeUninit::<libc::stat>::uninit();
    // SAFETY: st is written by a successful call before it is read
    let ret = match target {
        StatTarget::Path(p) => {
            let p = path_cstring(p)?;
            unsafe { libc::stat(p.as_ptr(), st.as_mut_ptr()) }
        }
        StatTarget::Link(p) => {
            let p = path_cstring(p)?;
            unsafe { libc::lstat(p.as_ptr(), st.as_mut_ptr()) }
        }
        StatTarget::Fd(fd) => unsafe { libc::fstat(fd, st.as_mut_ptr()) },
    };
    Errno::result(ret)?;
    // SAFETY: the call succeeded
    Ok(unsafe { st.assume_init() })
}

fn timespec(lua: &Lua, sec: libc::time_t, nsec: i64) -> mlua::Result<mlua::AnyUserData> {
    Timespec::create(
        lua,
        Some(TimespecData {
            tv_sec: sec,
            tv_nsec: nsec as c_long,
        }),
    )
}

/// Flatten a `struct stat` into a table.
pub fn stat_table(lua: &Lua, st: &libc::stat) -> mlua::Result<Table> {
    let t = lua.create_table()?;
    t.set("st_dev", st.st_dev.into_value())?;
    t.set("st_ino", st.st_ino.into_value())?;
    t.set("st_mode", st.st_mode.into_value())?;
    t.set("st_nlink", st.st_nlink.into_value())?;
    t.set("st_uid", st.st_uid.into_value())?;
    t.set("st_gid", st.st_gid.into_value())?;
    t.set("st_rdev", st.st_rdev.into_value())?;
    t.set("st_size", st.st_size.into_value())?;
    t.set("st_blksize", st.st_blksize.into_value())?;
    t.set("st_blocks", st.st_blocks.into_value())?;
    t.set("st_atim", timespec(lua, st.st_atime, st.st_atime_nsec as i64)?)?;
    t.set("st_mtim", timespec(lua, st.st_mtime, st.st_mtime_nsec as i64)?)?;
    t.set("st_ctim", timespec(lua, st.st_ctime, st.st_ctime_nsec as i64)?)?;
    #[cfg(target_os = "freebsd")]
    {
        t.set("st_flags", st.st_flags.into_value())?;
        t.set("st_gen", st.st_gen.into_value())?;
        t.set("st_birthtim", timespec(lua, st.st_birthtime, st.st_birthtime_nsec as i64)?)?;
    }
    Ok(t)
}

/// Register `sys/stat` functions and constants
pub fn register_stat_module(lua: &Lua) -> mlua::Result<Table> {
    let stat_module = lua.create_table()?;

    // stat.chmod(path, mode) -> 0
    stat_module.set(
        "chmod",
        sys_function(lua, |_, (path, mode): (mlua::String, libc::mode_t)| chmod(&path, mode))?,
    )?;

    // stat.fchmod(fd, mode) -> 0
    stat_module.set(
        "fchmod",
        sys_function(lua, |_, (fd, mode): (c_int, libc::mode_t)| {
            // SAFETY: plain integer arguments
            Ok(Errno::result(unsafe { libc::fchmod(fd, mode) })?)
        })?,
    )?;

    // stat.fchmodat(dirfd, path, mode[, flag]) -> 0
    stat_module.set(
        "fchmodat",
        sys_function(
            lua,
            |_, (dirfd, path, mode, flag): (c_int, mlua::String, libc::mode_t, Option<c_int>)| {
                fchmodat(dirfd, &path, mode, flag.unwrap_or(0))
            },
        )?,
    )?;

    // stat.mkdir(path, mode) -> 0
    stat_module.set(
        "mkdir",
        sys_function(lua, |_, (path, mode): (mlua::String, libc::mode_t)| mkdir(&path, mode))?,
    )?;

    // stat.mkdirat(dirfd, path, mode) -> 0
    stat_module.set(
        "mkdirat",
        sys_function(
            lua,
            |_, (dirfd, path, mode): (c_int, mlua::String, libc::mode_t)| {
                mkdirat(dirfd, &path, mode)
            },
        )?,
    )?;

    // stat.mkfifo(path, mode) -> 0
    stat_module.set(
        "mkfifo",
        sys_function(lua, |_, (path, mode): (mlua::String, libc::mode_t)| mkfifo(&path, mode))?,
    )?;

    // stat.umask(mask) -> previous mask
    stat_module.set(
        "umask",
        lua.create_function(|_, mask: libc::mode_t| {
            // SAFETY: umask cannot fail
            Ok(unsafe { libc::umask(mask) })
        })?,
    )?;

    // stat.stat(path) -> table
    stat_module.set(
        "stat",
        sys_function(lua, |lua, path: mlua::String| {
            Ok(stat_table(lua, &stat(StatTarget::Path(&path))?)?)
        })?,
    )?;

    // stat.lstat(path) -> table
    stat_module.set(
        "lstat",
        sys_function(lua, |lua, path: mlua::String| {
            Ok(stat_table(lua, &stat(StatTarget::Link(&path))?)?)
        })?,
    )?;

    // stat.fstat(fd) -> table
    stat_module.set(
        "fstat",
        sys_function(lua, |lua, fd: c_int| {
            Ok(stat_table(lua, &stat(StatTarget::Fd(fd))?)?)
        })?,
    )?;

    set_constants(
        &stat_module,
        libc_constants![
            S_IFMT, S_IFIFO, S_IFCHR, S_IFDIR, S_IFBLK, S_IFREG, S_IFLNK, S_IFSOCK,
            S_ISUID, S_ISGID, S_ISVTX, S_IRWXU, S_IRUSR, S_IWUSR, S_IXUSR,
            S_IRWXG, S_IRGRP, S_IWGRP, S_IXGRP, S_IRWXO, S_IROTH, S_IWOTH, S_IXOTH,
        ],
    )?;

    Ok(stat_module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlua::Value;
    use serial_test::serial;
    use tempfile::TempDir;

    fn create_lua() -> Lua {
        let lua = Lua::new();
        lua.globals()
            .set("stat", register_stat_module(&lua).unwrap())
            .unwrap();
        lua
    }

    #[test]
    fn test_chmod_nonexistent_is_enoent() {
        let lua = create_lua();
        let (v, errno, msg): (Value, i32, String) = lua
            .load(r#"return stat.chmod("/nonexistent", 420)"#)
            .eval()
            .unwrap();
        assert!(v.is_nil());
        assert_eq!(errno, libc::ENOENT);
        assert_eq!(msg, Errno::ENOENT.desc());
    }

    #[test]
    fn test_mkdir_chmod_stat() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("d");
        let lua = create_lua();
        lua.globals()
            .set("dir", dir.to_string_lossy().to_string())
            .unwrap();
        let (is_dir, perm, sec): (bool, i64, i64) = lua
            .load(
                r#"
                assert(stat.mkdir(dir, 448) == 0)
                assert(stat.chmod(dir, 493) == 0)
                local st = stat.stat(dir)
                return st.st_mode & stat.S_IFMT == stat.S_IFDIR,
                       st.st_mode & 511,
                       st.st_mtim:get_tv_sec()
                "#,
            )
            .eval()
            .unwrap();
        assert!(is_dir);
        assert_eq!(perm, 0o755);
        assert!(sec > 0);
    }

    #[test]
    fn test_fstat_and_lstat() {
        use std::io::Write;
        use std::os::unix::io::AsRawFd;

        let temp = TempDir::new().unwrap();
        let fifo = temp.path().join("fifo");
        let mut file = std::fs::File::create(temp.path().join("data")).unwrap();
        file.write_all(b"12345").unwrap();
        let lua = create_lua();
        lua.globals()
            .set("fifo", fifo.to_string_lossy().to_string())
            .unwrap();
        lua.globals().set("fd", file.as_raw_fd()).unwrap();
        let (is_fifo, size): (bool, i64) = lua
            .load(
                r#"
                assert(stat.mkfifo(fifo, 384) == 0)
                local st = stat.lstat(fifo)
                return st.st_mode & stat.S_IFMT == stat.S_IFIFO, stat.fstat(fd).st_size
                "#,
            )
            .eval()
            .unwrap();
        assert!(is_fifo);
        assert_eq!(size, 5);
    }

    #[test]
    #[serial]
    fn test_umask_returns_previous() {
        let lua = create_lua();
        let mid: i64 = lua
            .load("local old = stat.umask(63); local mid = stat.umask(old); return mid")
            .eval()
            .unwrap();
        assert_eq!(mid, 63);
    }
}
