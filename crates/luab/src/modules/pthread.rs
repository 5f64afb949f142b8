//! `<pthread.h>` read/write locks, exported as `bsd.pthread`
//!
//! Failures carry the code the pthread function returned.

use super::sys_function;
use crate::composite::{PthreadRwlock, RwlockHandle};
use crate::core::Module;
use mlua::{Lua, Table, Value};
use nix::errno::Errno;

type LockOp = fn(&RwlockHandle) -> Result<(), Errno>;

const OPS: &[(&str, LockOp)] = &[
    ("pthread_rwlock_init", RwlockHandle::init),
    ("pthread_rwlock_destroy", RwlockHandle::destroy),
    ("pthread_rwlock_rdlock", RwlockHandle::rdlock),
    ("pthread_rwlock_tryrdlock", RwlockHandle::tryrdlock),
    ("pthread_rwlock_wrlock", RwlockHandle::wrlock),
    ("pthread_rwlock_trywrlock", RwlockHandle::trywrlock),
    ("pthread_rwlock_unlock", RwlockHandle::unlock),
];

/// Register `pthread` rwlock functions
pub fn register_pthread_module(lua: &Lua) -> mlua::Result<Table> {
    let pthread = lua.create_table()?;

    // pthread.<op>(rwlock) -> 0
    for &(name, op) in OPS {
        pthread.set(
            name,
            sys_function(lua, move |_, lock: Value| {
                let lock = PthreadRwlock::get(&lock, name, 1)?;
                op(&lock)?;
                Ok(0)
            })?,
        )?;
    }

    Ok(pthread)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::install_constructor;

    #[test]
    fn test_rwlock_from_lua() {
        let lua = Lua::new();
        lua.globals()
            .set("pthread", register_pthread_module(&lua).unwrap())
            .unwrap();
        let ns = lua.create_table().unwrap();
        install_constructor::<PthreadRwlock>(&lua, &ns, "create_pthread_rwlock").unwrap();
        lua.globals().set("c", ns).unwrap();

        let (busy, init): (i32, bool) = lua
            .load(
                r#"
                local rw = c.create_pthread_rwlock()
                assert(pthread.pthread_rwlock_init(rw) == 0)
                assert(pthread.pthread_rwlock_wrlock(rw) == 0)
                local _, e = pthread.pthread_rwlock_tryrdlock(rw)
                assert(pthread.pthread_rwlock_unlock(rw) == 0)
                return e, rw:get_table().initialized
                "#,
            )
            .eval()
            .unwrap();
        assert_eq!(busy, libc::EBUSY);
        assert!(init);
    }

    #[test]
    fn test_wrong_type_raises() {
        let lua = Lua::new();
        lua.globals()
            .set("pthread", register_pthread_module(&lua).unwrap())
            .unwrap();
        assert!(lua.load("pthread.pthread_rwlock_init(1)").exec().is_err());
    }
}
