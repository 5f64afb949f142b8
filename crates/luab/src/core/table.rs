//! Table marshalling context
//!
//! [`LuabTable`] shuttles a packed vector between a Lua array table and the
//! C side. The per-module conversion lives on [`Module`](super::Module);
//! the helpers here cover plain Rust element types (strings, integers).

use mlua::{FromLua, IntoLua, Lua, Table};
use nix::errno::Errno;

/// A packed vector together with its cardinality.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LuabTable<T> {
    vec: Vec<T>,
    card: usize,
}

impl<T> LuabTable<T> {
    pub fn new(vec: Vec<T>) -> Self {
        let card = vec.len();
        Self { vec, card }
    }

    /// Zeroed vector of `card` elements.
    pub fn alloc(card: usize) -> Self
    where
        T: Default,
    {
        Self::new(std::iter::repeat_with(T::default).take(card).collect())
    }

    pub fn card(&self) -> usize {
        self.card
    }

    pub fn is_empty(&self) -> bool {
        self.card == 0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.vec.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.vec
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.vec
    }

    pub fn into_vec(self) -> Vec<T> {
        self.vec
    }
}

impl<T> From<Vec<T>> for LuabTable<T> {
    fn from(vec: Vec<T>) -> Self {
        Self::new(vec)
    }
}

/// Cardinality of an array table, checked against the expected one.
pub fn check_card(table: &Table, expected: Option<usize>) -> Result<usize, Errno> {
    let n = table.raw_len();
    match expected {
        Some(card) if card != n => Err(Errno::ERANGE),
        _ => Ok(n),
    }
}

/// Array table of plain values (numbers, strings) -> vector.
pub fn check_table_of<T: FromLua>(
    lua: &Lua,
    table: &Table,
    card: Option<usize>,
) -> crate::error::LuabResult<LuabTable<T>> {
    let n = check_card(table, card)?;
    let mut vec = Vec::with_capacity(n);
    for i in 1..=n {
        vec.push(T::from_lua(table.raw_get(i)?, lua)?);
    }
    Ok(LuabTable::new(vec))
}

/// Vector of plain values -> new array table.
pub fn push_table_of<T: IntoLua + Clone>(lua: &Lua, values: &[T]) -> mlua::Result<Table> {
    let table = lua.create_table_with_capacity(values.len(), 0)?;
    for (i, v) in values.iter().enumerate() {
        table.raw_set(i + 1, v.clone())?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomic::Gid;
    use crate::composite::Timespec;
    use crate::core::Module;
    use crate::error::LuabError;
    use mlua::Value;

    #[test]
    fn test_alloc_is_zeroed() {
        let tbl = Gid::alloc_table(3);
        assert_eq!(tbl.card(), 3);
        assert!(tbl.iter().all(|g| *g == 0));
    }

    #[test]
    fn test_check_card_mismatch_is_erange() {
        let lua = Lua::new();
        let t: Table = lua.load("return {1, 2, 3}").eval().unwrap();
        assert_eq!(check_card(&t, Some(3)), Ok(3));
        assert_eq!(check_card(&t, None), Ok(3));
        assert_eq!(check_card(&t, Some(2)), Err(Errno::ERANGE));
    }

    #[test]
    fn test_scalar_table_accepts_numbers() {
        let lua = Lua::new();
        let t: Table = lua.load("return {10, 20, 30}").eval().unwrap();
        let tbl = Gid::check_table(&t, Some(3), "f", 1).unwrap();
        assert_eq!(tbl.as_slice(), &[10, 20, 30]);
    }

    #[test]
    fn test_scalar_table_accepts_own_userdata() {
        let lua = Lua::new();
        let g = Gid::create(&lua, Some(5)).unwrap();
        let t = lua.create_table().unwrap();
        t.raw_set(1, g).unwrap();
        t.raw_set(2, 6).unwrap();
        let tbl = Gid::check_table(&t, None, "f", 1).unwrap();
        assert_eq!(tbl.as_slice(), &[5, 6]);
    }

    #[test]
    fn test_composite_table_rejects_numbers() {
        let lua = Lua::new();
        let t: Table = lua.load("return {1}").eval().unwrap();
        let err = Timespec::check_table(&t, None, "f", 1).unwrap_err();
        assert!(matches!(err, LuabError::Lua(_)));
    }

    #[test]
    fn test_cardinality_mismatch_is_sys_error() {
        let lua = Lua::new();
        let t: Table = lua.load("return {1, 2}").eval().unwrap();
        let err = Gid::check_table(&t, Some(4), "f", 1).unwrap_err();
        assert_eq!(err.errno(), Some(Errno::ERANGE));
    }

    #[test]
    fn test_push_table_creates_userdata_for_composites() {
        let lua = Lua::new();
        let tbl = Timespec::alloc_table(2);
        let t = Timespec::push_table(&lua, &tbl, None).unwrap();
        assert_eq!(t.raw_len(), 2);
        let first: Value = t.raw_get(1).unwrap();
        assert!(matches!(first, Value::UserData(ref ud) if ud.is::<Timespec>()));
    }

    #[test]
    fn test_push_table_refills_target() {
        let lua = Lua::new();
        let target: Table = lua.load("return {9, 9, 9, 9}").eval().unwrap();
        let tbl = LuabTable::new(vec![1u32, 2]);
        let t = Gid::push_table(&lua, &tbl, Some(target.clone())).unwrap();
        assert_eq!(t.raw_len(), 2);
        assert_eq!(target.raw_get::<u32>(2).unwrap(), 2);
        assert!(target.raw_get::<Value>(3).unwrap().is_nil());
    }

    #[test]
    fn test_composite_card_mismatch_and_surplus_refill() {
        let lua = Lua::new();
        let t: Table = lua.load("return {}").eval().unwrap();
        t.raw_set(1, Timespec::create(&lua, None).unwrap()).unwrap();
        let err = Timespec::check_table(&t, Some(2), "f", 1).unwrap_err();
        assert_eq!(err.errno(), Some(Errno::ERANGE));

        let target: Table = lua.load("return {1, 2, 3, tag = 'kept'}").eval().unwrap();
        let tbl = Timespec::check_table(&t, Some(1), "f", 1).unwrap();
        Timespec::push_table(&lua, &tbl, Some(target.clone())).unwrap();
        assert_eq!(target.raw_len(), 1);
        let first: Value = target.raw_get(1).unwrap();
        assert!(matches!(first, Value::UserData(ref ud) if ud.is::<Timespec>()));
        assert!(target.raw_get::<Value>(2).unwrap().is_nil());
        assert_eq!(target.raw_get::<String>("tag").unwrap(), "kept");
    }

    #[test]
    fn test_plain_table_helpers() {
        let lua = Lua::new();
        let t = push_table_of(&lua, &["a".to_string(), "b".to_string()]).unwrap();
        let back: LuabTable<String> = check_table_of(&lua, &t, Some(2)).unwrap();
        assert_eq!(back.into_vec(), vec!["a", "b"]);
    }
}
