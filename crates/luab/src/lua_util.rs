//! Small helpers shared by the registration code

use mlua::{Lua, Table, Value};

/// Get or create the table at a dotted `path` below `root`.
///
/// `nested_table(lua, &bsd, "sys.stat")` yields `bsd.sys.stat`, creating
/// `bsd.sys` on the way if needed.
pub fn nested_table(lua: &Lua, root: &Table, path: &str) -> mlua::Result<Table> {
    let mut current = root.clone();
    for part in path.split('.').filter(|p| !p.is_empty()) {
        current = match current.raw_get::<Value>(part)? {
            Value::Table(t) => t,
            Value::Nil => {
                let t = lua.create_table()?;
                current.raw_set(part, t.clone())?;
                t
            }
            other => {
                return Err(mlua::Error::runtime(format!(
                    "cannot create namespace '{path}': '{part}' is a {}",
                    other.type_name()
                )))
            }
        };
    }
    Ok(current)
}

/// Set integer constants on a module table.
pub fn set_constants(table: &Table, constants: &[(&str, i64)]) -> mlua::Result<()> {
    for (name, value) in constants {
        table.raw_set(*name, *value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_table_creates_and_reuses() {
        let lua = Lua::new();
        let root = lua.create_table().unwrap();
        let stat = nested_table(&lua, &root, "sys.stat").unwrap();
        stat.set("marker", 1).unwrap();
        let again = nested_table(&lua, &root, "sys.stat").unwrap();
        assert_eq!(again.get::<i64>("marker").unwrap(), 1);
        assert!(nested_table(&lua, &root, "sys").unwrap().contains_key("stat").unwrap());
    }

    #[test]
    fn test_nested_table_rejects_non_table() {
        let lua = Lua::new();
        let root = lua.create_table().unwrap();
        root.set("sys", 3).unwrap();
        assert!(nested_table(&lua, &root, "sys.stat").is_err());
    }
}
