use anyhow::Result;
use serde::Serialize;

/// Pretty JSON of a scan result or usage map, as written to stdout or `--output`.
pub fn to_json_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", to_json_string(value)?);
    Ok(())
}
