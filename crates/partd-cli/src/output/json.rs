use partd_core::ExtractError;
use serde::Serialize;

pub fn print<T: Serialize + ?Sized>(value: &T) -> Result<(), ExtractError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
