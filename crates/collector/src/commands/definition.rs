//! `definition`: print the object-type definition

use anyhow::Result;
use prp_lib::adapter_definition;

pub fn run() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&adapter_definition())?);
    Ok(())
}
