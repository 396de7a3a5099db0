//! Renders a program as a JSON instruction listing.

use serde_json::{json, Value};
use stackvm_container::{ContainerError, DecodedInstruction, Program};

/// Decodes every instruction of `program` into a JSON document.
pub fn listing(program: &Program) -> Result<Value, ContainerError> {
    let instructions = program
        .decode()
        .map(|decoded| decoded.map(|inst| instruction_json(&inst)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(json!({
        "size": program.len(),
        "instructions": instructions,
    }))
}

fn instruction_json(inst: &DecodedInstruction<'_>) -> Value {
    let operands: Vec<u64> = inst.operands.iter().map(|o| o.value()).collect();
    let code = inst.opcode as u8;
    let mut value = json!({
        "offset": inst.offset,
        "opcode": inst.opcode.name(),
        "code": code,
        "operands": operands,
    });
    if inst.opcode.has_payload() {
        value["text"] = json!(String::from_utf8_lossy(inst.payload));
    }
    value
}
