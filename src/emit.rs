//! Renders the Go test routine for a validated table.

use std::fmt::{self, Write};

use crate::error::{Error, Result};
use crate::matcher::{Passing, Slot, SlotRole, TableDecl, Target};

/// Comment lines are wrapped to this many columns.
const WRAP_COLUMNS: usize = 80;

/// Names the generated routine binds itself.
const RESERVED: [&str; 3] = ["t", "tt", "i"];

/// Renders the routine placed after the table, starting with the blank line
/// that separates it. A blank line follows when more source comes after it.
pub fn render(table: &TableDecl, at_eof: bool) -> Result<String> {
    let mut out = String::new();
    write_routine(&mut out, table, at_eof).map_err(|e| Error::Render(e.to_string()))?;
    Ok(out)
}

fn write_routine(out: &mut String, table: &TableDecl, at_eof: bool) -> fmt::Result {
    let name = table.test_name();
    let what = match &table.target {
        Target::Function { name } => format!("function {name}"),
        Target::Method { type_name, name } => format!("method {type_name}.{name}"),
    };
    let doc = format!(
        "{name} is an automatically generated table driven test for the {what} using the tests defined in {}.",
        table.ident
    );

    out.push_str("\n\n");
    out.push_str(&wrap_comment(&doc, WRAP_COLUMNS));
    out.push('\n');
    writeln!(out, "func {name}(t *testing.T) {{")?;

    let results: Vec<&Slot> = table.slots_of(SlotRole::Result).collect();
    let index = if results.is_empty() { "_" } else { "i" };
    writeln!(out, "\tfor {index}, tt := range {} {{", table.ident)?;

    let call = call_expr(table);
    if results.is_empty() {
        writeln!(out, "\t\t{call}")?;
    } else {
        let locals: Vec<String> = results.iter().map(|s| local_name(&s.field)).collect();
        writeln!(out, "\t\t{} := {call}", locals.join(", "))?;
        for (slot, local) in results.iter().zip(&locals) {
            let expected = value_expr(slot, false);
            writeln!(out, "\t\tif {local} != {expected} {{")?;
            writeln!(
                out,
                "\t\t\tt.Errorf(\"%d : {} : got %v, expected %v\", i, {local}, {expected})",
                slot.field
            )?;
            writeln!(out, "\t\t}}")?;
        }
    }

    writeln!(out, "\t}}")?;
    writeln!(out, "}}")?;
    if !at_eof {
        out.push('\n');
    }
    Ok(())
}

fn call_expr(table: &TableDecl) -> String {
    let args: Vec<String> = table
        .slots_of(SlotRole::Param)
        .map(|s| value_expr(s, true))
        .collect();
    let args = args.join(", ");
    match &table.target {
        Target::Function { name } => format!("{name}({args})"),
        Target::Method { name, .. } => {
            let receiver = table
                .slots_of(SlotRole::Receiver)
                .next()
                .map(|s| value_expr(s, false))
                .unwrap_or_default();
            format!("{receiver}.{name}({args})")
        }
    }
}

/// Row access for a slot; `in_call` keeps the variadic spread.
fn value_expr(slot: &Slot, in_call: bool) -> String {
    let field = &slot.field;
    match slot.passing {
        Passing::Direct => format!("tt.{field}"),
        Passing::Spread if in_call => format!("tt.{field}..."),
        Passing::Spread => format!("tt.{field}"),
        Passing::Thunk { spread: true } if in_call => format!("tt.{field}()..."),
        Passing::Thunk { .. } => format!("tt.{field}()"),
    }
}

/// Local bound to a result; fields that would shadow the loop's own names
/// get a `got` prefix.
fn local_name(field: &str) -> String {
    if !RESERVED.contains(&field) {
        return field.to_owned();
    }
    let mut chars = field.chars();
    let capital: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("got{capital}")
}

/// Formats `text` as `//` comment lines no wider than `width`. A word longer
/// than a line gets a line of its own.
pub fn wrap_comment(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut line = String::from("//");
    let mut empty = true;
    for word in text.split_whitespace() {
        if !empty && line.len() + 1 + word.len() > width {
            out.push_str(&line);
            out.push('\n');
            line = String::from("//");
        }
        line.push(' ');
        line.push_str(word);
        empty = false;
    }
    out.push_str(&line);
    out
}
