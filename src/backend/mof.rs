//! MOF-source back-end, grounded on `bmf2mof.c`'s `print_qualifiers`/`print_variable`/
//! `print_classes`.
//!
//! Like [`crate::backend::dump`], this is pure formatting over an already-built [`ClassModel`];
//! it performs no further validation.

use std::io::{self, Write};

use crate::model::{Class, Direction, Method, Qualifier, QualifierValue, Variable, VariableKind, VariableType};
use crate::model::ClassModel;

const DEFAULT_NAMESPACE: &str = "root\\default";

pub fn write_mof<W: Write>(model: &ClassModel, out: &mut W) -> io::Result<()> {
    let mut active_namespace = DEFAULT_NAMESPACE.to_string();
    let mut classes = model.classes.iter().filter(|c| c.name.is_some()).peekable();
    while let Some(class) = classes.next() {
        if let Some(ns) = &class.namespace {
            if ns != &active_namespace {
                write!(out, "#pragma namespace(\"")?;
                write_escaped(ns, out)?;
                writeln!(out, "\")")?;
                active_namespace = ns.clone();
            }
        }
        if class.classflags != 0 {
            writeln!(out, "#pragma classflags({})", classflags_literal(class.classflags))?;
        }
        if !class.qualifiers.is_empty() {
            write_qualifiers(&class.qualifiers, None, out)?;
            writeln!(out)?;
        }
        write!(out, "class ")?;
        write_escaped(class.name.as_deref().unwrap_or(""), out)?;
        write!(out, " ")?;
        if let Some(super_name) = &class.superclassname {
            write!(out, ": ")?;
            write_escaped(super_name, out)?;
            write!(out, " ")?;
        }
        writeln!(out, "{{")?;
        for variable in &class.variables {
            write!(out, "  ")?;
            write_variable(variable, None, out)?;
            writeln!(out, ";")?;
        }
        if !class.variables.is_empty() && !class.methods.is_empty() {
            writeln!(out)?;
        }
        for method in &class.methods {
            write!(out, "  ")?;
            write_method(method, out)?;
        }
        writeln!(out, "}};")?;
        if classes.peek().is_some() {
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Known `classflags` bit combinations get a name, everything else is emitted as the raw
/// decimal integer.
fn classflags_literal(flags: i32) -> String {
    match flags {
        1 => "updateonly".to_string(),
        2 => "createonly".to_string(),
        32 => "safeupdate".to_string(),
        33 => "updateonly,safeupdate".to_string(),
        64 => "forceupdate".to_string(),
        65 => "updateonly,forceupdate".to_string(),
        other => other.to_string(),
    }
}

fn write_escaped<W: Write>(s: &str, out: &mut W) -> io::Result<()> {
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.write_all(&[b'\\'])?;
        }
        write!(out, "{c}")?;
    }
    Ok(())
}

fn flavor_names(qualifier: &Qualifier) -> Vec<&'static str> {
    let mut names = Vec::new();
    if qualifier.flavor.toinstance {
        names.push("ToInstance");
    }
    if qualifier.flavor.tosubclass {
        names.push("ToSubclass");
    }
    if qualifier.flavor.disableoverride {
        names.push("DisableOverride");
    }
    if qualifier.flavor.amended {
        names.push("Amended");
    }
    names
}

fn write_qualifier_entry<W: Write>(qualifier: &Qualifier, out: &mut W) -> io::Result<()> {
    match &qualifier.value {
        QualifierValue::Boolean(true) => write_escaped(&qualifier.name, out)?,
        QualifierValue::Boolean(false) => {
            write_escaped(&qualifier.name, out)?;
            write!(out, "(FALSE)")?;
        }
        QualifierValue::Sint32(v) => {
            write_escaped(&qualifier.name, out)?;
            write!(out, "({v})")?;
        }
        QualifierValue::String(s) => {
            write_escaped(&qualifier.name, out)?;
            write!(out, "(\"")?;
            write_escaped(s, out)?;
            write!(out, "\")")?;
        }
        QualifierValue::Unknown { raw, .. } => {
            write!(out, "/* unknown qualifier {}: ", qualifier.name)?;
            for b in raw {
                write!(out, "{b:02x}")?;
            }
            write!(out, " */")?;
        }
    }
    let flavors = flavor_names(qualifier);
    if !flavors.is_empty() {
        write!(out, " : {}", flavors.join(", "))?;
    }
    Ok(())
}

/// `prefix` is an extra leading entry (e.g. a parameter direction annotation) rendered before
/// the qualifier list proper, matching `bmf2mof.c`'s `print_qualifiers(..., prefix)`.
fn write_qualifiers<W: Write>(qualifiers: &[Qualifier], prefix: Option<&str>, out: &mut W) -> io::Result<()> {
    if qualifiers.is_empty() && prefix.is_none() {
        return Ok(());
    }
    write!(out, "[")?;
    if let Some(prefix) = prefix {
        write!(out, "{prefix}")?;
        if !qualifiers.is_empty() {
            write!(out, ", ")?;
        }
    }
    for (i, qualifier) in qualifiers.iter().enumerate() {
        write_qualifier_entry(qualifier, out)?;
        if i != qualifiers.len() - 1 {
            write!(out, ", ")?;
        }
    }
    write!(out, "]")?;
    Ok(())
}

fn variable_type_string(variable: &Variable) -> String {
    match (&variable.var_type, variable.kind) {
        (crate::model::VariableType::Basic(basic), _) => basic.mof_name().to_string(),
        (crate::model::VariableType::Object(name), _) => name.clone(),
        (crate::model::VariableType::Unknown, _) => "unknown".to_string(),
    }
}

fn write_variable<W: Write>(variable: &Variable, prefix: Option<&str>, out: &mut W) -> io::Result<()> {
    if !variable.qualifiers.is_empty() || prefix.is_some() {
        write_qualifiers(&variable.qualifiers, prefix, out)?;
        write!(out, " ")?;
    }
    write!(out, "{} ", variable_type_string(variable))?;
    write_escaped(&variable.name, out)?;
    if variable.kind.is_array() {
        write!(out, "[{}]", variable.array_max)?;
    }
    Ok(())
}

fn direction_prefix(direction: Direction) -> &'static str {
    match direction {
        Direction::In => "in",
        Direction::Out => "out",
        Direction::InOut => "in, out",
    }
}

fn write_method<W: Write>(method: &Method, out: &mut W) -> io::Result<()> {
    if !method.qualifiers.is_empty() {
        write_qualifiers(&method.qualifiers, None, out)?;
        write!(out, " ")?;
    }
    match &method.return_value {
        Some(rv) => write!(out, "{}", variable_type_string(rv))?,
        None => write!(out, "void")?,
    }
    write!(out, " ")?;
    write_escaped(&method.name, out)?;
    write!(out, "(")?;
    let count = method.parameters.len();
    for (i, (parameter, direction)) in method.parameters.iter().zip(&method.parameters_direction).enumerate() {
        write_variable(parameter, Some(direction_prefix(*direction)), out)?;
        if i != count - 1 {
            write!(out, ", ")?;
        }
    }
    writeln!(out, ");")
}
