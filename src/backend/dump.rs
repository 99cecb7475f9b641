//! Structured diagnostic back-end, grounded on `bmfparse.c`'s `print_classes`/`print_qualifiers`/
//! `print_variable`/`print_parameters` family.
//!
//! This is pure formatting over an already-built [`ClassModel`]; it performs no further
//! validation and cannot fail except on an I/O error from the sink.

use std::io::{self, Write};

use crate::model::{Class, Direction, Method, Qualifier, QualifierValue, Variable, VariableKind, VariableType};
use crate::model::{BasicType, ClassModel};

pub fn write_dump<W: Write>(model: &ClassModel, out: &mut W) -> io::Result<()> {
    for (i, class) in model.classes.iter().enumerate() {
        writeln!(out, "Class {i}:")?;
        writeln!(out, "  Name={}", class.name.as_deref().unwrap_or("(null)"))?;
        writeln!(out, "  Superclassname={}", class.superclassname.as_deref().unwrap_or("(null)"))?;
        writeln!(out, "  Classflags={}", class.classflags)?;
        writeln!(out, "  Namespace={}", class.namespace.as_deref().unwrap_or("(null)"))?;
        write_qualifiers(&class.qualifiers, 2, out)?;
        write_variables(&class.variables, out)?;
        for (j, method) in class.methods.iter().enumerate() {
            write_method(j, method, out)?;
        }
    }
    Ok(())
}

fn write_qualifiers<W: Write>(qualifiers: &[Qualifier], indent: usize, out: &mut W) -> io::Result<()> {
    let pad = " ".repeat(indent);
    for (i, q) in qualifiers.iter().enumerate() {
        writeln!(out, "{pad}Qualifier {i}:")?;
        writeln!(out, "{pad}  Name={}", q.name)?;
        writeln!(out, "{pad}  Tosubclass={}", if q.flavor.tosubclass { "TRUE" } else { "FALSE" })?;
        match &q.value {
            QualifierValue::Boolean(b) => {
                writeln!(out, "{pad}  Type=Boolean")?;
                writeln!(out, "{pad}  Value={}", if *b { "TRUE" } else { "FALSE" })?;
            }
            QualifierValue::Sint32(v) => {
                writeln!(out, "{pad}  Type=Numeric")?;
                writeln!(out, "{pad}  Value={v}")?;
            }
            QualifierValue::String(s) => {
                writeln!(out, "{pad}  Type=String")?;
                writeln!(out, "{pad}  Value={s}")?;
            }
            QualifierValue::Unknown { .. } => {
                writeln!(out, "{pad}  Type=Unknown")?;
            }
        }
    }
    Ok(())
}

fn variable_type_string(variable: &Variable) -> String {
    let (kind_label, type_label) = match (variable.kind, &variable.var_type) {
        (VariableKind::Basic | VariableKind::BasicArray, VariableType::Basic(basic)) => {
            ("Basic", Some(basic_display_name(*basic)))
        }
        (VariableKind::Object | VariableKind::ObjectArray, VariableType::Object(name)) => {
            ("Object", Some(name.clone()))
        }
        _ => ("unknown", None),
    };
    let mut out = kind_label.to_string();
    if let Some(type_label) = type_label {
        out.push(':');
        out.push_str(&type_label);
    }
    if variable.kind.is_array() {
        out.push('[');
        out.push_str(&variable.array_max.to_string());
        out.push(']');
    }
    out
}

/// Display spelling used by the structured dump, which differs slightly from `BasicType::mof_name`
/// (`String`/`Datetime`/`Boolean` are capitalized here, matching `bmfparse.c`'s `print_variable_type`).
fn basic_display_name(basic: BasicType) -> String {
    match basic {
        BasicType::String => "String".to_string(),
        BasicType::Datetime => "Datetime".to_string(),
        BasicType::Boolean => "Boolean".to_string(),
        other => other.mof_name().to_string(),
    }
}

fn write_variable<W: Write>(variable: &Variable, indent: usize, out: &mut W) -> io::Result<()> {
    let pad = " ".repeat(indent);
    writeln!(out, "{pad}Name={}", variable.name)?;
    writeln!(out, "{pad}Type={}", variable_type_string(variable))?;
    write_qualifiers(&variable.qualifiers, indent + 2, out)
}

fn write_variables<W: Write>(variables: &[Variable], out: &mut W) -> io::Result<()> {
    for (i, variable) in variables.iter().enumerate() {
        writeln!(out, "  Variable {i}:")?;
        write_variable(variable, 4, out)?;
    }
    Ok(())
}

fn direction_label(direction: Direction) -> &'static str {
    match direction {
        Direction::In => "in",
        Direction::Out => "out",
        Direction::InOut => "in+out",
    }
}

fn write_parameters<W: Write>(method: &Method, out: &mut W) -> io::Result<()> {
    for (i, (parameter, direction)) in method.parameters.iter().zip(&method.parameters_direction).enumerate() {
        writeln!(out, "    Parameter {i}:")?;
        writeln!(out, "      Direction={}", direction_label(*direction))?;
        write_variable(parameter, 6, out)?;
    }
    Ok(())
}

fn write_method<W: Write>(index: usize, method: &Method, out: &mut W) -> io::Result<()> {
    writeln!(out, "  Method {index}:")?;
    writeln!(out, "    Name={}", method.name)?;
    write_qualifiers(&method.qualifiers, 4, out)?;
    write!(out, "    Return value:\n      Type=")?;
    match &method.return_value {
        Some(rv) => writeln!(out, "{}", variable_type_string(rv))?,
        None => writeln!(out, "Void")?,
    }
    write_parameters(method, out)
}
