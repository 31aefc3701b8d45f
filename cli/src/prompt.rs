//! Stdin confirmations and review edits.

use std::io::{self, BufRead, Write};

use delfin::{NewOrder, OrderRecord, ReplaceDecision};
use tracing::warn;

/// Asks a yes/no question on stderr and reads the answer from stdin.
/// Anything but an explicit yes counts as no.
pub fn confirm(question: &str) -> io::Result<bool> {
    let mut stderr = io::stderr().lock();
    write!(stderr, "{question} [s/N] ")?;
    stderr.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_affirmative(&answer))
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "s" | "si" | "sí" | "y" | "yes"
    )
}

/// Parses a `campo=valor` review edit.
pub fn parse_edit(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => {
            Ok((field.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("se esperaba CAMPO=VALOR, no '{raw}'")),
    }
}

/// Applies review edits to a candidate; unknown field names are an error.
pub fn apply_edits(candidate: &mut NewOrder, edits: &[(String, String)]) -> Result<(), String> {
    for (field, value) in edits {
        if !candidate.set_field(field, value) {
            return Err(format!("campo desconocido: {field}"));
        }
    }
    Ok(())
}

pub fn duplicate_message(existing: &OrderRecord, candidate: &NewOrder) -> String {
    format!(
        "⚠️ PEDIDO DUPLICADO\n\n\
         Ya existe un pedido con el número \"{}\".\n\n\
         Cliente: {}\n\
         Fecha: {}\n\n\
         ¿Deseas REEMPLAZAR el pedido anterior con este nuevo?",
        candidate.order_number, existing.order.client_name, existing.order.date
    )
}

/// Duplicate-order decision taken from a command-line flag or, failing
/// that, asked interactively.
pub struct ConsoleDecision {
    preset: Option<bool>,
}

impl ConsoleDecision {
    pub fn new(preset: Option<bool>) -> Self {
        Self { preset }
    }
}

impl ReplaceDecision for ConsoleDecision {
    fn confirm_replace(&self, existing: &OrderRecord, candidate: &NewOrder) -> bool {
        if let Some(answer) = self.preset {
            return answer;
        }
        match confirm(&duplicate_message(existing, candidate)) {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "could not read answer, keeping existing order");
                false
            }
        }
    }
}
