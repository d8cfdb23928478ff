//! Line-oriented terminal render sink.
//!
//! Reads one command per line, turns it into an engine [`Event`], and
//! renders the controls that are relevant to the active mode. Labels
//! that don't parse are reported back with the list of valid ones;
//! the engine never sees them.

use std::fmt::Write as _;

use morpho_engine::{EngineState, Event, KernelShape, ParamId, Parity, Variant};

/// A parsed terminal command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Forward to the engine.
    Apply(Event),
    Show,
    Help,
    Quit,
    /// Blank line.
    Nothing,
}

/// Parse one input line for `variant`.
///
/// # Errors
///
/// Returns a message for the user when the command or one of its
/// arguments is not recognized.
pub fn parse_command(line: &str, variant: Variant) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(w, r)| (w, r.trim()));

    match word.to_ascii_lowercase().as_str() {
        "" => Ok(Command::Nothing),
        "show" => Ok(Command::Show),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        "mode" => parse_mode(rest, variant),
        "shape" => parse_shape(rest, variant),
        "set" => parse_set(rest, variant),
        other => Err(format!("unknown command '{other}'; type 'help' for a list")),
    }
}

fn parse_mode(label: &str, variant: Variant) -> Result<Command, String> {
    variant
        .mode_from_label(label)
        .map(|mode| Command::Apply(Event::SelectMode(mode)))
        .ok_or_else(|| format!("unknown mode '{label}'; valid modes: {}", mode_list(variant)))
}

fn parse_shape(label: &str, variant: Variant) -> Result<Command, String> {
    if !variant.has_shapes() {
        return Err(format!("{} has no kernel shape", variant.title()));
    }
    KernelShape::from_label(label)
        .map(|shape| Command::Apply(Event::SelectShape(shape)))
        .ok_or_else(|| {
            let valid: Vec<&str> = KernelShape::ALL.iter().map(|s| s.label()).collect();
            format!("unknown shape '{label}'; valid shapes: {}", valid.join(", "))
        })
}

fn parse_set(args: &str, variant: Variant) -> Result<Command, String> {
    let usage = || "usage: set <parameter> <value>".to_owned();
    let (name, value) = args.rsplit_once(char::is_whitespace).ok_or_else(usage)?;
    let id = ParamId::from_label(name.trim())
        .filter(|id| variant.parameters().contains(id))
        .ok_or_else(|| {
            let valid: Vec<&str> = variant.parameters().iter().map(|p| p.label()).collect();
            format!(
                "unknown parameter '{}'; valid parameters: {}",
                name.trim(),
                valid.join(", ")
            )
        })?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value.trim()))?;
    Ok(Command::Apply(Event::SetParameter { id, value }))
}

fn mode_list(variant: Variant) -> String {
    variant
        .modes()
        .iter()
        .map(|&mode| variant.label_of(mode))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The controls for the current state: the mode group, the shape group
/// when it applies, and one line per visible parameter.
pub fn render_controls(state: &EngineState) -> String {
    let variant = state.variant();
    let mut out = String::new();
    let image = state.image();
    let _ = writeln!(out, "{} ({}x{})", variant.title(), image.width(), image.height());

    let modes: Vec<String> = variant
        .modes()
        .iter()
        .map(|&mode| {
            let label = variant.label_of(mode);
            if mode == state.mode() {
                format!("[{label}]")
            } else {
                label
            }
        })
        .collect();
    let _ = writeln!(out, "  mode:  {}", modes.join("  "));

    if state.shape_visible() {
        let shapes: Vec<String> = KernelShape::ALL
            .iter()
            .map(|&shape| {
                if shape == state.shape() {
                    format!("[{shape}]")
                } else {
                    shape.label().to_owned()
                }
            })
            .collect();
        let _ = writeln!(out, "  shape: {}", shapes.join("  "));
    }

    for (spec, value) in state.visible_controls() {
        let parity = match spec.parity {
            Parity::OddOnly => ", odd",
            Parity::None => "",
        };
        let _ = writeln!(
            out,
            "  {:<12} {value:>4}   [{}..{}, step {}{parity}]",
            spec.id.label(),
            spec.min,
            spec.max,
            spec.step
        );
    }
    out
}

/// Command reference for `variant`.
pub fn help_text(variant: Variant) -> String {
    let mut out = String::from("commands:\n");
    let _ = writeln!(out, "  mode <label>          one of: {}", mode_list(variant));
    if variant.has_shapes() {
        let shapes: Vec<&str> = KernelShape::ALL.iter().map(|s| s.label()).collect();
        let _ = writeln!(out, "  shape <label>         one of: {}", shapes.join(", "));
    }
    let params: Vec<&str> = variant.parameters().iter().map(|p| p.label()).collect();
    let _ = writeln!(out, "  set <param> <value>   param one of: {}", params.join(", "));
    out.push_str("  show                  print the current controls\n");
    out.push_str("  help                  print this list\n");
    out.push_str("  quit                  exit\n");
    out
}
