//! Formats command - list the supported export formats

use fidocad_export::ExportFormat;

/// One line per format: name, file extension and description.
pub fn format_table() -> String {
    let mut out = String::new();
    for f in ExportFormat::ALL {
        out.push_str(&format!("{:<6} .{:<5} {}\n", f.name(), f.extension(), f.description()));
    }
    out
}

pub fn execute() {
    print!("{}", format_table());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_format_listed() {
        let table = format_table();
        assert_eq!(table.lines().count(), ExportFormat::ALL.len());
        assert!(table.contains("fcda   .fcd   FidoCadJ drawing, all macros expanded"));
        assert!(table.lines().any(|l| l.starts_with("scr") && l.contains("Eagle")));
    }
}
