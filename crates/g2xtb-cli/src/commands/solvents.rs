use crate::error::Result;
use g2xtb::engine::options::{NO_SOLVENT, known_solvents};
use std::io::{self, Write};

pub fn run() -> Result<()> {
    let stdout = io::stdout();
    write_solvents(&mut stdout.lock())?;
    Ok(())
}

fn write_solvents(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{} (gas phase, default)", NO_SOLVENT)?;
    for name in known_solvents() {
        writeln!(out, "{}", name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_gas_phase_first_then_sorted_names() {
        let mut out = Vec::new();
        write_solvents(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "none (gas phase, default)");
        assert!(lines.contains(&"water"));
        assert!(lines.contains(&"n-hexane"));
        let mut sorted = lines[1..].to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, lines[1..]);
    }
}
