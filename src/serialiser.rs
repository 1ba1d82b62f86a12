use crate::cue::Cue;

use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

/// Writes `cues` as a SubRip file, numbering them from 1 in the given order.
pub fn export_srt<P: AsRef<Path>>(cues: &[Cue], output: P) -> Result<()> {
    let output = output.as_ref();
    let file = std::fs::File::create(output)
        .with_context(|| format!("Failed to create file: '{}'", output.display()))?;
    let mut writer = BufWriter::new(file);
    write_cues(&mut writer, cues).context("Failed to write to output file.")?;
    writer.flush().context("Failed to write to output file.")?;
    Ok(())
}

pub fn write_cues<W: Write>(buf: &mut W, cues: &[Cue]) -> Result<()> {
    for (index, cue) in cues.iter().enumerate() {
        write_cue(buf, index + 1, cue)?;
    }
    Ok(())
}

fn write_cue<W: Write>(buf: &mut W, seq: usize, cue: &Cue) -> Result<()> {
    writeln!(buf, "{}", seq)?;
    write_ts(buf, cue.start)?;
    write!(buf, " --> ")?;
    write_ts(buf, cue.end)?;
    writeln!(buf)?;
    // Blank lines would end the cue early when read back.
    for line in cue.text.lines().filter(|l| !l.trim().is_empty()) {
        writeln!(buf, "{}", line)?;
    }
    writeln!(buf)?;
    Ok(())
}

fn write_ts<W: Write>(buf: &mut W, millis: u64) -> Result<()> {
    let total_secs = millis / 1000;
    write!(
        buf,
        "{:02}:{:02}:{:02},{:03}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60,
        millis % 1000
    )?;
    Ok(())
}
