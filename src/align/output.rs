//! Writers for the external artefacts: Moses-style links, the jump
//! statistics dump, and per-sentence scores.

use std::io::Write;

use crate::corpus::Sentence;
use crate::{Count, JUMP_ALPHA, JUMP_ARRAY_LEN, NULL_LINK};

use super::Alignment;

impl Alignment<'_> {
    /// Writes one line of space-separated `i-j` position pairs per sentence
    /// pair.  NULL links are omitted; skipped pairs produce an empty line.
    /// `reverse` flips each pair so the output is always in the original
    /// source-target order regardless of the alignment direction.
    pub fn write_moses(&self, w: &mut impl Write, reverse: bool) -> std::io::Result<()> {
        for sent in 0..self.offsets.len() {
            let Some(offset) = self.offsets[sent] else {
                writeln!(w)?;
                continue;
            };
            let target_length = self.target.sentence(sent).map_or(0, Sentence::len);
            let links = &self.links[offset..offset + target_length];
            let mut first = true;
            for (j, &link) in links.iter().enumerate() {
                if link == NULL_LINK {
                    continue;
                }
                let sep = if first { "" } else { " " };
                if reverse {
                    write!(w, "{sep}{j}-{link}")?;
                } else {
                    write!(w, "{sep}{link}-{j}")?;
                }
                first = false;
            }
            writeln!(w)?;
        }
        Ok(())
    }

    /// Dumps the jump histogram: the table length on the first line, then
    /// one rounded count per slot with the smoothing mass subtracted.
    pub fn write_jump_stats(&self, w: &mut impl Write) -> std::io::Result<()> {
        writeln!(w, "{JUMP_ARRAY_LEN}")?;
        for &c in self.jump_counts.iter() {
            writeln!(w, "{}", (c - JUMP_ALPHA).round() as i64)?;
        }
        Ok(())
    }
}

/// Writes one negated sentence score per line.  Scores accumulate log
/// probabilities, so aligned pairs come out non-negative.
pub fn write_scores(w: &mut impl Write, scores: &[Count]) -> std::io::Result<()> {
    for &s in scores {
        writeln!(w, "{}", -s)?;
    }
    Ok(())
}
