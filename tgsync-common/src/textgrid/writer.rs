//! Praat text-format writer (long layout)

use std::fmt::Write as _;

use super::{encode_utf16, TextGrid, Tier};

/// Render a TextGrid in the Praat long text format
pub fn to_praat_text(textgrid: &TextGrid) -> String {
    let mut out = String::new();
    out.push_str("File type = \"ooTextFile\"\n");
    out.push_str("Object class = \"TextGrid\"\n\n");
    let _ = writeln!(out, "xmin = {} ", real(textgrid.xmin()));
    let _ = writeln!(out, "xmax = {} ", real(textgrid.xmax()));
    if textgrid.tiers().is_empty() {
        out.push_str("tiers? <absent> \n");
        return out;
    }
    out.push_str("tiers? <exists> \n");
    let _ = writeln!(out, "size = {} ", textgrid.number_of_tiers());
    out.push_str("item []: \n");

    for (i, tier) in textgrid.tiers().iter().enumerate() {
        let _ = writeln!(out, "    item [{}]:", i + 1);
        let _ = writeln!(out, "        class = {} ", quote(tier.kind().praat_class()));
        let _ = writeln!(out, "        name = {} ", quote(tier.name()));
        let _ = writeln!(out, "        xmin = {} ", real(tier.xmin()));
        let _ = writeln!(out, "        xmax = {} ", real(tier.xmax()));
        match tier {
            Tier::Interval(t) => {
                let _ = writeln!(out, "        intervals: size = {} ", t.len());
                for (j, interval) in t.intervals().iter().enumerate() {
                    let _ = writeln!(out, "        intervals [{}]:", j + 1);
                    let _ = writeln!(out, "            xmin = {} ", real(interval.xmin));
                    let _ = writeln!(out, "            xmax = {} ", real(interval.xmax));
                    let _ = writeln!(out, "            text = {} ", quote(&interval.text));
                }
            }
            Tier::Point(t) => {
                let _ = writeln!(out, "        points: size = {} ", t.points().len());
                for (j, point) in t.points().iter().enumerate() {
                    let _ = writeln!(out, "        points [{}]:", j + 1);
                    let _ = writeln!(out, "            number = {} ", real(point.time));
                    let _ = writeln!(out, "            mark = {} ", quote(&point.mark));
                }
            }
        }
    }
    out
}

/// Serialize a TextGrid to the bytes of a stored file (UTF-16 BE + BOM)
pub fn write_textgrid(textgrid: &TextGrid) -> Vec<u8> {
    encode_utf16(&to_praat_text(textgrid))
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

// Shortest representation that parses back to the same f64; whole numbers
// print without a fractional part, as Praat does.
fn real(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{}", value)
}
