use std::io::{self, Write};

/// Column names of the results table, in output order
pub const HEADER: [&str; 9] = [
    "mean_intensity",
    "quartile_intensity",
    "best_intensity",
    "best_z",
    "x",
    "y",
    "z",
    "volume",
    "zext",
];

/// Measurements of one reconstructed cell, one row of the results table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellReport {
    pub mean_intensity: f64,
    pub quartile_intensity: f64,
    pub best_intensity: f64,
    /// Position of the brightest plane within the cell
    pub best_z: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Total pixel area over all planes
    pub volume: usize,
    pub z_extent: usize,
}

impl CellReport {
    fn write_row<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{}",
            self.mean_intensity,
            self.quartile_intensity,
            self.best_intensity,
            self.best_z,
            self.x,
            self.y,
            self.z,
            self.volume,
            self.z_extent,
        )
    }
}

/// Write a header line followed by one comma separated line per report
pub fn write_results<W: Write>(reports: &[CellReport], mut writer: W) -> io::Result<()> {
    writeln!(writer, "{}", HEADER.join(","))?;
    for report in reports {
        report.write_row(&mut writer)?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_then_rows() {
        let report = CellReport {
            mean_intensity: 4.0,
            quartile_intensity: 3.5,
            best_intensity: 6.25,
            best_z: 1,
            x: 5.0,
            y: 5.5,
            z: 0.5,
            volume: 18,
            z_extent: 2,
        };
        let mut out = Vec::new();
        write_results(&[report], &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "mean_intensity,quartile_intensity,best_intensity,best_z,x,y,z,volume,zext",
                "4,3.5,6.25,1,5,5.5,0.5,18,2",
            ]
        );
    }

    #[test]
    fn empty_results_still_have_header() {
        let mut out = Vec::new();
        write_results(&[], &mut out).unwrap();
        assert_eq!(out.iter().filter(|&&b| b == b'\n').count(), 1);
    }
}
