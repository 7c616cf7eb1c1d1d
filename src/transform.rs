use anyhow::{Context, Result, anyhow};
use nalgebra::{Matrix4, Point3};
use std::path::Path;

/// Read a RiSCAN `.DAT` sensor transform.
///
/// On disk the file is four lines of four whitespace-separated numbers
/// with the sensor's world-space origin in the fourth column. The
/// returned matrix is transposed so that row 3 holds `(x, y, z, 1)`,
/// which is the layout the rest of the crate indexes into.
pub fn read_transform_file(path: &Path) -> Result<Matrix4<f64>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading transform file: {}", path.display()))?;

    let values: Vec<f64> = raw
        .split_whitespace()
        .map(|tok| {
            tok.parse::<f64>()
                .map_err(|_| anyhow!("invalid value '{tok}' in {}", path.display()))
        })
        .collect::<Result<_>>()?;

    if values.len() != 16 {
        return Err(anyhow!(
            "expected 16 values in transform file {}, found {}",
            path.display(),
            values.len()
        ));
    }

    Ok(Matrix4::from_row_slice(&values).transpose())
}

/// Sensor origin in world coordinates: the first three values of row 3.
pub fn sensor_origin(transform: &Matrix4<f64>) -> Point3<f64> {
    Point3::new(transform[(3, 0)], transform[(3, 1)], transform[(3, 2)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_origin_from_fourth_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1.0 0.0 0.0 10.5").unwrap();
        writeln!(file, "0.0 1.0 0.0 -20.25").unwrap();
        writeln!(file, "0.0 0.0 1.0 30.0").unwrap();
        writeln!(file, "0.0 0.0 0.0 1.0").unwrap();
        file.flush().unwrap();

        let m = read_transform_file(file.path()).unwrap();
        let origin = sensor_origin(&m);
        assert_eq!(origin, Point3::new(10.5, -20.25, 30.0));
        assert_eq!(m[(3, 3)], 1.0);
    }

    #[test]
    fn rejects_truncated_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1.0 0.0 0.0").unwrap();
        file.flush().unwrap();

        let err = read_transform_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("expected 16 values"));
    }
}
