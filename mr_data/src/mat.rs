use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use num_complex::Complex64;

// Level-4 MAT-file layout: five i32 header words (type, mrows, ncols, imagf,
// namlen), the NUL-terminated matrix name, then the real block followed by
// the imaginary block as little-endian doubles. A type word of 0 means
// little-endian, double precision, full numeric matrix.
const MAT_NUMERIC_LE_DOUBLE: i32 = 0;

/// Writes a complex time series as a level-4 .mat column vector under the
/// given variable name, for downstream analysis tooling.
pub fn write_complex_vec(path: &Path, var_name: &str, data: &[Complex64]) -> io::Result<()> {
    let mut f = File::create(path)?;

    let header = [
        MAT_NUMERIC_LE_DOUBLE,
        data.len() as i32,
        1,
        1, // imagf: imaginary block present
        (var_name.len() + 1) as i32,
    ];
    let mut header_bytes = [0u8; 20];
    LittleEndian::write_i32_into(&header, &mut header_bytes);
    f.write_all(&header_bytes)?;
    f.write_all(var_name.as_bytes())?;
    f.write_all(&[0u8])?;

    let reals: Vec<f64> = data.iter().map(|sample| sample.re).collect();
    let imags: Vec<f64> = data.iter().map(|sample| sample.im).collect();
    let mut block = vec![0u8; data.len() * 8];
    LittleEndian::write_f64_into(&reals, &mut block);
    f.write_all(&block)?;
    LittleEndian::write_f64_into(&imags, &mut block);
    f.write_all(&block)?;
    Ok(())
}
