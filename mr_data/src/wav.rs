use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};

/// Loads an RF waveform: a headerless binary file of little-endian IEEE-754
/// 32-bit amplitude samples, sample count = file size / 4, in file order.
pub fn read(wav: &Path) -> io::Result<Vec<f32>> {
    let mut f = File::open(wav)?;
    let mut buf = Vec::<u8>::new();
    f.read_to_end(&mut buf)?;
    if buf.len() % 4 != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "waveform file is {} bytes, not a whole number of f32 samples",
                buf.len()
            ),
        ));
    }
    let mut samples: Vec<f32> = vec![0.0; buf.len() / 4];
    LittleEndian::read_f32_into(&buf, &mut samples);
    Ok(samples)
}
